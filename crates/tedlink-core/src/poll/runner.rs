use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{PollError, Rdu};
use crate::protocols::ted::Packet;
use crate::source::Transport;

/// Poll cadence and error policy for [`run_poll_loop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Stop after this many cycles; `None` runs until stopped.
    pub max_cycles: Option<u64>,
    /// Abort on the first protocol error instead of logging and continuing.
    pub stop_on_error: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_cycles: None,
            stop_on_error: false,
        }
    }
}

/// Cooperative stop flag, checked once per cycle boundary.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub cycles: u64,
    pub packets: u64,
    pub protocol_errors: u64,
}

/// Poll `rdu` until stopped, handing every decoded packet to `sink`.
///
/// The transport is closed when the loop ends, whatever the outcome.
///
/// # Errors
/// Transport errors always end the loop. Protocol errors end it only when
/// `config.stop_on_error` is set; otherwise they are logged and counted.
pub fn run_poll_loop<T, F>(
    rdu: &mut Rdu<T>,
    config: &PollConfig,
    stop: &StopSignal,
    sink: F,
) -> Result<PollSummary, PollError>
where
    T: Transport,
    F: FnMut(Packet),
{
    let result = poll_until_stopped(rdu, config, stop, sink);
    let closed = rdu.close();
    let summary = result?;
    closed?;
    info!(
        cycles = summary.cycles,
        packets = summary.packets,
        protocol_errors = summary.protocol_errors,
        "poll loop finished"
    );
    Ok(summary)
}

fn poll_until_stopped<T, F>(
    rdu: &mut Rdu<T>,
    config: &PollConfig,
    stop: &StopSignal,
    mut sink: F,
) -> Result<PollSummary, PollError>
where
    T: Transport,
    F: FnMut(Packet),
{
    let mut summary = PollSummary::default();
    loop {
        if stop.is_stopped() || config.max_cycles.is_some_and(|max| summary.cycles >= max) {
            return Ok(summary);
        }

        summary.cycles += 1;
        match rdu.poll() {
            Ok(packets) => {
                summary.packets += packets.len() as u64;
                packets.into_iter().for_each(&mut sink);
            }
            Err(PollError::Protocol(err)) if !config.stop_on_error => {
                summary.protocol_errors += 1;
                warn!(error = %err, cycle = summary.cycles, "protocol error, continuing");
            }
            Err(err) => return Err(err),
        }

        let last = config.max_cycles.is_some_and(|max| summary.cycles >= max);
        if !last && !stop.is_stopped() && !config.interval.is_zero() {
            debug!(interval_ms = config.interval.as_millis() as u64, "sleeping");
            thread::sleep(config.interval);
        }
    }
}
