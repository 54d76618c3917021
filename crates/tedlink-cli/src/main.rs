use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use glob::glob;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::EnvFilter;

use tedlink_core::{
    MemoryTransport, Packet, PacketReport, PollConfig, PollError, PollSummary, Rdu, SerialConfig,
    StopSignal, Transport, run_poll_loop,
};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("TEDLINK_BUILD_COMMIT"),
    " ",
    env!("TEDLINK_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "tedlink")]
#[command(version = VERSION)]
#[command(
    about = "Reader for The Energy Detective (TED 1000) RDU serial protocol.",
    long_about = None,
    after_help = "Examples:\n  tedlink poll /dev/ttyUSB0\n  tedlink poll '/dev/ttyUSB*' --count 10 --json\n  tedlink decode capture.bin --chunk 64"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll an RDU on a serial device and print every decoded packet.
    Poll {
        /// Serial device path (glob patterns must match exactly one device)
        device: PathBuf,

        /// Serial baud rate
        #[arg(long, default_value_t = 19_200)]
        baud: u32,

        /// Delay between poll cycles in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Stop after this many poll cycles
        #[arg(long)]
        count: Option<u64>,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Decode a captured raw RDU byte stream from a file.
    Decode {
        /// Path to a raw capture of the serial stream
        input: PathBuf,

        /// Feed the capture to the decoder in chunks of this many bytes
        #[arg(long, default_value_t = 4096, value_parser = clap::value_parser!(u64).range(1..))]
        chunk: u64,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Print one JSON object per packet instead of text
    #[arg(long)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, requires = "json")]
    pretty: bool,

    /// Exit with a non-zero code on the first protocol error
    #[arg(long)]
    strict: bool,

    /// Suppress non-error output on stderr
    #[arg(long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Poll {
            device,
            baud,
            interval_ms,
            count,
            common,
        } => {
            init_logging(cli.verbose, common.quiet);
            cmd_poll(device, baud, interval_ms, count, common)
        }
        Commands::Decode {
            input,
            chunk,
            common,
        } => {
            init_logging(cli.verbose, common.quiet);
            cmd_decode(input, chunk, common)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{:#}", err), None)
    }
}

impl From<PollError> for CliError {
    fn from(err: PollError) -> Self {
        let hint = match err {
            PollError::Protocol(_) => {
                "the stream does not look like TED 1000 RDU output; rerun with -vv for details"
            }
            PollError::Transport(_) => {
                "check the device path and that the RDU is connected (usually /dev/ttyUSB* or COM*)"
            }
        };
        CliError::new(err.to_string(), Some(hint.to_string()))
    }
}

fn cmd_poll(
    device: PathBuf,
    baud: u32,
    interval_ms: u64,
    count: Option<u64>,
    common: CommonArgs,
) -> Result<(), CliError> {
    // Port names such as COM3 are not filesystem paths; let open() report them.
    let device = resolve_device_path(&device)?;
    let config = SerialConfig {
        baud_rate: baud,
        ..SerialConfig::new(&device)
    };
    let mut rdu = Rdu::open(&config).map_err(PollError::from)?;
    tracing::info!(device = %device.display(), baud, interval_ms, "polling RDU");
    let poll = PollConfig {
        interval: Duration::from_millis(interval_ms),
        max_cycles: count,
        stop_on_error: common.strict,
    };

    let summary = run_with_printer(&mut rdu, &poll, &common, true)?;
    if !common.quiet {
        eprintln!("{}", summary_line(&summary));
    }
    Ok(())
}

fn cmd_decode(input: PathBuf, chunk: u64, common: CommonArgs) -> Result<(), CliError> {
    validate_input_file(&input)?;
    let data = fs::read(&input)
        .with_context(|| format!("Failed to read capture: {}", input.display()))?;

    let chunk = usize::try_from(chunk).unwrap_or(usize::MAX);
    let chunks: Vec<Vec<u8>> = data.chunks(chunk).map(<[u8]>::to_vec).collect();
    let cycles = chunks.len() as u64;
    let mut rdu = Rdu::new(MemoryTransport::from_chunks(chunks));
    tracing::info!(input = %input.display(), bytes = data.len(), chunk, "decoding capture");
    let poll = PollConfig {
        interval: Duration::ZERO,
        max_cycles: Some(cycles),
        stop_on_error: common.strict,
    };

    let summary = run_with_printer(&mut rdu, &poll, &common, false)?;
    if !common.quiet {
        eprintln!("{}", summary_line(&summary));
    }
    if common.strict && summary.packets == 0 {
        return Err(CliError::new(
            format!("no packets found in {}", input.display()),
            Some("expected a raw capture of the RDU serial stream".to_string()),
        ));
    }
    Ok(())
}

fn run_with_printer<T: Transport>(
    rdu: &mut Rdu<T>,
    poll: &PollConfig,
    common: &CommonArgs,
    timestamps: bool,
) -> Result<PollSummary, CliError> {
    let stop = StopSignal::new();
    let mut stdout = io::stdout().lock();
    let mut write_error = None;

    let summary = run_poll_loop(rdu, poll, &stop, |packet| {
        if write_error.is_some() {
            return;
        }
        let received_at = if timestamps { now_rfc3339() } else { None };
        if let Err(err) = print_packet(&mut stdout, &packet, received_at, common) {
            write_error = Some(err);
            stop.stop();
        }
    })?;

    if let Some(err) = write_error {
        return Err(err.into());
    }
    Ok(summary)
}

fn print_packet(
    out: &mut impl Write,
    packet: &Packet,
    received_at: Option<String>,
    common: &CommonArgs,
) -> Result<()> {
    if common.json {
        let report = PacketReport::new(packet, received_at);
        let json = if common.pretty {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string(&report)
        }
        .context("JSON serialization failed")?;
        writeln!(out, "{}", json).context("Failed to write to stdout")?;
    } else {
        writeln!(out).context("Failed to write to stdout")?;
        writeln!(out, "{} byte packet: {}", packet.raw().len(), packet.hex())
            .context("Failed to write to stdout")?;
        writeln!(out).context("Failed to write to stdout")?;
        for reading in packet.readings() {
            writeln!(out, "{} = {}", reading.name, reading.value)
                .context("Failed to write to stdout")?;
        }
    }
    out.flush().context("Failed to write to stdout")?;
    Ok(())
}

fn summary_line(summary: &PollSummary) -> String {
    format!(
        "OK: {} packets in {} cycles ({} protocol errors)",
        summary.packets, summary.cycles, summary.protocol_errors
    )
}

fn now_rfc3339() -> Option<String> {
    OffsetDateTime::now_utc().format(&Rfc3339).ok()
}

fn validate_input_file(input: &PathBuf) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("pass a raw capture of the RDU serial stream".to_string()),
        ));
    }
    let meta = fs::metadata(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
    if !meta.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("pass a raw capture of the RDU serial stream".to_string()),
        ));
    }
    Ok(())
}

fn resolve_device_path(device: &PathBuf) -> Result<PathBuf, CliError> {
    let pattern = device.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(device.clone());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid device pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid device pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        matches.push(path);
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no devices match pattern '{}'", pattern),
            Some("check the RDU is connected, or quote the pattern".to_string()),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple devices match pattern '{}' ({} matches); matches: {}{}",
                pattern,
                matches.len(),
                listed,
                more
            ),
            Some("pass a single device path".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
