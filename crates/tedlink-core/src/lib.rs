//! tedlink core library for The Energy Detective (TED 1000) serial protocol.
//!
//! This crate turns the RDU's escaped, framed serial stream into packets of
//! named, scaled readings: transports feed raw bytes to a per-device session,
//! which drives the frame decoder and the table-driven packet parser
//! (layout/reader/frame/parser). Decoding is byte-oriented and side-effect
//! free; all device I/O is isolated in `source` modules.
//!
//! Invariants:
//! - Frame decoding is resumable: any split of the input across calls yields
//!   the same payloads and final state as a single call.
//! - Every returned packet is exactly 278 bytes with one reading per field.
//! - Decoder state is owned by one session per device; nothing is global.
//!
//! # Examples
//! ```no_run
//! use tedlink_core::{Rdu, SerialConfig};
//!
//! let mut rdu = Rdu::open(&SerialConfig::new("/dev/ttyUSB0"))?;
//! for packet in rdu.poll()? {
//!     println!("kw = {:?}", packet.field("kw"));
//! }
//! rdu.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::Serialize;

mod poll;
mod protocols;
mod source;

pub use poll::{PollConfig, PollError, PollSummary, Rdu, StopSignal, run_poll_loop};
pub use protocols::ted::layout::{PKT_REQUEST, PROTOCOL_LEN, STANDARD_FIELDS};
pub use protocols::ted::{
    FieldDescriptor, FieldTable, FieldTableError, FieldWidth, FrameDecoder, Packet, Reading,
    Readings, TedError, parse_packet,
};
pub use source::{MemoryTransport, SerialConfig, SerialTransport, Transport, TransportError};

/// Serializable view of a decoded packet.
///
/// # Examples
/// ```
/// use tedlink_core::{FieldTable, PacketReport, PROTOCOL_LEN, parse_packet};
///
/// let packet = parse_packet(&[0u8; PROTOCOL_LEN], &FieldTable::standard()).unwrap();
/// let report = PacketReport::new(&packet, None);
/// assert_eq!(report.length, PROTOCOL_LEN);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct PacketReport {
    /// RFC3339 receive time, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<String>,
    /// Raw payload length in bytes.
    pub length: usize,
    /// Raw payload as lowercase hex.
    pub raw: String,
    /// Scaled readings keyed by field name, in table order.
    pub readings: Readings,
}

impl PacketReport {
    pub fn new(packet: &Packet, received_at: Option<String>) -> Self {
        Self {
            received_at,
            length: packet.raw().len(),
            raw: packet.hex(),
            readings: packet.readings().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_omits_missing_timestamp() {
        let mut payload = [0u8; PROTOCOL_LEN];
        payload[247..249].copy_from_slice(&250u16.to_le_bytes());
        let packet = parse_packet(&payload, &FieldTable::standard()).unwrap();

        let value = serde_json::to_value(PacketReport::new(&packet, None)).expect("report json");
        assert!(value.get("received_at").is_none());
        assert_eq!(value["length"], 278);
        assert_eq!(value["raw"].as_str().map(str::len), Some(556));
        assert_eq!(value["readings"]["kw"], 2.5);
    }

    #[test]
    fn report_keeps_timestamp() {
        let packet = parse_packet(&[0u8; PROTOCOL_LEN], &FieldTable::standard()).unwrap();
        let report = PacketReport::new(&packet, Some("1970-01-01T00:00:00Z".to_string()));
        let value = serde_json::to_value(report).expect("report json");
        assert_eq!(value["received_at"], "1970-01-01T00:00:00Z");
    }
}
