//! Device sessions: one request/read/decode cycle per `poll`.
//!
//! An [`Rdu`] owns the transport, the frame decoder state and the field table
//! for exactly one device. Sessions for different devices share nothing and
//! may run on separate threads; a single session is strictly sequential.

mod runner;

pub use runner::{PollConfig, PollSummary, StopSignal, run_poll_loop};

use thiserror::Error;
use tracing::debug;

use crate::protocols::ted::{FieldTable, FrameDecoder, Packet, TedError, layout, parse_packet};
use crate::source::{SerialConfig, SerialTransport, Transport, TransportError};

#[derive(Debug, Error)]
pub enum PollError {
    #[error("protocol error: {0}")]
    Protocol(#[from] TedError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Session with one RDU.
pub struct Rdu<T: Transport> {
    transport: T,
    frames: FrameDecoder,
    table: FieldTable,
}

impl Rdu<SerialTransport> {
    /// Open the serial device described by `config`.
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        Ok(Self::new(SerialTransport::open(config)?))
    }
}

impl<T: Transport> Rdu<T> {
    pub fn new(transport: T) -> Self {
        Self::with_table(transport, FieldTable::standard())
    }

    pub fn with_table(transport: T, table: FieldTable) -> Self {
        Self {
            transport,
            frames: FrameDecoder::new(),
            table,
        }
    }

    /// Request a packet, drain the bytes available right now and decode them.
    ///
    /// The RDU ignores requests while it has nothing new, so polling faster
    /// than it produces packets is harmless.
    ///
    /// # Errors
    /// Transport failures and protocol errors are returned as-is; the session
    /// remains usable for the next call after a protocol error.
    pub fn poll(&mut self) -> Result<Vec<Packet>, PollError> {
        self.transport.write_byte(layout::PKT_REQUEST)?;
        let raw = self.transport.read_available()?;
        debug!(bytes = raw.len(), "poll read");
        Ok(self.decode(&raw)?)
    }

    /// Feed raw stream bytes through the frame decoder and packet parser.
    ///
    /// # Errors
    /// The first protocol error ends the call; no packets from it are returned
    /// and any packet still open in the frame decoder is dropped.
    pub fn decode(&mut self, raw: &[u8]) -> Result<Vec<Packet>, TedError> {
        let parsed: Result<Vec<Packet>, TedError> = self
            .frames
            .decode(raw)?
            .iter()
            .map(|payload| parse_packet(payload, &self.table))
            .collect();
        if parsed.is_err() {
            self.frames.abandon();
        }
        parsed
    }

    pub fn close(&mut self) -> Result<(), TransportError> {
        self.transport.close()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn frame_decoder(&self) -> &FrameDecoder {
        &self.frames
    }

    pub fn table(&self) -> &FieldTable {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::{PollError, Rdu};
    use crate::protocols::ted::TedError;
    use crate::protocols::ted::layout::{ESCAPE, PKT_BEGIN, PKT_END, PKT_REQUEST, PROTOCOL_LEN};
    use crate::source::{MemoryTransport, Transport, TransportError};

    pub(crate) fn frame(payload: &[u8]) -> Vec<u8> {
        let mut out = vec![ESCAPE, PKT_BEGIN];
        for &byte in payload {
            if byte == ESCAPE {
                out.push(ESCAPE);
            }
            out.push(byte);
        }
        out.extend_from_slice(&[ESCAPE, PKT_END]);
        out
    }

    fn kw_payload(raw_kw: u16) -> Vec<u8> {
        let mut payload = vec![0u8; PROTOCOL_LEN];
        payload[247..249].copy_from_slice(&raw_kw.to_le_bytes());
        payload
    }

    #[test]
    fn poll_writes_request_and_decodes() {
        let transport = MemoryTransport::from_chunks([frame(&kw_payload(250))]);
        let mut rdu = Rdu::new(transport);

        let packets = rdu.poll().unwrap();
        assert_eq!(packets.len(), 1);
        assert!((packets[0].field("kw").unwrap() - 2.5).abs() < 1e-12);
        assert_eq!(rdu.transport().written(), &[PKT_REQUEST]);
    }

    #[test]
    fn empty_read_yields_no_packets() {
        let mut rdu = Rdu::new(MemoryTransport::new());
        assert!(rdu.poll().unwrap().is_empty());
        assert!(rdu.poll().unwrap().is_empty());
        assert_eq!(rdu.transport().written(), &[PKT_REQUEST, PKT_REQUEST]);
    }

    #[test]
    fn packet_spanning_polls_is_reassembled() {
        let framed = frame(&kw_payload(0x1010));
        let (head, tail) = framed.split_at(100);
        let transport = MemoryTransport::from_chunks([head.to_vec(), tail.to_vec()]);
        let mut rdu = Rdu::new(transport);

        assert!(rdu.poll().unwrap().is_empty());
        assert!(rdu.frame_decoder().in_packet());
        let packets = rdu.poll().unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].raw(), kw_payload(0x1010).as_slice());
    }

    #[test]
    fn short_payload_is_protocol_error() {
        let transport = MemoryTransport::from_chunks([frame(&[1, 2, 3])]);
        let mut rdu = Rdu::new(transport);
        let err = rdu.poll().unwrap_err();
        assert!(matches!(
            err,
            PollError::Protocol(TedError::InvalidLength {
                length: 3,
                expected: PROTOCOL_LEN
            })
        ));
    }

    #[test]
    fn session_recovers_after_protocol_error() {
        let transport = MemoryTransport::from_chunks([
            vec![ESCAPE, PKT_BEGIN, 1, ESCAPE, 0x07],
            frame(&kw_payload(100)),
        ]);
        let mut rdu = Rdu::new(transport);
        assert!(matches!(
            rdu.poll(),
            Err(PollError::Protocol(TedError::UnknownEscape { byte: 0x07, .. }))
        ));
        let packets = rdu.poll().unwrap();
        assert_eq!(packets.len(), 1);
    }

    #[test]
    fn length_error_drops_packet_opened_in_same_call() {
        let good = frame(&kw_payload(250));
        let (head, tail) = good.split_at(50);
        let mut chunk = frame(&[1, 2, 3]);
        chunk.extend_from_slice(head);

        let mut rdu = Rdu::new(MemoryTransport::new());
        let err = rdu.decode(&chunk).unwrap_err();
        assert!(matches!(err, TedError::InvalidLength { length: 3, .. }));
        assert!(!rdu.frame_decoder().in_packet());
        assert_eq!(rdu.frame_decoder().buffered(), 0);

        // The tail of the dropped packet is noise; nothing is emitted.
        assert!(rdu.decode(tail).unwrap().is_empty());
        let packets = rdu.decode(&good).unwrap();
        assert_eq!(packets.len(), 1);
    }

    #[test]
    fn closed_session_reports_transport_error() {
        let mut rdu = Rdu::new(MemoryTransport::new());
        rdu.close().unwrap();
        assert!(rdu.transport().is_closed());
        assert!(matches!(
            rdu.poll(),
            Err(PollError::Transport(TransportError::Closed))
        ));
    }

    #[test]
    fn decode_bypasses_transport() {
        let mut rdu = Rdu::new(MemoryTransport::new());
        let packets = rdu.decode(&frame(&kw_payload(1))).unwrap();
        assert_eq!(packets.len(), 1);
        assert!(rdu.transport().written().is_empty());
        rdu.transport_mut().close().unwrap();
    }
}
