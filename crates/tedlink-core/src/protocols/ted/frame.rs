//! Byte-stream framing for the RDU serial link.
//!
//! The link is a continuous stream in which `0x10` is an escape byte whose
//! meaning depends on the byte that follows:
//!
//! - `10 10`: literal `0x10` inside a payload
//! - `10 04`: begin packet
//! - `10 03`: end packet
//!
//! Any other byte after an escape is a protocol error. Bytes outside a
//! packet are line noise and are dropped.
//!
//! The decoder keeps its state between calls, so a stream may be fed in
//! arbitrary chunks: decoding `a ++ b` in one call yields the same payloads
//! and the same final state as decoding `a` then `b`.

use tracing::{debug, trace, warn};

use super::error::TedError;
use super::layout;

/// Resumable frame decoder, one per connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameDecoder {
    escaped: bool,
    // `None` while no packet is open.
    payload: Option<Vec<u8>>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff the last byte seen was an unresolved escape byte.
    pub fn is_escaped(&self) -> bool {
        self.escaped
    }

    /// True between a begin marker and the matching end marker.
    pub fn in_packet(&self) -> bool {
        self.payload.is_some()
    }

    /// Number of payload bytes accumulated for the open packet.
    pub fn buffered(&self) -> usize {
        self.payload.as_ref().map_or(0, Vec::len)
    }

    /// Drop any open packet and pending escape.
    pub(crate) fn abandon(&mut self) {
        self.escaped = false;
        self.payload = None;
    }

    /// Consume `raw` and return every payload completed within it, in order.
    ///
    /// Payload lengths are not checked here; see
    /// [`parse_packet`](super::parser::parse_packet).
    ///
    /// # Errors
    /// Returns `TedError::UnknownEscape` when the escape byte is followed by
    /// anything other than escape/begin/end. Payloads completed earlier in the
    /// same call are dropped along with the open one, and the decoder is left
    /// outside any packet so the next call starts clean.
    pub fn decode(&mut self, raw: &[u8]) -> Result<Vec<Vec<u8>>, TedError> {
        let mut completed = Vec::new();
        for &byte in raw {
            if let Err(err) = self.push(byte, &mut completed) {
                self.abandon();
                return Err(err);
            }
        }
        Ok(completed)
    }

    fn push(&mut self, byte: u8, completed: &mut Vec<Vec<u8>>) -> Result<(), TedError> {
        if self.escaped {
            self.escaped = false;
            match byte {
                layout::ESCAPE => {
                    if let Some(payload) = self.payload.as_mut() {
                        payload.push(layout::ESCAPE);
                    }
                }
                layout::PKT_BEGIN => {
                    let fresh = Vec::with_capacity(layout::PROTOCOL_LEN);
                    if let Some(open) = self.payload.replace(fresh) {
                        warn!(
                            discarded = open.len(),
                            "begin marker inside open packet, dropping truncated payload"
                        );
                    }
                }
                layout::PKT_END => match self.payload.take() {
                    Some(payload) => {
                        debug!(len = payload.len(), "payload complete");
                        completed.push(payload);
                    }
                    None => trace!("end marker outside packet ignored"),
                },
                other => {
                    return Err(TedError::UnknownEscape {
                        byte: other,
                        in_packet: self.payload.is_some(),
                        buffered: self.buffered(),
                    });
                }
            }
        } else if byte == layout::ESCAPE {
            self.escaped = true;
        } else if let Some(payload) = self.payload.as_mut() {
            payload.push(byte);
        }
        Ok(())
    }
}
