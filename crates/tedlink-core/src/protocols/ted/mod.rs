//! TED 1000-series RDU protocol decoding.
//!
//! The RDU answers a `0xAA` request byte with an escaped, framed stream. The
//! frame decoder strips framing and escaping into raw payloads; the parser
//! validates the fixed 278-byte length and runs the field table over it,
//! scaling each little-endian raw value into a physical reading.
//!
//! Errors report the offending escape byte and how much payload had been
//! buffered, or the rejected payload length. Byte offsets and wire constants
//! live in `layout`, safe reads in `reader`.

pub mod error;
pub mod field;
pub mod frame;
pub mod layout;
pub mod parser;
pub mod reader;

pub use error::{FieldTableError, TedError};
pub use field::{FieldDescriptor, FieldTable, FieldWidth};
pub use frame::FrameDecoder;
pub use parser::{Packet, Reading, Readings, parse_packet};
