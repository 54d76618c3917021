//! Byte transports feeding the decoder.
//!
//! A transport writes the request byte and hands back whatever the device has
//! sent so far. Reads never block: an empty read is a normal outcome.

mod memory;
mod serial;

pub use memory::MemoryTransport;
pub use serial::{SerialConfig, SerialTransport};

use thiserror::Error;

pub trait Transport {
    fn write_byte(&mut self, byte: u8) -> Result<(), TransportError>;

    /// Return the bytes currently available, possibly none.
    fn read_available(&mut self) -> Result<Vec<u8>, TransportError>;

    fn close(&mut self) -> Result<(), TransportError>;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serial port error ({context}): {message}")]
    Serial {
        context: &'static str,
        message: String,
    },
    #[error("transport is closed")]
    Closed,
}
