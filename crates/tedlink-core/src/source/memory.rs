use std::collections::VecDeque;

use super::{Transport, TransportError};

/// Scripted transport: each read returns the next queued chunk, then nothing.
///
/// Used for offline replay of captured streams and in tests.
///
/// # Examples
/// ```
/// use tedlink_core::{MemoryTransport, Transport};
///
/// let mut transport = MemoryTransport::from_chunks([vec![1, 2], vec![3]]);
/// transport.write_byte(0xAA).unwrap();
/// assert_eq!(transport.read_available().unwrap(), vec![1, 2]);
/// assert_eq!(transport.read_available().unwrap(), vec![3]);
/// assert!(transport.read_available().unwrap().is_empty());
/// assert_eq!(transport.written(), &[0xAA]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryTransport {
    reads: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    closed: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self {
            reads: chunks.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Queue `chunk` to be returned by a later read.
    pub fn push_read(&mut self, chunk: impl Into<Vec<u8>>) {
        self.reads.push_back(chunk.into());
    }

    pub fn pending_reads(&self) -> usize {
        self.reads.len()
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Transport for MemoryTransport {
    fn write_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.written.push(byte);
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        Ok(self.reads.pop_front().unwrap_or_default())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryTransport;
    use crate::source::{Transport, TransportError};

    #[test]
    fn reads_queued_chunks_in_order() {
        let mut transport = MemoryTransport::new();
        transport.push_read([1u8, 2]);
        transport.push_read(vec![3u8]);
        assert_eq!(transport.pending_reads(), 2);
        assert_eq!(transport.read_available().unwrap(), vec![1, 2]);
        assert_eq!(transport.read_available().unwrap(), vec![3]);
        assert!(transport.read_available().unwrap().is_empty());
    }

    #[test]
    fn closed_transport_rejects_io() {
        let mut transport = MemoryTransport::from_chunks([vec![1]]);
        transport.close().unwrap();
        assert!(transport.is_closed());
        assert!(matches!(transport.write_byte(0xAA), Err(TransportError::Closed)));
        assert!(matches!(transport.read_available(), Err(TransportError::Closed)));
    }
}
