use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::debug;

use super::{Transport, TransportError};
use crate::protocols::ted::layout;

/// Serial link settings for an RDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub path: PathBuf,
    pub baud_rate: u32,
    /// Upper bound on bytes taken per read.
    pub read_buffer: usize,
}

impl SerialConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            baud_rate: layout::SERIAL_BAUD_RATE,
            read_buffer: layout::READ_BUFFER_SIZE,
        }
    }
}

/// RDU serial port (8N1, no flow control, zero read timeout).
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    read_buffer: usize,
}

impl SerialTransport {
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let path = config.path.to_string_lossy();
        let port = serialport::new(path.as_ref(), config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::ZERO)
            .open()
            .map_err(|e| TransportError::Serial {
                context: "open",
                message: format!("{}: {}", path, e),
            })?;
        debug!(path = %path, baud = config.baud_rate, "serial port opened");
        Ok(Self {
            port: Some(port),
            read_buffer: config.read_buffer.max(1),
        })
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port.as_mut().ok_or(TransportError::Closed)
    }
}

impl Transport for SerialTransport {
    fn write_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        let port = self.port()?;
        port.write_all(&[byte])?;
        port.flush()?;
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        let limit = self.read_buffer;
        let port = self.port()?;
        let available = port.bytes_to_read().map_err(|e| TransportError::Serial {
            context: "bytes to read",
            message: e.to_string(),
        })? as usize;
        if available == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; available.min(limit)];
        match port.read(&mut buf) {
            Ok(n) => buf.truncate(n),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                buf.clear()
            }
            Err(e) => return Err(e.into()),
        }
        Ok(buf)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.port.take().is_some() {
            debug!("serial port closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SerialConfig;
    use std::path::Path;

    #[test]
    fn config_defaults_match_rdu_link() {
        let config = SerialConfig::new("/dev/ttyUSB0");
        assert_eq!(config.path, Path::new("/dev/ttyUSB0"));
        assert_eq!(config.baud_rate, 19_200);
        assert_eq!(config.read_buffer, 4096);
    }
}
