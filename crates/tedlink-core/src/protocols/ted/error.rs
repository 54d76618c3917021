use thiserror::Error;

/// Errors returned by TED frame and packet decoding.
///
/// Note: this error type lives in an internal module; the example is
/// illustrative and not compiled as a public doctest.
///
/// # Examples
/// ```text
/// use tedlink_core::TedError;
///
/// let err = TedError::InvalidLength { length: 12, expected: 278 };
/// assert!(err.to_string().contains("unsupported packet length 12"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TedError {
    #[error(
        "unknown escape sequence 0x10 0x{byte:02x} (in packet: {in_packet}, {buffered} payload bytes buffered)"
    )]
    UnknownEscape {
        byte: u8,
        in_packet: bool,
        buffered: usize,
    },
    #[error("unsupported packet length {length} (expected {expected})")]
    InvalidLength { length: usize, expected: usize },
    #[error("payload too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
}

/// Errors raised while validating a field table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldTableError {
    #[error(
        "field {name} at offset {offset} ({width} bytes) does not fit a {len}-byte payload"
    )]
    OutOfRange {
        name: &'static str,
        offset: usize,
        width: usize,
        len: usize,
    },
    #[error("duplicate field name: {name}")]
    DuplicateName { name: &'static str },
    #[error("empty field name at offset {offset}")]
    EmptyName { offset: usize },
    #[error("invalid scale for field {name}: {scale}")]
    InvalidScale { name: &'static str, scale: f64 },
}
