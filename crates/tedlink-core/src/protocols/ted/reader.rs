use super::error::TedError;
use super::field::{FieldDescriptor, FieldWidth};

pub struct TedReader<'a> {
    payload: &'a [u8],
}

impl<'a> TedReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload }
    }

    pub fn require_exact_len(&self, expected: usize) -> Result<(), TedError> {
        if self.payload.len() != expected {
            return Err(TedError::InvalidLength {
                length: self.payload.len(),
                expected,
            });
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, TedError> {
        self.payload
            .get(offset)
            .copied()
            .ok_or(TedError::TooShort {
                needed: offset + 1,
                actual: self.payload.len(),
            })
    }

    pub fn read_u16_le(&self, range: std::ops::Range<usize>) -> Result<u16, TedError> {
        let bytes = self.read_slice(range)?;
        if bytes.len() != 2 {
            return Err(TedError::TooShort {
                needed: 2,
                actual: bytes.len(),
            });
        }
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_slice(&self, range: std::ops::Range<usize>) -> Result<&'a [u8], TedError> {
        self.payload.get(range.clone()).ok_or(TedError::TooShort {
            needed: range.end,
            actual: self.payload.len(),
        })
    }

    /// Read the raw unsigned value a descriptor points at.
    pub fn read_raw(&self, field: &FieldDescriptor) -> Result<u32, TedError> {
        match field.width {
            FieldWidth::U8 => self.read_u8(field.offset).map(u32::from),
            FieldWidth::U16Le => self.read_u16_le(field.range()).map(u32::from),
        }
    }
}
