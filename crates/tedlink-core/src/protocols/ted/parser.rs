use std::fmt::Write;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::error::TedError;
use super::field::FieldTable;
use super::layout;
use super::reader::TedReader;

/// One named, scaled value decoded from a packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub name: &'static str,
    pub value: f64,
}

/// Readings of one packet, in field-table order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Readings {
    entries: Vec<Reading>,
}

impl Readings {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|reading| reading.name == name)
            .map(|reading| reading.value)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reading> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Readings {
    type Item = &'a Reading;
    type IntoIter = std::slice::Iter<'a, Reading>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// Serialized as a `name -> value` object, keeping table order.
impl Serialize for Readings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for reading in &self.entries {
            map.serialize_entry(reading.name, &reading.value)?;
        }
        map.end()
    }
}

/// A validated packet: the raw payload plus its decoded readings.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    raw: Vec<u8>,
    readings: Readings,
}

impl Packet {
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn readings(&self) -> &Readings {
        &self.readings
    }

    pub fn field(&self, name: &str) -> Option<f64> {
        self.readings.get(name)
    }

    /// Lowercase hex rendering of the raw payload.
    pub fn hex(&self) -> String {
        let mut out = String::with_capacity(self.raw.len() * 2);
        for byte in &self.raw {
            // Writing to a String cannot fail.
            let _ = write!(out, "{:02x}", byte);
        }
        out
    }
}

/// Decode a framed payload into a [`Packet`].
///
/// # Errors
/// Returns `TedError::InvalidLength` unless the payload is exactly
/// [`layout::PROTOCOL_LEN`] bytes.
pub fn parse_packet(payload: &[u8], table: &FieldTable) -> Result<Packet, TedError> {
    let reader = TedReader::new(payload);
    reader.require_exact_len(layout::PROTOCOL_LEN)?;

    let mut entries = Vec::with_capacity(table.len());
    for field in table.fields() {
        let raw = reader.read_raw(field)?;
        entries.push(Reading {
            name: field.name,
            value: f64::from(raw) * field.scale,
        });
    }

    Ok(Packet {
        raw: payload.to_vec(),
        readings: Readings { entries },
    })
}
