use super::field::{FieldDescriptor, FieldWidth};

pub const PKT_REQUEST: u8 = 0xAA;
pub const ESCAPE: u8 = 0x10;
pub const PKT_BEGIN: u8 = 0x04;
pub const PKT_END: u8 = 0x03;

/// Only one payload length is supported; anything else is a protocol error.
pub const PROTOCOL_LEN: usize = 278;

pub const SERIAL_BAUD_RATE: u32 = 19_200;
pub const READ_BUFFER_SIZE: usize = 4096;

// Offsets count from the first byte after the begin marker. Reverse-engineered
// subset; the RDU carries more fields that are not mapped yet.
pub const STANDARD_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new(82, "kw_rate", FieldWidth::U16Le, 0.0001),
    FieldDescriptor::new(108, "house_code", FieldWidth::U8, 1.0),
    FieldDescriptor::new(247, "kw", FieldWidth::U16Le, 0.01),
    FieldDescriptor::new(251, "volts", FieldWidth::U16Le, 0.1),
];

const _: () = assert!(fields_fit(STANDARD_FIELDS, PROTOCOL_LEN));

/// Const check that every descriptor lies inside a payload of `len` bytes and
/// carries a positive scale.
pub const fn fields_fit(fields: &[FieldDescriptor], len: usize) -> bool {
    let mut i = 0;
    while i < fields.len() {
        let field = &fields[i];
        if field.offset + field.width.size() > len {
            return false;
        }
        if !(field.scale > 0.0) {
            return false;
        }
        i += 1;
    }
    true
}
