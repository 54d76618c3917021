use std::collections::HashSet;

use super::error::FieldTableError;
use super::layout;

/// Storage width and byte order of a raw field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    U8,
    U16Le,
}

impl FieldWidth {
    pub const fn size(self) -> usize {
        match self {
            FieldWidth::U8 => 1,
            FieldWidth::U16Le => 2,
        }
    }
}

/// Location and scaling of one reading inside a payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    pub offset: usize,
    pub name: &'static str,
    pub width: FieldWidth,
    pub scale: f64,
}

impl FieldDescriptor {
    pub const fn new(offset: usize, name: &'static str, width: FieldWidth, scale: f64) -> Self {
        Self {
            offset,
            name,
            width,
            scale,
        }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.width.size()
    }
}

/// Validated, ordered set of field descriptors.
///
/// Every descriptor is known to fit inside a [`layout::PROTOCOL_LEN`] payload,
/// so decoding never has to bounds-check against the table itself.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTable {
    fields: Vec<FieldDescriptor>,
}

impl FieldTable {
    /// Validate `fields` against the fixed payload length.
    ///
    /// # Errors
    /// Returns `FieldTableError` when a descriptor overruns the payload, has an
    /// empty or repeated name, or a scale that is not a positive finite number.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, FieldTableError> {
        let mut names = HashSet::new();
        for field in &fields {
            if field.name.is_empty() {
                return Err(FieldTableError::EmptyName {
                    offset: field.offset,
                });
            }
            if !names.insert(field.name) {
                return Err(FieldTableError::DuplicateName { name: field.name });
            }
            if !field.scale.is_finite() || field.scale <= 0.0 {
                return Err(FieldTableError::InvalidScale {
                    name: field.name,
                    scale: field.scale,
                });
            }
            let end = field.offset.checked_add(field.width.size());
            if end.is_none_or(|end| end > layout::PROTOCOL_LEN) {
                return Err(FieldTableError::OutOfRange {
                    name: field.name,
                    offset: field.offset,
                    width: field.width.size(),
                    len: layout::PROTOCOL_LEN,
                });
            }
        }
        Ok(Self { fields })
    }

    /// The shipped table of known RDU fields.
    pub fn standard() -> Self {
        // Bounds and scales are asserted at compile time in `layout`.
        Self {
            fields: layout::STANDARD_FIELDS.to_vec(),
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for FieldTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldDescriptor, FieldTable, FieldWidth};
    use crate::protocols::ted::error::FieldTableError;
    use crate::protocols::ted::layout;

    #[test]
    fn standard_table_passes_validation() {
        let validated = FieldTable::new(layout::STANDARD_FIELDS.to_vec()).unwrap();
        assert_eq!(validated, FieldTable::standard());
        assert_eq!(validated.len(), 4);
    }

    #[test]
    fn standard_table_keeps_declaration_order() {
        let names: Vec<_> = FieldTable::standard()
            .fields()
            .iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["kw_rate", "house_code", "kw", "volts"]);
    }

    #[test]
    fn rejects_field_past_payload_end() {
        let fields = vec![FieldDescriptor::new(
            layout::PROTOCOL_LEN - 1,
            "tail",
            FieldWidth::U16Le,
            1.0,
        )];
        let err = FieldTable::new(fields).unwrap_err();
        assert!(matches!(err, FieldTableError::OutOfRange { name: "tail", .. }));
    }

    #[test]
    fn accepts_field_ending_on_last_byte() {
        let fields = vec![FieldDescriptor::new(
            layout::PROTOCOL_LEN - 2,
            "tail",
            FieldWidth::U16Le,
            1.0,
        )];
        assert!(FieldTable::new(fields).is_ok());
    }

    #[test]
    fn rejects_offset_overflow() {
        let fields = vec![FieldDescriptor::new(usize::MAX, "huge", FieldWidth::U16Le, 1.0)];
        let err = FieldTable::new(fields).unwrap_err();
        assert!(matches!(err, FieldTableError::OutOfRange { .. }));
    }

    #[test]
    fn rejects_duplicate_names() {
        let fields = vec![
            FieldDescriptor::new(0, "kw", FieldWidth::U8, 1.0),
            FieldDescriptor::new(4, "kw", FieldWidth::U8, 1.0),
        ];
        let err = FieldTable::new(fields).unwrap_err();
        assert!(err.to_string().contains("duplicate field name"));
    }

    #[test]
    fn rejects_non_positive_scale() {
        for scale in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let fields = vec![FieldDescriptor::new(0, "x", FieldWidth::U8, scale)];
            let err = FieldTable::new(fields).unwrap_err();
            assert!(matches!(err, FieldTableError::InvalidScale { .. }));
        }
    }

    #[test]
    fn rejects_empty_name() {
        let fields = vec![FieldDescriptor::new(3, "", FieldWidth::U8, 1.0)];
        let err = FieldTable::new(fields).unwrap_err();
        assert!(matches!(err, FieldTableError::EmptyName { offset: 3 }));
    }

    #[test]
    fn const_fit_check_matches_runtime_check() {
        let bad = [FieldDescriptor::new(277, "x", FieldWidth::U16Le, 1.0)];
        assert!(!layout::fields_fit(&bad, layout::PROTOCOL_LEN));
        assert!(layout::fields_fit(layout::STANDARD_FIELDS, layout::PROTOCOL_LEN));
    }
}
