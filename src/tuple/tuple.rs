//! Tuples (rows).

use std::fmt;

use super::{Field, TupleDesc};
use crate::common::RecordId;

/// A row: field values in schema order plus the slot it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tuple {
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Create a tuple that has not been stored anywhere yet.
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            record_id: None,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, i: usize) -> Option<&Field> {
        self.fields.get(i)
    }

    /// Replace the value of column `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn set_field(&mut self, i: usize, value: Field) {
        self.fields[i] = value;
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Whether the field count and types line up with `desc`.
    pub fn matches(&self, desc: &TupleDesc) -> bool {
        self.fields.len() == desc.num_fields()
            && self
                .fields
                .iter()
                .zip(desc.types())
                .all(|(field, ty)| field.field_type() == ty)
    }

    /// This tuple with every field as it reads back from disk.
    pub(crate) fn into_stored(self) -> Self {
        Self {
            fields: self.fields.into_iter().map(Field::into_stored).collect(),
            record_id: self.record_id,
        }
    }

    /// Fixed-width encoding of all fields, `desc.byte_size()` bytes long.
    pub(crate) fn serialize(&self, out: &mut Vec<u8>) {
        for field in &self.fields {
            field.serialize(out);
        }
    }

    /// Decode a tuple from one slot's bytes; `None` if any field is invalid.
    pub(crate) fn parse(desc: &TupleDesc, bytes: &[u8]) -> Option<Self> {
        let mut fields = Vec::with_capacity(desc.num_fields());
        let mut offset = 0;
        for ty in desc.types() {
            let end = offset + ty.byte_len();
            fields.push(ty.parse(bytes.get(offset..end)?)?);
            offset = end;
        }
        Some(Self::new(fields))
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::Type;

    #[test]
    fn test_matches_schema() {
        let desc = TupleDesc::with_types(vec![Type::Int, Type::String]);
        assert!(Tuple::new(vec![Field::Int(1), Field::string("a")]).matches(&desc));
        assert!(!Tuple::new(vec![Field::Int(1)]).matches(&desc));
        assert!(!Tuple::new(vec![Field::string("a"), Field::Int(1)]).matches(&desc));
    }

    #[test]
    fn test_serialize_then_parse() {
        let desc = TupleDesc::with_types(vec![Type::Int, Type::String, Type::Int]);
        let tuple = Tuple::new(vec![Field::Int(-7), Field::string("héllo"), Field::Int(9)]);

        let mut bytes = Vec::new();
        tuple.serialize(&mut bytes);
        assert_eq!(bytes.len(), desc.byte_size());
        assert_eq!(Tuple::parse(&desc, &bytes), Some(tuple));
    }

    #[test]
    fn test_into_stored_matches_decoded() {
        let desc = TupleDesc::with_types(vec![Type::String, Type::Int]);
        let tuple = Tuple::new(vec![Field::Str("x".repeat(200)), Field::Int(3)]);

        let mut bytes = Vec::new();
        tuple.serialize(&mut bytes);
        assert_eq!(Tuple::parse(&desc, &bytes), Some(tuple.into_stored()));
    }

    #[test]
    fn test_display_tab_separated() {
        let tuple = Tuple::new(vec![Field::Int(1), Field::string("bob")]);
        assert_eq!(format!("{}", tuple), "1\tbob");
    }
}
