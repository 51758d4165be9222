//! Field types and values.

use std::fmt;

use crate::common::config::STRING_LEN;

/// Type of a column.
///
/// Every type has a fixed on-disk width, which is what makes heap page slots
/// fixed-size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// 32-bit signed integer, big-endian.
    Int,
    /// String with a 4-byte big-endian length prefix and `STRING_LEN`
    /// payload bytes, zero-padded.
    String,
}

impl Type {
    /// Number of bytes a field of this type occupies on disk.
    #[inline]
    pub const fn byte_len(&self) -> usize {
        match self {
            Type::Int => 4,
            Type::String => 4 + STRING_LEN,
        }
    }

    /// Decode a field of this type from exactly `byte_len()` bytes.
    ///
    /// Returns `None` if the bytes are not a valid encoding (wrong length,
    /// string length prefix out of range, or invalid UTF-8).
    pub fn parse(&self, bytes: &[u8]) -> Option<Field> {
        if bytes.len() != self.byte_len() {
            return None;
        }
        match self {
            Type::Int => {
                let value = i32::from_be_bytes(bytes.try_into().ok()?);
                Some(Field::Int(value))
            }
            Type::String => {
                let len = u32::from_be_bytes(bytes[..4].try_into().ok()?) as usize;
                if len > STRING_LEN {
                    return None;
                }
                let value = std::str::from_utf8(&bytes[4..4 + len]).ok()?;
                Some(Field::Str(value.to_string()))
            }
        }
    }

    /// Parse a type name as written in a catalog file.
    pub fn from_name(name: &str) -> Option<Type> {
        match name.to_ascii_lowercase().as_str() {
            "int" => Some(Type::Int),
            "string" => Some(Type::String),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::String => write!(f, "string"),
        }
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Int(i32),
    Str(String),
}

impl Field {
    /// Create a string field, truncating to `STRING_LEN` bytes on a
    /// character boundary.
    pub fn string(value: impl Into<String>) -> Self {
        let mut value = value.into();
        value.truncate(stored_len(&value));
        Field::Str(value)
    }

    /// This field as it reads back from disk.
    ///
    /// `Field::Str` can be built directly with any length; storing it keeps
    /// only what [`Field::string`] would have kept.
    pub fn into_stored(self) -> Self {
        match self {
            Field::Str(value) => Field::string(value),
            other => other,
        }
    }

    pub fn field_type(&self) -> Type {
        match self {
            Field::Int(_) => Type::Int,
            Field::Str(_) => Type::String,
        }
    }

    /// Append the fixed-width encoding of this field to `out`.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        match self {
            Field::Int(value) => out.extend_from_slice(&value.to_be_bytes()),
            Field::Str(value) => {
                let len = stored_len(value);
                out.extend_from_slice(&(len as u32).to_be_bytes());
                out.extend_from_slice(&value.as_bytes()[..len]);
                out.resize(out.len() + (STRING_LEN - len), 0);
            }
        }
    }
}

/// Longest prefix of `value` that fits in `STRING_LEN` bytes and ends on a
/// character boundary.
fn stored_len(value: &str) -> usize {
    let mut end = value.len().min(STRING_LEN);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    end
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(value) => write!(f, "{}", value),
            Field::Str(value) => write!(f, "{}", value),
        }
    }
}

impl From<i32> for Field {
    fn from(value: i32) -> Self {
        Field::Int(value)
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::string(value)
    }
}
