//! Fixed-width scalar types and the field values stored in tuple slots.
//!
//! Every [`Type`] has a constant on-disk length, so a record's byte size is a
//! pure function of its schema. Integers are stored big-endian; strings are a
//! big-endian length prefix followed by a zero-padded buffer of [`STRING_LEN`]
//! bytes.

use bytes::{Buf, BufMut};
use std::{cmp::Ordering, fmt};
use thiserror::Error;

/// Maximum number of content bytes a `Type::String` field can hold.
pub const STRING_LEN: usize = 128;

const INT_LEN: usize = 4;
const STRING_PREFIX_LEN: usize = 4;

/// Error raised when a byte run does not parse as the expected type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("need {needed} bytes to decode {ty}, only {remaining} left")]
    Truncated {
        ty: Type,
        needed: usize,
        remaining: usize,
    },
    #[error("string length prefix {0} exceeds maximum of {STRING_LEN}")]
    StringLength(i32),
    #[error("string content is not valid utf-8")]
    Utf8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Int,
    String,
}

impl Type {
    /// Number of bytes a value of this type occupies on disk.
    pub const fn len(self) -> usize {
        match self {
            Type::Int => INT_LEN,
            Type::String => STRING_PREFIX_LEN + STRING_LEN,
        }
    }

    /// Read exactly [`Type::len`] bytes from `buf` and produce a field.
    ///
    /// Nothing is consumed when `buf` is too short.
    pub fn decode(self, buf: &mut impl Buf) -> Result<Field, DecodeError> {
        if buf.remaining() < self.len() {
            return Err(DecodeError::Truncated {
                ty: self,
                needed: self.len(),
                remaining: buf.remaining(),
            });
        }
        match self {
            Type::Int => Ok(Field::Int(buf.get_i32())),
            Type::String => {
                let len = buf.get_i32();
                let mut content = [0u8; STRING_LEN];
                buf.copy_to_slice(&mut content);
                let len = usize::try_from(len)
                    .ok()
                    .filter(|len| *len <= STRING_LEN)
                    .ok_or(DecodeError::StringLength(len))?;
                let text = std::str::from_utf8(&content[..len]).map_err(|_| DecodeError::Utf8)?;
                Ok(Field::String(text.to_owned()))
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => f.write_str("INT"),
            Type::String => f.write_str("STRING"),
        }
    }
}

/// A typed value filling one tuple slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Field {
    Int(i32),
    String(String),
}

impl Field {
    pub fn field_type(&self) -> Type {
        match self {
            Field::Int(_) => Type::Int,
            Field::String(_) => Type::String,
        }
    }

    /// Write this value in exactly `self.field_type().len()` bytes.
    ///
    /// Strings longer than [`STRING_LEN`] bytes are cut at the last character
    /// boundary that fits.
    pub fn encode(&self, buf: &mut impl BufMut) {
        match self {
            Field::Int(v) => buf.put_i32(*v),
            Field::String(s) => {
                let bytes = truncate_to_boundary(s, STRING_LEN).as_bytes();
                buf.put_i32(bytes.len() as i32);
                buf.put_slice(bytes);
                buf.put_bytes(0, STRING_LEN - bytes.len());
            }
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Field::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn cmp_same_type(&self, other: &Field) -> Option<Ordering> {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => Some(a.cmp(b)),
            (Field::String(a), Field::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{v}"),
            Field::String(s) => f.write_str(s),
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
        Field::String(value.to_owned())
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Field::String(value)
    }
}

fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
