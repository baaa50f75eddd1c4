//! Source data types and the owned scalar values handed out per row.

use std::{fmt, str::FromStr};

use sag_common::{Result, error::Error};
use serde::Serialize;

/// Data type of a field in the source file, as named in the mapping file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Bit,
    Int1,
    Int2,
    Int4,
    Int8,
    UInt1,
    UInt2,
    UInt4,
    UInt8,
    Real4,
    Real8,
}

impl DataType {
    /// Byte length of a fixed-size value of this type, `None` for strings.
    pub fn byte_len(&self) -> Option<usize> {
        match self {
            DataType::String => None,
            DataType::Bit | DataType::Int1 | DataType::UInt1 => Some(1),
            DataType::Int2 | DataType::UInt2 => Some(2),
            DataType::Int4 | DataType::UInt4 | DataType::Real4 => Some(4),
            DataType::Int8 | DataType::UInt8 | DataType::Real8 => Some(8),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::String => "STRING",
            DataType::Bit => "BIT",
            DataType::Int1 => "INT1",
            DataType::Int2 => "INT2",
            DataType::Int4 => "INT4",
            DataType::Int8 => "INT8",
            DataType::UInt1 => "UINT1",
            DataType::UInt2 => "UINT2",
            DataType::UInt4 => "UINT4",
            DataType::UInt8 => "UINT8",
            DataType::Real4 => "REAL4",
            DataType::Real8 => "REAL8",
        }
    }

    /// Decodes a little-endian literal of this type.
    pub fn decode_literal(&self, bytes: &[u8]) -> Result<Value> {
        if let Some(len) = self.byte_len() {
            if bytes.len() != len {
                return Err(Error::invalid_arg(
                    "literal",
                    format!(
                        "{} literal needs {len} bytes, got {}",
                        self.name(),
                        bytes.len()
                    ),
                ));
            }
        }
        let value = match self {
            DataType::String => Value::String(
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| Error::invalid_arg("literal", e.to_string()))?,
            ),
            DataType::Bit => Value::Bit(bytes[0] != 0),
            DataType::Int1 => Value::Int8(i8::from_le_bytes(fixed(bytes))),
            DataType::Int2 => Value::Int16(i16::from_le_bytes(fixed(bytes))),
            DataType::Int4 => Value::Int32(i32::from_le_bytes(fixed(bytes))),
            DataType::Int8 => Value::Int64(i64::from_le_bytes(fixed(bytes))),
            DataType::UInt1 => Value::UInt8(bytes[0]),
            DataType::UInt2 => Value::UInt16(u16::from_le_bytes(fixed(bytes))),
            DataType::UInt4 => Value::UInt32(u32::from_le_bytes(fixed(bytes))),
            DataType::UInt8 => Value::UInt64(u64::from_le_bytes(fixed(bytes))),
            DataType::Real4 => Value::Float32(f32::from_le_bytes(fixed(bytes))),
            DataType::Real8 => Value::Float64(f64::from_le_bytes(fixed(bytes))),
        };
        Ok(value)
    }
}

/// Length is checked by the caller.
fn fixed<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(bytes);
    buf
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<DataType> {
        let data_type = match s.to_ascii_uppercase().as_str() {
            "STRING" => DataType::String,
            "BIT" => DataType::Bit,
            "INT1" => DataType::Int1,
            "INT2" => DataType::Int2,
            "INT4" => DataType::Int4,
            "INT8" => DataType::Int8,
            "UINT1" => DataType::UInt1,
            "UINT2" => DataType::UInt2,
            "UINT4" => DataType::UInt4,
            "UINT8" => DataType::UInt8,
            "REAL4" => DataType::Real4,
            "REAL8" => DataType::Real8,
            _ => {
                return Err(Error::invalid_format(
                    "data type",
                    format!("unknown source type '{s}'"),
                ));
            }
        };
        Ok(data_type)
    }
}

/// An owned scalar value copied out of a block, the file metadata or a literal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bit(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int8(v) => Some(v.into()),
            Value::Int16(v) => Some(v.into()),
            Value::Int32(v) => Some(v.into()),
            Value::Int64(v) => Some(v),
            Value::UInt8(v) => Some(v.into()),
            Value::UInt16(v) => Some(v.into()),
            Value::UInt32(v) => Some(v.into()),
            Value::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float32(v) => Some(v.into()),
            Value::Float64(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bit(v) => write!(f, "{}", u8::from(*v)),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
        }
    }
}

/// The value of one field at the current row.
///
/// A null field still carries a deterministic zero of its type, so consumers
/// that ignore `is_null` see a stable value.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub value: Value,
    pub is_null: bool,
}

impl ResolvedField {
    pub fn value(value: Value) -> ResolvedField {
        ResolvedField {
            value,
            is_null: false,
        }
    }

    pub fn null(zero: Value) -> ResolvedField {
        ResolvedField {
            value: zero,
            is_null: true,
        }
    }

    /// The value, or `None` when the field is null.
    pub fn get(&self) -> Option<&Value> {
        (!self.is_null).then_some(&self.value)
    }
}
