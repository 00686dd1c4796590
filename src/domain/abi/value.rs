//! Decoded ABI values

use std::fmt;

use alloy_primitives::{Address, B256, I256, U256};
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// A decoded ABI value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Unsigned integer and its bit width
    Uint(U256, usize),
    /// Signed integer and its bit width
    Int(I256, usize),
    Bool(bool),
    Address(Address),
    /// Left-aligned word and the number of meaningful bytes
    FixedBytes(B256, usize),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<Value>),
    FixedArray(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Self::Uint(value, _) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<I256> {
        match self {
            Self::Int(value, _) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(addr) => Some(*addr),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Byte content of `bytes` and `bytes<N>` values
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::FixedBytes(word, size) => Some(&word[..*size]),
            _ => None,
        }
    }

    /// Members of arrays, fixed arrays and tuples
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Self::Array(values) | Self::FixedArray(values) | Self::Tuple(values) => Some(values),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(value, _) => write!(f, "{value}"),
            Self::Int(value, _) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Address(addr) => write!(f, "{addr}"),
            Self::FixedBytes(word, size) => write!(f, "0x{}", hex::encode(&word[..*size])),
            Self::Bytes(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Array(values) | Self::FixedArray(values) => {
                write!(f, "[")?;
                write_list(f, values)?;
                write!(f, "]")
            }
            Self::Tuple(values) => {
                write!(f, "(")?;
                write_list(f, values)?;
                write!(f, ")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    for (idx, value) in values.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{value}")?;
    }
    Ok(())
}

impl Serialize for Value {
    /// Integers serialize as decimal strings so 256-bit values survive JSON
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Uint(value, _) => serializer.collect_str(value),
            Self::Int(value, _) => serializer.collect_str(value),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Address(addr) => serializer.collect_str(addr),
            Self::FixedBytes(..) | Self::Bytes(_) => serializer.collect_str(self),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(values) | Self::FixedArray(values) | Self::Tuple(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }
}
