//! Head/tail unpacking of ABI encoded data
//!
//! A tuple of N components starts with N head slots. Static components are
//! laid out inline in the head (static arrays and tuples spanning several
//! words). Dynamic components leave a single word in the head holding the
//! byte offset of their tail, relative to the start of the enclosing tuple.
//! Dynamic arrays prefix their elements with a count word, and element
//! offsets are relative to the first word after the count.
//!
//! Offsets may point several head slots at one shared tail, so the number of
//! decoded values is capped in proportion to the input length.

use std::cell::Cell;
use std::iter;

use alloy_primitives::{Address, B256, I256, U256};
use tracing::trace;

use super::error::DecodeError;
use super::types::{TypeSpec, MAX_NESTING, WORD};
use super::value::Value;

/// Decode `data` as the tuple of `types`, e.g. a call body after the selector
pub fn decode_params<'t, I>(types: I, data: &[u8]) -> Result<Vec<Value>, DecodeError>
where
    I: IntoIterator<Item = &'t TypeSpec>,
    I::IntoIter: Clone,
{
    let types = types.into_iter();
    if let Some(index) = types.clone().position(|ty| !ty.is_valid()) {
        return Err(DecodeError::UnsupportedType { index });
    }
    Unpacker::new(data).tuple(types, 0)
}

/// Decode a single value whose encoding starts at the beginning of `data`
pub fn decode_single(ty: &TypeSpec, data: &[u8]) -> Result<Value, DecodeError> {
    if !ty.is_valid() {
        return Err(DecodeError::UnsupportedType { index: 0 });
    }
    Unpacker::new(data).value(ty, 0)
}

/// Most values a buffer of `len` bytes may decode to
///
/// A canonical encoding spends at least one word on every value outside of
/// static composites, and those wrap at most [`MAX_NESTING`] levels.
fn value_limit(len: usize) -> usize {
    (len / WORD + 1).saturating_mul(MAX_NESTING + 1)
}

/// Bounds-checked reader over one encoded buffer
///
/// All positions are absolute offsets into `data`.
struct Unpacker<'a> {
    data: &'a [u8],
    /// Values left before decoding fails with `OutputLimit`
    budget: Cell<usize>,
}

impl<'a> Unpacker<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            budget: Cell::new(value_limit(data.len())),
        }
    }

    fn charge(&self) -> Result<(), DecodeError> {
        match self.budget.get().checked_sub(1) {
            Some(left) => {
                self.budget.set(left);
                Ok(())
            }
            None => Err(DecodeError::OutputLimit {
                limit: value_limit(self.data.len()),
                len: self.data.len(),
            }),
        }
    }

    fn tuple<'t, I>(&self, types: I, base: usize) -> Result<Vec<Value>, DecodeError>
    where
        I: Iterator<Item = &'t TypeSpec> + Clone,
    {
        let head_len = types.clone().fold(0usize, |acc, ty| {
            acc.saturating_add(ty.head_words().saturating_mul(WORD))
        });
        trace!(base, head_len, "unpacking tuple");

        let mut values = Vec::new();
        let mut head = base;
        for ty in types {
            let value = if ty.is_dynamic() {
                let tail = self.offset(head, base, head_len)?;
                self.value(ty, tail)?
            } else {
                self.value(ty, head)?
            };
            values.push(value);
            head = head.saturating_add(ty.head_words().saturating_mul(WORD));
        }

        Ok(values)
    }

    fn value(&self, ty: &TypeSpec, at: usize) -> Result<Value, DecodeError> {
        self.charge()?;
        let value = match ty {
            TypeSpec::Uint(bits) => Value::Uint(decode_uint(&self.word(at)?, *bits), *bits),
            TypeSpec::Int(bits) => Value::Int(decode_int(&self.word(at)?, *bits), *bits),
            // Any nonzero word counts as true
            TypeSpec::Bool => Value::Bool(self.word(at)? != B256::ZERO),
            TypeSpec::Address => Value::Address(Address::from_slice(&self.word(at)?[12..])),
            TypeSpec::FixedBytes(size) => {
                let word = self.word(at)?;
                let mut out = B256::ZERO;
                out[..*size].copy_from_slice(&word[..*size]);
                Value::FixedBytes(out, *size)
            }
            TypeSpec::Bytes => Value::Bytes(self.dynamic_bytes(at)?.to_vec()),
            TypeSpec::String => {
                let bytes = self.dynamic_bytes(at)?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|_| DecodeError::InvalidUtf8 { offset: at })?;
                Value::String(s.to_owned())
            }
            TypeSpec::Array(inner) => {
                let count = self.length(at)?;
                let start = at + WORD;

                // Every element needs at least one head word, so a count the
                // remaining data cannot hold is rejected before allocating
                let needed = count.saturating_mul(inner.head_words().max(1).saturating_mul(WORD));
                let available = self.data.len().saturating_sub(start);
                if needed > available {
                    return Err(DecodeError::Truncated {
                        offset: start,
                        needed,
                        available,
                    });
                }

                Value::Array(self.tuple(iter::repeat(inner.as_ref()).take(count), start)?)
            }
            TypeSpec::FixedArray(inner, len) => {
                Value::FixedArray(self.tuple(iter::repeat(inner.as_ref()).take(*len), at)?)
            }
            TypeSpec::Tuple(fields) => {
                Value::Tuple(self.tuple(fields.iter().map(|f| &f.ty), at)?)
            }
        };
        Ok(value)
    }

    fn slice(&self, at: usize, len: usize) -> Result<&'a [u8], DecodeError> {
        at.checked_add(len)
            .and_then(|end| self.data.get(at..end))
            .ok_or(DecodeError::Truncated {
                offset: at,
                needed: len,
                available: self.data.len().saturating_sub(at),
            })
    }

    fn word(&self, at: usize) -> Result<B256, DecodeError> {
        self.slice(at, WORD).map(B256::from_slice)
    }

    /// Length or count word at `at`
    fn length(&self, at: usize) -> Result<usize, DecodeError> {
        let raw = U256::from_be_bytes(self.word(at)?.0);
        usize::try_from(raw).map_err(|_| DecodeError::Truncated {
            offset: at + WORD,
            needed: usize::MAX,
            available: self.data.len().saturating_sub(at + WORD),
        })
    }

    /// Resolve the offset stored in the head slot `at` of a tuple starting at `base`
    ///
    /// The tail must lie after the tuple's head region and inside the buffer.
    fn offset(&self, at: usize, base: usize, head_len: usize) -> Result<usize, DecodeError> {
        let raw = U256::from_be_bytes(self.word(at)?.0);
        let bad = || DecodeError::BadOffset {
            at,
            offset: raw,
            len: self.data.len(),
        };

        let relative = usize::try_from(raw).map_err(|_| bad())?;
        if relative < head_len {
            return Err(bad());
        }
        match base.checked_add(relative) {
            Some(tail) if tail < self.data.len() => Ok(tail),
            _ => Err(bad()),
        }
    }

    /// Length-prefixed content of a `bytes` or `string` tail
    fn dynamic_bytes(&self, at: usize) -> Result<&'a [u8], DecodeError> {
        let len = self.length(at)?;
        self.slice(at + WORD, len)
    }
}

/// Low `bits` bits of the word, big-endian
fn decode_uint(word: &B256, bits: usize) -> U256 {
    let raw = U256::from_be_bytes(word.0);
    if bits >= 256 {
        return raw;
    }
    raw & (U256::MAX >> (256 - bits))
}

/// Low `bits` bits of the word, sign-extended from bit `bits - 1`
fn decode_int(word: &B256, bits: usize) -> I256 {
    let low = decode_uint(word, bits);
    if bits < 256 && low.bit(bits - 1) {
        I256::from_raw(low | !(U256::MAX >> (256 - bits)))
    } else {
        I256::from_raw(low)
    }
}
