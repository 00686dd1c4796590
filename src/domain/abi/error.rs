//! Error types for ABI loading and decoding

use alloy_primitives::U256;
use thiserror::Error;

use super::Selector;

/// Errors raised while building a registry from an ABI description
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed ABI JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unrecognized ABI type '{0}'")]
    UnknownType(String),

    #[error("type '{ty}' needs components but none were given")]
    MissingComponents { ty: String },

    #[error("type '{ty}' is not a tuple but has components")]
    UnexpectedComponents { ty: String },

    #[error("invalid function signature '{0}'")]
    InvalidSignature(String),

    #[error("selector 0x{} is shared by '{existing}' and '{duplicate}'", hex::encode(.selector))]
    DuplicateSelector {
        selector: Selector,
        existing: String,
        duplicate: String,
    },

    #[error("event topic is shared by '{existing}' and '{duplicate}'")]
    DuplicateTopic { existing: String, duplicate: String },
}

/// Errors raised while unpacking call data or log data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("calldata too short: {len} bytes, need at least 4 for the selector")]
    TooShort { len: usize },

    #[error("truncated data: reading {needed} bytes at offset {offset}, only {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("bad offset {offset} read at {at} (data length {len})")]
    BadOffset { at: usize, offset: U256, len: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("log is missing topic {index}")]
    MissingTopic { index: usize },

    #[error("parameter {index} has an unsupported type")]
    UnsupportedType { index: usize },

    #[error("decoded output exceeds {limit} values for {len} bytes of input")]
    OutputLimit { limit: usize, len: usize },
}

/// Top-level error for registry lookups and decoding
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("unknown selector 0x{}", hex::encode(.0))]
    UnknownSelector(Selector),

    #[error("unknown event topic 0x{}", hex::encode(.0))]
    UnknownEvent([u8; 32]),

    #[error("selector mismatch: got 0x{}, expected 0x{}", hex::encode(.got), hex::encode(.expected))]
    SelectorMismatch { got: Selector, expected: Selector },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl Error {
    /// Whether this error came from a selector or topic that is not in the registry
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::UnknownSelector(_) | Self::UnknownEvent(_))
    }
}
