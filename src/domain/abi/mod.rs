//! ABI domain models and decoding
//!
//! The registry turns an ABI JSON description into selector and topic
//! tables. The decoder looks a call up by selector and unpacks its
//! arguments with the head/tail engine in `unpack`.

mod decoder;
mod error;
mod registry;
mod types;
mod unpack;
mod value;

pub use decoder::{
    decode_call, decode_hex_call, decode_log, decode_with, parse_hex, DecodedArg, DecodedCall,
    DecodedLog,
};
pub use error::{DecodeError, Error, ParseError};
pub use registry::{compute_selector, AbiRegistry, EventSignature, FunctionSignature, ParamSpec};
pub use types::{TupleField, TypeSpec, MAX_NESTING, WORD};
pub use unpack::{decode_params, decode_single};
pub use value::Value;

/// 4-byte function selector
pub type Selector = [u8; 4];
