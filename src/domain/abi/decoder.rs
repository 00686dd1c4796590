//! Call data and event log decoding on top of a registry

use alloy_primitives::{Address, B256};
use serde::Serialize;
use tracing::{debug, trace};

use super::error::{DecodeError, Error};
use super::registry::{AbiRegistry, FunctionSignature, ParamSpec};
use super::types::{TypeSpec, WORD};
use super::unpack::{decode_params, decode_single};
use super::value::Value;
use super::Selector;

/// A decoded function argument or event field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedArg {
    /// Parameter name as declared (may be empty)
    pub name: String,
    /// ABI type, serialized as e.g. "uint256" or "tuple(address,uint256)"
    pub kind: TypeSpec,
    /// Decoded value
    pub value: Value,
    /// Whether the value came from a log topic
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub indexed: bool,
}

impl DecodedArg {
    /// Declared name, or "arg{n}" if unnamed
    pub fn display_name(&self, idx: usize) -> String {
        if self.name.trim().is_empty() {
            format!("arg{idx}")
        } else {
            self.name.clone()
        }
    }
}

/// Result of decoding a function call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedCall {
    /// Function name
    pub function_name: String,
    /// Canonical signature (e.g., "transfer(address,uint256)")
    pub signature: String,
    /// Decoded arguments in declaration order
    pub arguments: Vec<DecodedArg>,
}

/// Result of decoding an event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedLog {
    /// Contract that emitted the log, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub event_name: String,
    pub signature: String,
    /// Indexed and non-indexed fields in declaration order
    pub arguments: Vec<DecodedArg>,
}

impl DecodedLog {
    /// Attach the emitting contract address
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }
}

/// Decode raw call data (selector followed by the encoded arguments)
pub fn decode_call(registry: &AbiRegistry, data: &[u8]) -> Result<DecodedCall, Error> {
    let selector = split_selector(data)?;
    let function = registry.lookup(selector)?;
    decode_body(function, &data[4..])
}

/// Decode hex call data, with or without a `0x` prefix
pub fn decode_hex_call(registry: &AbiRegistry, calldata: &str) -> Result<DecodedCall, Error> {
    let data = parse_hex(calldata)?;
    decode_call(registry, &data)
}

/// Decode raw call data against a known function
pub fn decode_with(function: &FunctionSignature, data: &[u8]) -> Result<DecodedCall, Error> {
    let selector = split_selector(data)?;
    if selector != function.selector {
        return Err(Error::SelectorMismatch {
            got: selector,
            expected: function.selector,
        });
    }
    decode_body(function, &data[4..])
}

/// Decode an event log from its topics and data
///
/// Indexed value types are read from their topic; indexed strings, bytes,
/// arrays and tuples are only available as the 32-byte hash in the topic.
pub fn decode_log(registry: &AbiRegistry, topics: &[B256], data: &[u8]) -> Result<DecodedLog, Error> {
    let topic0 = topics.first().ok_or(DecodeError::MissingTopic { index: 0 })?;
    let event = registry.event(topic0)?;

    let mut body = decode_params(
        event.inputs.iter().filter(|p| !p.indexed).map(|p| &p.kind),
        data,
    )?
    .into_iter();

    let mut next_topic = 1;
    let mut arguments = Vec::with_capacity(event.inputs.len());
    for param in &event.inputs {
        let value = if param.indexed {
            let topic = topics
                .get(next_topic)
                .ok_or(DecodeError::MissingTopic { index: next_topic })?;
            next_topic += 1;
            decode_topic(&param.kind, topic)?
        } else {
            body.next().ok_or(DecodeError::Truncated {
                offset: data.len(),
                needed: WORD,
                available: 0,
            })?
        };
        arguments.push(make_arg(param, value));
    }

    debug!(event = %event.signature, topics = topics.len(), "decoded log");
    Ok(DecodedLog {
        address: None,
        event_name: event.name.clone(),
        signature: event.signature.clone(),
        arguments,
    })
}

/// Strip an optional `0x` prefix and decode hex
pub fn parse_hex(input: &str) -> Result<Vec<u8>, DecodeError> {
    let input = input.trim();
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    hex::decode(digits).map_err(|e| DecodeError::InvalidHex(e.to_string()))
}

fn split_selector(data: &[u8]) -> Result<Selector, DecodeError> {
    data.get(..4)
        .and_then(|prefix| prefix.try_into().ok())
        .ok_or(DecodeError::TooShort { len: data.len() })
}

fn decode_body(function: &FunctionSignature, body: &[u8]) -> Result<DecodedCall, Error> {
    trace!(signature = %function.signature, body_len = body.len(), "decoding call body");

    let values = decode_params(function.inputs.iter().map(|p| &p.kind), body)?;
    let arguments = function
        .inputs
        .iter()
        .zip(values)
        .map(|(param, value)| make_arg(param, value))
        .collect();

    debug!(signature = %function.signature, "decoded call");
    Ok(DecodedCall {
        function_name: function.name.clone(),
        signature: function.signature.clone(),
        arguments,
    })
}

fn decode_topic(kind: &TypeSpec, topic: &B256) -> Result<Value, DecodeError> {
    match kind {
        TypeSpec::Uint(_)
        | TypeSpec::Int(_)
        | TypeSpec::Bool
        | TypeSpec::Address
        | TypeSpec::FixedBytes(_) => decode_single(kind, topic.as_slice()),
        _ => Ok(Value::FixedBytes(*topic, 32)),
    }
}

fn make_arg(param: &ParamSpec, value: Value) -> DecodedArg {
    DecodedArg {
        name: param.name.clone(),
        kind: param.kind.clone(),
        value,
        indexed: param.indexed,
    }
}
