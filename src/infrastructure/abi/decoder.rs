//! Shared decoder - a registry snapshot that can be swapped while readers decode

use std::fmt;
use std::sync::Arc;

use alloy_primitives::B256;
use arc_swap::ArcSwap;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::abi::{self, AbiRegistry, DecodedCall, DecodedLog, Error};

/// Decoder over a replaceable, immutable registry
///
/// Readers load an `Arc` snapshot without locking, so a reload never
/// mutates a registry that is in use.
pub struct SharedDecoder {
    /// Current registry (swappable at runtime without lock)
    registry: ArcSwap<AbiRegistry>,
}

impl SharedDecoder {
    /// Create a new decoder with the given registry
    pub fn new(registry: AbiRegistry) -> Self {
        Self {
            registry: ArcSwap::from_pointee(registry),
        }
    }

    /// Current registry snapshot
    pub fn registry(&self) -> Arc<AbiRegistry> {
        self.registry.load_full()
    }

    /// Replace the registry wholesale
    pub fn set_registry(&self, registry: AbiRegistry) {
        let functions = registry.len();
        self.registry.store(Arc::new(registry));
        info!(functions, "registry replaced");
    }

    /// Decode raw call data
    pub fn decode(&self, data: &[u8]) -> Result<DecodedCall, Error> {
        abi::decode_call(&self.registry.load(), data)
    }

    /// Decode hex call data
    pub fn decode_hex(&self, calldata: &str) -> Result<DecodedCall, Error> {
        abi::decode_hex_call(&self.registry.load(), calldata)
    }

    /// Decode an event log
    pub fn decode_log(&self, topics: &[B256], data: &[u8]) -> Result<DecodedLog, Error> {
        abi::decode_log(&self.registry.load(), topics, data)
    }

    /// Decode many hex inputs in parallel against one registry snapshot
    ///
    /// Results keep the order of `inputs`.
    pub fn decode_batch<S: AsRef<str> + Sync>(&self, inputs: &[S]) -> Vec<Result<DecodedCall, Error>> {
        let registry = self.registry();
        debug!(inputs = inputs.len(), "decoding batch");

        inputs
            .par_iter()
            .map(|input| abi::decode_hex_call(&registry, input.as_ref()))
            .collect()
    }
}

impl Default for SharedDecoder {
    fn default() -> Self {
        Self::new(AbiRegistry::new())
    }
}

impl fmt::Debug for SharedDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedDecoder")
            .field("functions", &self.registry.load().len())
            .finish()
    }
}
