//! Domain layer - ABI models and the decoding engine
//!
//! Nothing in here does I/O; loading files and sharing registries across
//! threads lives in the infrastructure layer.

pub mod abi;
