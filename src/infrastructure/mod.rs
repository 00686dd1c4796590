//! Infrastructure layer - I/O and sharing around the domain layer
//!
//! This layer contains:
//! - ABI file and artifact loading
//! - A registry handle that can be swapped under concurrent readers

pub mod abi;

pub use abi::{AbiLoader, SharedDecoder};
