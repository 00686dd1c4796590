//! Decode Ethereum transaction call data against a contract ABI.
//!
//! [`domain::abi::AbiRegistry`] turns ABI JSON into a selector table and
//! [`domain::abi::decode_call`] unpacks call data into a method name and
//! typed, named arguments.

pub mod config;
pub mod domain;
pub mod infrastructure;
