//! ABI infrastructure - file loading and shared decoding

mod decoder;
mod loader;

pub use decoder::SharedDecoder;
pub use loader::AbiLoader;
