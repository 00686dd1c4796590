//! ABI file loader - reads ABI JSON and compiler artifacts from disk

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::de::Error as _;
use tracing::debug;

use crate::domain::abi::{AbiRegistry, ParseError};

/// Files above this size are not treated as ABI descriptions
const MAX_ABI_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// ABI file loader
pub struct AbiLoader;

impl AbiLoader {
    /// Load a registry from a file holding an ABI array or an artifact with an `abi` field
    pub fn load_file(path: impl AsRef<Path>) -> Result<AbiRegistry> {
        let path = path.as_ref();

        let metadata = fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
        if metadata.len() > MAX_ABI_FILE_BYTES {
            bail!(
                "{}: {} bytes exceeds the {} byte ABI size limit",
                path.display(),
                metadata.len(),
                MAX_ABI_FILE_BYTES
            );
        }

        let content =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let registry = Self::parse_document(&content)
            .with_context(|| format!("parse ABI in {}", path.display()))?;

        debug!(path = %path.display(), functions = registry.len(), "loaded ABI file");
        Ok(registry)
    }

    /// Parse either a raw ABI array or a compiler artifact (Foundry, Hardhat, Truffle)
    pub fn parse_document(content: &str) -> Result<AbiRegistry, ParseError> {
        let value: serde_json::Value = serde_json::from_str(content)?;

        // Try to extract ABI - either raw array or nested in "abi" field
        let abi_value = if value.is_array() {
            value
        } else if let Some(abi) = value.get("abi") {
            abi.clone()
        } else {
            return Err(ParseError::Json(serde_json::Error::custom(
                "expected an ABI array or an object with an \"abi\" field",
            )));
        };

        AbiRegistry::from_value(abi_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSFER_ABI: &str = r#"[{"type":"function","name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}]}]"#;

    #[test]
    fn test_parse_raw_array() {
        let registry = AbiLoader::parse_document(TRANSFER_ABI).unwrap();
        assert!(registry.lookup_hex("0xa9059cbb").is_some());
    }

    #[test]
    fn test_parse_artifact() {
        let artifact = format!(r#"{{"contractName":"Token","abi":{TRANSFER_ABI},"bytecode":"0x"}}"#);
        let registry = AbiLoader::parse_document(&artifact).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_parse_object_without_abi() {
        let err = AbiLoader::parse_document(r#"{"bytecode":"0x"}"#).unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("abi-decode-loader-{}.json", std::process::id()));
        fs::write(&path, TRANSFER_ABI).unwrap();

        let registry = AbiLoader::load_file(&path).unwrap();
        assert_eq!(registry.len(), 1);

        fs::remove_file(&path).unwrap();
        assert!(AbiLoader::load_file(&path).is_err());
    }
}
