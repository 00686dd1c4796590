//! ABI registry - stores function signatures by selector and events by topic

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{Error, ParseError};
use super::types::{split_top_level, TupleField, TypeSpec};
use super::Selector;

/// A function or event parameter specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    /// Parameter name (may be empty)
    pub name: String,
    /// Parsed ABI type
    pub kind: TypeSpec,
    /// Whether the parameter is stored in a log topic (events only)
    pub indexed: bool,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: TypeSpec) -> Self {
        Self {
            name: name.into(),
            kind,
            indexed: false,
        }
    }
}

/// A function signature with its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSignature {
    /// 4-byte function selector
    pub selector: Selector,
    /// Function name
    pub name: String,
    /// Canonical signature string (e.g., "transfer(address,uint256)")
    pub signature: String,
    /// Input parameters
    pub inputs: Vec<ParamSpec>,
}

impl FunctionSignature {
    /// Build a signature, deriving the canonical string and selector from the inputs
    pub fn new(name: impl Into<String>, inputs: Vec<ParamSpec>) -> Self {
        let name = name.into();
        let signature = canonical_signature(&name, &inputs);
        let selector = compute_selector(&signature);
        Self {
            selector,
            name,
            signature,
            inputs,
        }
    }

    /// Parse a human-readable signature such as `transfer(address to, uint256)`
    ///
    /// A trailing `returns (...)` clause and data location keywords are ignored.
    /// Parameter names are only picked up at the top level.
    pub fn parse(sig: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidSignature(sig.to_string());

        let mut sig_body = sig.trim();
        sig_body = sig_body.strip_prefix("function ").unwrap_or(sig_body).trim();
        if let Some(pos) = sig_body
            .find(" returns")
            .or_else(|| sig_body.find(")returns").map(|pos| pos + 1))
        {
            sig_body = sig_body[..pos].trim();
        }

        let open = sig_body.find('(').ok_or_else(invalid)?;
        let name = sig_body[..open].trim();
        let params = sig_body[open + 1..].strip_suffix(')').ok_or_else(invalid)?;
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
            return Err(invalid());
        }

        let inputs = split_top_level(params)
            .ok_or_else(invalid)?
            .into_iter()
            .map(parse_param)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(name, inputs))
    }

    /// Get selector as hex string
    pub fn selector_hex(&self) -> String {
        format!("0x{}", hex::encode(self.selector))
    }
}

/// An event signature with its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSignature {
    /// Keccak-256 of the canonical signature (topic 0 of non-anonymous logs)
    pub topic: B256,
    pub name: String,
    pub signature: String,
    pub inputs: Vec<ParamSpec>,
    pub anonymous: bool,
}

impl EventSignature {
    pub fn new(name: impl Into<String>, inputs: Vec<ParamSpec>, anonymous: bool) -> Self {
        let name = name.into();
        let signature = canonical_signature(&name, &inputs);
        Self {
            topic: keccak256(signature.as_bytes()),
            name,
            signature,
            inputs,
            anonymous,
        }
    }
}

/// Registry of function signatures indexed by selector
///
/// Built once from an ABI description and read-only afterwards. Reloading
/// means building a new registry.
#[derive(Debug, Default, Clone)]
pub struct AbiRegistry {
    /// Functions indexed by 4-byte selector
    functions: HashMap<Selector, FunctionSignature>,
    /// Non-anonymous events indexed by topic 0
    events: HashMap<B256, EventSignature>,
}

impl AbiRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an ABI JSON array
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        let entries: Vec<JsonEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// Build from an already parsed ABI JSON array
    pub fn from_value(value: serde_json::Value) -> Result<Self, ParseError> {
        let entries: Vec<JsonEntry> = serde_json::from_value(value)?;
        Self::from_entries(entries)
    }

    /// Build from human-readable function signatures
    pub fn from_signatures<S: AsRef<str>>(signatures: &[S]) -> Result<Self, ParseError> {
        let mut registry = Self::new();
        for sig in signatures {
            registry.insert(FunctionSignature::parse(sig.as_ref())?)?;
        }
        Ok(registry)
    }

    fn from_entries(entries: Vec<JsonEntry>) -> Result<Self, ParseError> {
        let mut registry = Self::new();

        for entry in entries {
            match entry.kind.as_str() {
                "function" => {
                    let inputs = convert_params(entry.inputs)?;
                    let function = FunctionSignature::new(entry.name, inputs);
                    if function.name.trim().is_empty() {
                        return Err(ParseError::InvalidSignature(function.signature));
                    }
                    registry.insert(function)?;
                }
                "event" => {
                    let inputs = convert_params(entry.inputs)?;
                    let event = EventSignature::new(entry.name, inputs, entry.anonymous);
                    if event.name.trim().is_empty() {
                        return Err(ParseError::InvalidSignature(event.signature));
                    }
                    registry.insert_event(event)?;
                }
                other => debug!(kind = other, name = %entry.name, "skipping ABI entry"),
            }
        }

        debug!(
            functions = registry.functions.len(),
            events = registry.events.len(),
            "loaded ABI"
        );
        Ok(registry)
    }

    /// Insert a function signature
    ///
    /// Fails if another function already owns the selector.
    pub fn insert(&mut self, function: FunctionSignature) -> Result<(), ParseError> {
        match self.functions.entry(function.selector) {
            Entry::Occupied(existing) => Err(ParseError::DuplicateSelector {
                selector: function.selector,
                existing: existing.get().signature.clone(),
                duplicate: function.signature,
            }),
            Entry::Vacant(slot) => {
                slot.insert(function);
                Ok(())
            }
        }
    }

    /// Insert an event signature
    ///
    /// Anonymous events have no topic 0 and are not indexed.
    pub fn insert_event(&mut self, event: EventSignature) -> Result<(), ParseError> {
        if event.anonymous {
            debug!(signature = %event.signature, "skipping anonymous event");
            return Ok(());
        }
        match self.events.entry(event.topic) {
            Entry::Occupied(existing) => Err(ParseError::DuplicateTopic {
                existing: existing.get().signature.clone(),
                duplicate: event.signature,
            }),
            Entry::Vacant(slot) => {
                slot.insert(event);
                Ok(())
            }
        }
    }

    /// Look up a function by selector
    pub fn lookup(&self, selector: Selector) -> Result<&FunctionSignature, Error> {
        self.functions
            .get(&selector)
            .ok_or(Error::UnknownSelector(selector))
    }

    /// Look up a function by selector hex string (e.g., "0xa9059cbb")
    pub fn lookup_hex(&self, selector_hex: &str) -> Option<&FunctionSignature> {
        let normalized = selector_hex
            .strip_prefix("0x")
            .or_else(|| selector_hex.strip_prefix("0X"))
            .unwrap_or(selector_hex);

        if normalized.len() != 8 {
            return None;
        }

        let bytes = hex::decode(normalized).ok()?;
        let selector: Selector = bytes.try_into().ok()?;
        self.functions.get(&selector)
    }

    /// Look up an event by topic 0
    pub fn event(&self, topic: &B256) -> Result<&EventSignature, Error> {
        self.events.get(topic).ok_or(Error::UnknownEvent(topic.0))
    }

    /// Get the number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if the registry has no functions
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Get all selectors
    pub fn selectors(&self) -> impl Iterator<Item = &Selector> {
        self.functions.keys()
    }

    /// Get all functions
    pub fn functions(&self) -> impl Iterator<Item = &FunctionSignature> {
        self.functions.values()
    }

    /// Get all non-anonymous events
    pub fn events(&self) -> impl Iterator<Item = &EventSignature> {
        self.events.values()
    }
}

/// Compute the 4-byte function selector from a canonical signature
pub fn compute_selector(signature: &str) -> Selector {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn canonical_signature(name: &str, inputs: &[ParamSpec]) -> String {
    let types: Vec<String> = inputs.iter().map(|p| p.kind.canonical()).collect();
    format!("{}({})", name, types.join(","))
}

/// One `type [location] [name]` member of a human-readable parameter list
fn parse_param(member: &str) -> Result<ParamSpec, ParseError> {
    // Tuple types may contain spaces after commas, so split at the closing paren
    let (ty, rest) = match member.rfind(')') {
        Some(close) if member.starts_with('(') || member.starts_with("tuple(") => {
            let dims_end = member[close + 1..]
                .find(char::is_whitespace)
                .map_or(member.len(), |pos| close + 1 + pos);
            (&member[..dims_end], &member[dims_end..])
        }
        _ => member
            .split_once(char::is_whitespace)
            .unwrap_or((member, "")),
    };

    let kind: TypeSpec = ty.replace(char::is_whitespace, "").parse()?;
    let mut param = ParamSpec::new("", kind);
    for word in rest.split_whitespace() {
        match word {
            "memory" | "calldata" | "storage" | "payable" => {}
            "indexed" => param.indexed = true,
            name => param.name = name.to_string(),
        }
    }
    Ok(param)
}

fn convert_params(params: Vec<JsonParam>) -> Result<Vec<ParamSpec>, ParseError> {
    params.into_iter().map(JsonParam::into_param).collect()
}

fn default_entry_type() -> String {
    "function".to_string()
}

/// One entry of an ABI JSON array; `outputs`, `stateMutability` and other fields are ignored
#[derive(Debug, Deserialize)]
struct JsonEntry {
    #[serde(rename = "type", default = "default_entry_type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<JsonParam>,
    #[serde(default)]
    anonymous: bool,
}

#[derive(Debug, Deserialize)]
struct JsonParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    indexed: bool,
    #[serde(default)]
    components: Option<Vec<JsonParam>>,
}

impl JsonParam {
    fn into_param(self) -> Result<ParamSpec, ParseError> {
        let components = self
            .components
            .map(|components| {
                components
                    .into_iter()
                    .map(|c| c.into_param().map(|p| TupleField::new(p.name, p.kind)))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Ok(ParamSpec {
            name: self.name,
            kind: TypeSpec::from_abi(&self.ty, components)?,
            indexed: self.indexed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERC20_ABI: &str = r#"[
        {"type":"function","name":"transfer","stateMutability":"nonpayable",
         "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
         "outputs":[{"name":"","type":"bool"}]},
        {"type":"function","name":"approve",
         "inputs":[{"name":"spender","type":"address"},{"name":"amount","type":"uint256"}]},
        {"type":"event","name":"Transfer","anonymous":false,
         "inputs":[{"name":"from","type":"address","indexed":true},
                   {"name":"to","type":"address","indexed":true},
                   {"name":"value","type":"uint256","indexed":false}]},
        {"type":"constructor","inputs":[{"name":"supply","type":"uint256"}]},
        {"type":"fallback"}
    ]"#;

    #[test]
    fn test_registry_load_lookup() {
        let registry = AbiRegistry::from_json(ERC20_ABI).unwrap();

        assert_eq!(registry.len(), 2);
        let transfer = registry.lookup([0xa9, 0x05, 0x9c, 0xbb]).unwrap();
        assert_eq!(transfer.name, "transfer");
        assert_eq!(transfer.signature, "transfer(address,uint256)");
        assert_eq!(transfer.inputs[0].name, "to");
        assert_eq!(transfer.selector_hex(), "0xa9059cbb");

        assert!(registry.lookup_hex("0x095ea7b3").is_some());
        assert!(registry.lookup_hex("0xdeadbeef").is_none());
        assert!(registry.lookup_hex("0xa9059c").is_none());
        assert!(matches!(
            registry.lookup([0xde, 0xad, 0xbe, 0xef]),
            Err(Error::UnknownSelector([0xde, 0xad, 0xbe, 0xef]))
        ));
    }

    #[test]
    fn test_event_side_table() {
        let registry = AbiRegistry::from_json(ERC20_ABI).unwrap();
        let event = registry.events().next().unwrap();
        assert_eq!(event.signature, "Transfer(address,address,uint256)");
        assert_eq!(
            hex::encode(event.topic),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert!(event.inputs[0].indexed);
        assert!(!event.inputs[2].indexed);
    }

    #[test]
    fn test_compute_selector() {
        // transfer(address,uint256) -> 0xa9059cbb
        assert_eq!(compute_selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        // approve(address,uint256) -> 0x095ea7b3
        assert_eq!(compute_selector("approve(address,uint256)"), [0x09, 0x5e, 0xa7, 0xb3]);
    }

    #[test]
    fn test_tuple_components_in_signature() {
        let json = r#"[{"type":"function","name":"submit","inputs":[
            {"name":"orders","type":"tuple[]","components":[
                {"name":"maker","type":"address"},
                {"name":"legs","type":"tuple[2]","components":[
                    {"name":"amount","type":"uint"},
                    {"name":"data","type":"bytes"}]}]},
            {"name":"deadline","type":"uint64"}]}]"#;
        let registry = AbiRegistry::from_json(json).unwrap();
        let function = registry.functions().next().unwrap();
        assert_eq!(function.signature, "submit((address,(uint256,bytes)[2])[],uint64)");
        assert_eq!(
            function.inputs[0].kind.to_string(),
            "tuple(address,tuple(uint256,bytes)[2])[]"
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(AbiRegistry::from_json("{not json"), Err(ParseError::Json(_))));
        assert!(matches!(
            AbiRegistry::from_json(r#"[{"type":"function","name":"f","inputs":[{"name":"x","type":"uint7"}]}]"#),
            Err(ParseError::UnknownType(_))
        ));
        assert!(matches!(
            AbiRegistry::from_json(r#"[{"type":"function","name":"f","inputs":[{"name":"x","type":"tuple"}]}]"#),
            Err(ParseError::MissingComponents { .. })
        ));
        assert!(matches!(
            AbiRegistry::from_json(
                r#"[{"type":"function","name":"f","inputs":[{"name":"x","type":"address","components":[{"name":"y","type":"bool"}]}]}]"#
            ),
            Err(ParseError::UnexpectedComponents { .. })
        ));
    }

    #[test]
    fn test_unnamed_entries_rejected() {
        for json in [
            r#"[{"type":"function","inputs":[{"name":"x","type":"uint256"}]}]"#,
            r#"[{"type":"function","name":"","inputs":[]}]"#,
            r#"[{"type":"event","name":" ","inputs":[]}]"#,
        ] {
            assert!(matches!(
                AbiRegistry::from_json(json),
                Err(ParseError::InvalidSignature(_))
            ));
        }

        let err = AbiRegistry::from_json(r#"[{"inputs":[{"name":"x","type":"uint256"}]}]"#).unwrap_err();
        assert_eq!(err.to_string(), "invalid function signature '(uint256)'");

        // Constructors and fallbacks carry no name and are skipped
        let registry = AbiRegistry::from_json(
            r#"[{"type":"constructor","inputs":[]},{"type":"fallback"},{"type":"receive"}]"#,
        )
        .unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_deeply_nested_type_rejected() {
        let json = format!(
            r#"[{{"type":"function","name":"f","inputs":[{{"name":"x","type":"uint8{}"}}]}}]"#,
            "[1]".repeat(200_000)
        );
        assert!(matches!(AbiRegistry::from_json(&json), Err(ParseError::UnknownType(_))));
    }

    #[test]
    fn test_duplicate_selector_rejected() {
        let json = r#"[
            {"type":"function","name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}]},
            {"type":"function","name":"transfer","inputs":[{"name":"dst","type":"address"},{"name":"wad","type":"uint256"}]}
        ]"#;
        let err = AbiRegistry::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            ParseError::DuplicateSelector { selector: [0xa9, 0x05, 0x9c, 0xbb], .. }
        ));
    }

    #[test]
    fn test_parse_human_readable_signature() {
        let function =
            FunctionSignature::parse("function transfer(address to, uint256 amount) returns (bool)")
                .unwrap();
        assert_eq!(function.signature, "transfer(address,uint256)");
        assert_eq!(function.inputs[0].name, "to");
        assert_eq!(function.inputs[1].name, "amount");

        let function = FunctionSignature::parse("fill((address, uint256)[] memory orders, bytes data)")
            .unwrap();
        assert_eq!(function.signature, "fill((address,uint256)[],bytes)");
        assert_eq!(function.inputs[0].name, "orders");

        let function = FunctionSignature::parse("totalSupply()").unwrap();
        assert!(function.inputs.is_empty());
        assert_eq!(function.selector_hex(), "0x18160ddd");

        assert!(FunctionSignature::parse("invalid").is_err());
        assert!(FunctionSignature::parse("(uint256)").is_err());
        assert!(FunctionSignature::parse("f(uint256").is_err());
    }

    #[test]
    fn test_from_signatures() {
        let registry =
            AbiRegistry::from_signatures(&["transfer(address,uint256)", "balanceOf(address)"]).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.lookup_hex("0x70a08231").is_some());
    }
}
