//! ABI type descriptors
//!
//! A [`TypeSpec`] is built either from an ABI JSON `type` string plus its
//! `components`, or from a canonical type string such as `(address,uint256)[]`.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use super::error::ParseError;

/// Size in bytes of one ABI word
pub const WORD: usize = 32;

/// Deepest accepted nesting of arrays and tuples, counted per level
pub const MAX_NESTING: usize = 32;

/// A parsed ABI type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSpec {
    /// `uint<N>`, N in 8..=256, multiple of 8
    Uint(usize),
    /// `int<N>`, N in 8..=256, multiple of 8
    Int(usize),
    Bool,
    Address,
    /// `bytes<N>`, N in 1..=32
    FixedBytes(usize),
    Bytes,
    String,
    /// `T[]`
    Array(Box<TypeSpec>),
    /// `T[K]`
    FixedArray(Box<TypeSpec>, usize),
    /// `(T1,...,Tn)`
    Tuple(Vec<TupleField>),
}

/// A named member of a tuple type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleField {
    /// Field name (may be empty)
    pub name: String,
    pub ty: TypeSpec,
}

impl TupleField {
    pub fn new(name: impl Into<String>, ty: TypeSpec) -> Self {
        Self { name: name.into(), ty }
    }
}

impl TypeSpec {
    /// Build a type from an ABI JSON `type` string and its parsed `components`
    ///
    /// `components` must be present when the base type is `tuple` (including
    /// arrays of tuples) and must be absent or empty otherwise.
    pub fn from_abi(ty: &str, components: Option<Vec<TupleField>>) -> Result<Self, ParseError> {
        let (base, dims) = split_dims(ty.trim())?;

        let base_ty = if base == "tuple" {
            let fields = components.ok_or_else(|| ParseError::MissingComponents {
                ty: ty.to_string(),
            })?;
            TypeSpec::Tuple(fields)
        } else {
            if components.is_some_and(|c| !c.is_empty()) {
                return Err(ParseError::UnexpectedComponents { ty: ty.to_string() });
            }
            parse_elementary(base).ok_or_else(|| ParseError::UnknownType(ty.to_string()))?
        };

        let kind = apply_dims(base_ty, &dims);
        if !kind.is_valid() {
            return Err(ParseError::UnknownType(ty.to_string()));
        }
        Ok(kind)
    }

    /// Whether all widths are in range and nesting stays within [`MAX_NESTING`]
    ///
    /// Types produced by the parsers always pass. Decoding rejects hand-built
    /// types that do not.
    pub fn is_valid(&self) -> bool {
        self.valid_within(MAX_NESTING)
    }

    fn valid_within(&self, levels: usize) -> bool {
        match self {
            Self::Uint(bits) | Self::Int(bits) => valid_bits(*bits),
            Self::FixedBytes(size) => (1..=32).contains(size),
            Self::Bool | Self::Address | Self::Bytes | Self::String => true,
            Self::Array(inner) => levels > 0 && inner.valid_within(levels - 1),
            Self::FixedArray(inner, len) => {
                *len > 0 && levels > 0 && inner.valid_within(levels - 1)
            }
            Self::Tuple(fields) => {
                levels > 0 && fields.iter().all(|f| f.ty.valid_within(levels - 1))
            }
        }
    }

    /// Whether values of this type are encoded through an offset in the head
    pub fn is_dynamic(&self) -> bool {
        self.static_words().is_none()
    }

    /// Number of head words this type occupies inside an enclosing tuple
    ///
    /// Dynamic types take a single offset word; static composites are laid
    /// out inline.
    pub fn head_words(&self) -> usize {
        self.static_words().unwrap_or(1)
    }

    /// Inline size in words, `None` for dynamic types
    fn static_words(&self) -> Option<usize> {
        match self {
            Self::Bytes | Self::String | Self::Array(_) => None,
            Self::FixedArray(inner, len) => inner.static_words().map(|w| w.saturating_mul(*len)),
            Self::Tuple(fields) => fields.iter().try_fold(0usize, |acc, f| {
                f.ty.static_words().map(|w| acc.saturating_add(w))
            }),
            _ => Some(1),
        }
    }

    /// Canonical form used in selector signatures, e.g. `(address,uint256)[]`
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        self.write_type(&mut out, false);
        out
    }

    /// Field names if this is a tuple type
    pub fn field_names(&self) -> Option<Vec<&str>> {
        match self {
            Self::Tuple(fields) => Some(fields.iter().map(|f| f.name.as_str()).collect()),
            _ => None,
        }
    }

    fn write_type(&self, out: &mut String, tuple_prefix: bool) {
        // Writing to a String cannot fail
        let _ = match self {
            Self::Uint(bits) => write!(out, "uint{bits}"),
            Self::Int(bits) => write!(out, "int{bits}"),
            Self::Bool => write!(out, "bool"),
            Self::Address => write!(out, "address"),
            Self::FixedBytes(size) => write!(out, "bytes{size}"),
            Self::Bytes => write!(out, "bytes"),
            Self::String => write!(out, "string"),
            Self::Array(inner) => {
                inner.write_type(out, tuple_prefix);
                write!(out, "[]")
            }
            Self::FixedArray(inner, len) => {
                inner.write_type(out, tuple_prefix);
                write!(out, "[{len}]")
            }
            Self::Tuple(fields) => {
                if tuple_prefix {
                    out.push_str("tuple");
                }
                out.push('(');
                for (idx, field) in fields.iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    field.ty.write_type(out, tuple_prefix);
                }
                write!(out, ")")
            }
        };
    }
}

impl fmt::Display for TypeSpec {
    /// Human-facing form, tuples spelled `tuple(...)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_type(&mut out, true);
        f.write_str(&out)
    }
}

impl FromStr for TypeSpec {
    type Err = ParseError;

    /// Parse a canonical type string; tuple members are unnamed
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_nested(s, 0)
    }
}

/// Parse `s` found `depth` levels below the top-level type
fn parse_nested(s: &str, depth: usize) -> Result<TypeSpec, ParseError> {
    let s = s.trim();
    let unknown = || ParseError::UnknownType(s.to_string());

    let (base, dims) = split_dims(s)?;
    let depth = depth + dims.len();
    if depth > MAX_NESTING {
        return Err(unknown());
    }

    let inner = base
        .strip_prefix("tuple")
        .unwrap_or(base)
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'));

    let base_ty = match inner {
        Some(_) if depth >= MAX_NESTING => return Err(unknown()),
        Some(inner) => TypeSpec::Tuple(
            split_top_level(inner)
                .ok_or_else(unknown)?
                .into_iter()
                .map(|member| parse_nested(member, depth + 1).map(|ty| TupleField::new("", ty)))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        None => parse_elementary(base).ok_or_else(unknown)?,
    };

    Ok(apply_dims(base_ty, &dims))
}

impl serde::Serialize for TypeSpec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Split trailing array dimensions off a type string
///
/// Returns the base and the dimensions in left-to-right order, `None` for `[]`.
fn split_dims(ty: &str) -> Result<(&str, Vec<Option<usize>>), ParseError> {
    let mut base = ty;
    let mut dims = Vec::new();

    while let Some(rest) = base.strip_suffix(']') {
        let open = rest
            .rfind('[')
            .ok_or_else(|| ParseError::UnknownType(ty.to_string()))?;
        if dims.len() == MAX_NESTING {
            return Err(ParseError::UnknownType(ty.to_string()));
        }
        let len = &rest[open + 1..];
        if len.is_empty() {
            dims.push(None);
        } else {
            match parse_size(len) {
                Some(k) if k > 0 => dims.push(Some(k)),
                _ => return Err(ParseError::UnknownType(ty.to_string())),
            }
        }
        base = &rest[..open];
    }

    if base.is_empty() {
        return Err(ParseError::UnknownType(ty.to_string()));
    }

    dims.reverse();
    Ok((base, dims))
}

fn apply_dims(base: TypeSpec, dims: &[Option<usize>]) -> TypeSpec {
    dims.iter().fold(base, |ty, dim| match dim {
        Some(len) => TypeSpec::FixedArray(Box::new(ty), *len),
        None => TypeSpec::Array(Box::new(ty)),
    })
}

fn parse_elementary(base: &str) -> Option<TypeSpec> {
    let ty = match base {
        "bool" => TypeSpec::Bool,
        "address" => TypeSpec::Address,
        "string" => TypeSpec::String,
        "bytes" => TypeSpec::Bytes,
        "uint" => TypeSpec::Uint(256),
        "int" => TypeSpec::Int(256),
        _ => {
            if let Some(bits) = base.strip_prefix("uint") {
                TypeSpec::Uint(parse_bits(bits)?)
            } else if let Some(bits) = base.strip_prefix("int") {
                TypeSpec::Int(parse_bits(bits)?)
            } else if let Some(size) = base.strip_prefix("bytes") {
                let size = parse_size(size)?;
                if !(1..=32).contains(&size) {
                    return None;
                }
                TypeSpec::FixedBytes(size)
            } else {
                return None;
            }
        }
    };
    Some(ty)
}

fn parse_bits(bits: &str) -> Option<usize> {
    parse_size(bits).filter(|bits| valid_bits(*bits))
}

fn valid_bits(bits: usize) -> bool {
    bits % 8 == 0 && (8..=256).contains(&bits)
}

/// Decimal without sign or leading zeros
fn parse_size(digits: &str) -> Option<usize> {
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || (digits.len() > 1 && digits.starts_with('0'))
    {
        return None;
    }
    digits.parse().ok()
}

/// Split a comma separated list at nesting depth zero
///
/// Returns `None` on unbalanced parentheses or an empty member.
pub(crate) fn split_top_level(list: &str) -> Option<Vec<&str>> {
    if list.trim().is_empty() {
        return Some(Vec::new());
    }

    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in list.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                parts.push(list[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(list[start..].trim());

    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_elementary() {
        assert_eq!("uint256".parse::<TypeSpec>().unwrap(), TypeSpec::Uint(256));
        assert_eq!("uint".parse::<TypeSpec>().unwrap(), TypeSpec::Uint(256));
        assert_eq!("int8".parse::<TypeSpec>().unwrap(), TypeSpec::Int(8));
        assert_eq!("bytes32".parse::<TypeSpec>().unwrap(), TypeSpec::FixedBytes(32));
        assert_eq!("bytes".parse::<TypeSpec>().unwrap(), TypeSpec::Bytes);
        assert_eq!("address".parse::<TypeSpec>().unwrap(), TypeSpec::Address);
    }

    #[test]
    fn test_reject_unknown_types() {
        for bad in ["uint7", "uint264", "int0", "bytes0", "bytes33", "uint08", "fixed128x18", "foo", "uint256[0]", "[]", "address[", "function"] {
            assert!(
                matches!(bad.parse::<TypeSpec>(), Err(ParseError::UnknownType(_))),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn test_array_dimensions_order() {
        // uint8[2][] is a dynamic array of uint8[2]
        let ty: TypeSpec = "uint8[2][]".parse().unwrap();
        assert_eq!(
            ty,
            TypeSpec::Array(Box::new(TypeSpec::FixedArray(Box::new(TypeSpec::Uint(8)), 2)))
        );
        assert_eq!(ty.canonical(), "uint8[2][]");
    }

    #[test]
    fn test_tuple_canonical_and_display() {
        let ty: TypeSpec = "(address,(uint256,bytes)[])[2]".parse().unwrap();
        assert_eq!(ty.canonical(), "(address,(uint256,bytes)[])[2]");
        assert_eq!(ty.to_string(), "tuple(address,tuple(uint256,bytes)[])[2]");

        let prefixed: TypeSpec = "tuple(address,uint256)".parse().unwrap();
        assert_eq!(prefixed.canonical(), "(address,uint256)");
    }

    #[test]
    fn test_from_abi_components() {
        let fields = vec![
            TupleField::new("to", TypeSpec::Address),
            TupleField::new("amount", TypeSpec::Uint(256)),
        ];
        let ty = TypeSpec::from_abi("tuple[]", Some(fields)).unwrap();
        assert_eq!(ty.canonical(), "(address,uint256)[]");

        assert!(matches!(
            TypeSpec::from_abi("tuple", None),
            Err(ParseError::MissingComponents { .. })
        ));
        assert!(matches!(
            TypeSpec::from_abi("uint256", Some(vec![TupleField::new("x", TypeSpec::Bool)])),
            Err(ParseError::UnexpectedComponents { .. })
        ));
        assert_eq!(TypeSpec::from_abi("uint256", Some(vec![])).unwrap(), TypeSpec::Uint(256));
    }

    #[test]
    fn test_dynamic_classification() {
        let cases = [
            ("uint256", false),
            ("bytes32", false),
            ("bytes", true),
            ("string", true),
            ("address[]", true),
            ("address[3]", false),
            ("string[3]", true),
            ("(uint256,bool)", false),
            ("(uint256,string)", true),
            ("(uint256,bool)[2]", false),
            ("(uint256,bytes)[2]", true),
        ];
        for (ty, dynamic) in cases {
            assert_eq!(ty.parse::<TypeSpec>().unwrap().is_dynamic(), dynamic, "{ty}");
        }
    }

    #[test]
    fn test_head_words() {
        let cases = [
            ("uint256", 1),
            ("bytes", 1),
            ("address[3]", 3),
            ("(uint256,bool,address)", 3),
            ("(uint256,bool)[2]", 4),
            ("uint8[2][3]", 6),
            ("(uint256,string)", 1),
        ];
        for (ty, words) in cases {
            assert_eq!(ty.parse::<TypeSpec>().unwrap().head_words(), words, "{ty}");
        }
    }

    #[test]
    fn test_nesting_limit() {
        let deepest = format!("uint8{}", "[1]".repeat(MAX_NESTING));
        assert_eq!(deepest.parse::<TypeSpec>().unwrap().head_words(), 1);

        for bad in [
            format!("uint8{}", "[1]".repeat(MAX_NESTING + 1)),
            format!("uint8{}", "[1]".repeat(200_000)),
            format!("{}uint8{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1)),
            format!("{}uint8{}", "(".repeat(200_000), ")".repeat(200_000)),
            format!("({})", format!("uint8{}", "[]".repeat(MAX_NESTING))),
        ] {
            assert!(matches!(bad.parse::<TypeSpec>(), Err(ParseError::UnknownType(_))));
            assert!(TypeSpec::from_abi(&bad, None).is_err());
        }
    }

    #[test]
    fn test_from_abi_rejects_deep_components() {
        let deep = (0..MAX_NESTING).fold(TypeSpec::Bool, |ty, _| TypeSpec::Array(Box::new(ty)));
        assert!(matches!(
            TypeSpec::from_abi("tuple", Some(vec![TupleField::new("x", deep)])),
            Err(ParseError::UnknownType(_))
        ));
        assert!(TypeSpec::from_abi("tuple", Some(vec![TupleField::new("x", TypeSpec::Bool)])).is_ok());
    }

    #[test]
    fn test_hand_built_validity() {
        assert!(TypeSpec::Int(8).is_valid());
        assert!(!TypeSpec::Int(0).is_valid());
        assert!(!TypeSpec::Uint(260).is_valid());
        assert!(!TypeSpec::FixedBytes(33).is_valid());
        assert!(!TypeSpec::FixedArray(Box::new(TypeSpec::Bool), 0).is_valid());
        assert!(!TypeSpec::Tuple(vec![TupleField::new("", TypeSpec::FixedBytes(0))]).is_valid());
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("").unwrap(), Vec::<&str>::new());
        assert_eq!(
            split_top_level("address,(uint256,bool),bytes").unwrap(),
            vec!["address", "(uint256,bool)", "bytes"]
        );
        assert!(split_top_level("address,(uint256").is_none());
        assert!(split_top_level("address,,bool").is_none());
    }
}
