//! Request parameters as an ordered list of named, typed scalars.
//!
//! The executor never looks inside parameter values except to hash them for
//! the cache fingerprint and to read the block context that drives the TTL
//! policy.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameter names that carry the block context of a request.
pub const BLOCK_PARAM_NAMES: &[&str] = &["block_identifier", "block"];

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Text(String),
    /// Opaque structured value.
    Json(Value),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Value> for ParamValue {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

/// Named parameters of a logical request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a parameter, replacing any existing value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pairs sorted by name, as hashed into cache fingerprints.
    pub fn canonical(&self) -> Vec<(&str, &ParamValue)> {
        let mut pairs: Vec<_> = self.entries.iter().map(|(n, v)| (n.as_str(), v)).collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs
    }

    /// The block this request is evaluated at, if it names one.
    pub fn block_ref(&self) -> Option<BlockRef> {
        BLOCK_PARAM_NAMES
            .iter()
            .find_map(|name| self.get(name))
            .and_then(BlockRef::from_param)
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Symbolic block tags relative to the chain head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Pending,
    Safe,
    Finalized,
}

impl BlockTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Pending => "pending",
            Self::Safe => "safe",
            Self::Finalized => "finalized",
        }
    }
}

/// Block context of a request: a head-relative tag or a concrete height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef {
    Tag(BlockTag),
    Number(u64),
}

impl BlockRef {
    /// Parse a textual block identifier: a tag, `earliest`, a decimal
    /// number or a `0x`-prefixed hex number.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "latest" => return Some(Self::Tag(BlockTag::Latest)),
            "pending" => return Some(Self::Tag(BlockTag::Pending)),
            "safe" => return Some(Self::Tag(BlockTag::Safe)),
            "finalized" => return Some(Self::Tag(BlockTag::Finalized)),
            "earliest" => return Some(Self::Number(0)),
            _ => {}
        }
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            if hex.is_empty() {
                return None;
            }
            return u64::from_str_radix(hex, 16).ok().map(Self::Number);
        }
        s.parse::<u64>().ok().map(Self::Number)
    }

    pub fn from_param(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::UInt(n) => Some(Self::Number(*n)),
            ParamValue::Int(n) if *n >= 0 => Some(Self::Number(*n as u64)),
            ParamValue::Text(s) => Self::parse(s),
            ParamValue::Json(Value::String(s)) => Self::parse(s),
            ParamValue::Json(Value::Number(n)) => n.as_u64().map(Self::Number),
            _ => None,
        }
    }

    /// Returns `true` for tags that follow the chain head.
    pub fn is_head_relative(&self) -> bool {
        matches!(self, Self::Tag(_))
    }

    /// JSON-RPC quantity/tag encoding.
    pub fn to_rpc_string(&self) -> String {
        match self {
            Self::Tag(tag) => tag.as_str().to_string(),
            Self::Number(n) => format!("0x{n:x}"),
        }
    }
}
