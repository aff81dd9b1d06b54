//! Decoding of JSON-RPC result values.

use serde::de::DeserializeOwned;
use serde_json::Value;

use chainreader_core::error::{ChainReaderError, Result};

/// Decode a JSON-RPC hex quantity.
pub fn quantity(v: &Value) -> Result<u128> {
    let s = v
        .as_str()
        .ok_or_else(|| decode_error(format!("expected hex quantity, got {v}")))?;
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| decode_error(format!("quantity without 0x prefix: {s}")))?;
    if digits.is_empty() {
        return Err(decode_error("empty quantity".into()));
    }
    u128::from_str_radix(digits, 16).map_err(|e| decode_error(format!("bad quantity {s}: {e}")))
}

/// A quantity that must fit in 64 bits (block numbers, nonces, chain ids).
pub fn quantity_u64(v: &Value) -> Result<u64> {
    let n = quantity(v)?;
    u64::try_from(n).map_err(|_| decode_error(format!("quantity {n} exceeds u64")))
}

/// `null` means "not found"; anything else must decode as `T`.
pub fn optional<T: DeserializeOwned>(v: Value) -> Result<Option<T>> {
    if v.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(v)?))
}

fn decode_error(msg: String) -> ChainReaderError {
    ChainReaderError::Deserialization(<serde_json::Error as serde::de::Error>::custom(msg))
}
