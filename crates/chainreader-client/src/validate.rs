//! Input validation performed before any network attempt.

use chainreader_core::error::{ChainReaderError, Result};
use chainreader_core::params::BlockRef;

fn is_hex_of_len(s: &str, digits: usize) -> bool {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .is_some_and(|h| h.len() == digits && h.chars().all(|c| c.is_ascii_hexdigit()))
}

/// `0x` + 40 hex digits. Returns the lowercased address so that cache keys
/// do not depend on checksum casing.
pub fn address(s: &str) -> Result<String> {
    if is_hex_of_len(s, 40) {
        Ok(s.to_ascii_lowercase())
    } else {
        Err(ChainReaderError::InvalidAddress { address: s.to_string() })
    }
}

/// `0x` + 64 hex digits.
pub fn tx_hash(s: &str) -> Result<String> {
    if is_hex_of_len(s, 64) {
        Ok(s.to_ascii_lowercase())
    } else {
        Err(ChainReaderError::InvalidTxHash { tx_hash: s.to_string() })
    }
}

/// A tag, a decimal number or `0x` hex.
pub fn block(s: &str) -> Result<BlockRef> {
    BlockRef::parse(s).ok_or_else(|| ChainReaderError::InvalidBlock {
        block_identifier: s.to_string(),
    })
}

/// Even-length `0x` hex call data.
pub fn call_data(s: &str) -> Result<String> {
    let ok = s
        .strip_prefix("0x")
        .is_some_and(|h| h.len() % 2 == 0 && h.chars().all(|c| c.is_ascii_hexdigit()));
    if ok {
        Ok(s.to_ascii_lowercase())
    } else {
        Err(ChainReaderError::InvalidCallData { data: s.to_string() })
    }
}
