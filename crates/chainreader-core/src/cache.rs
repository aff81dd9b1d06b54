//! Finality-aware TTL cache.
//!
//! Whether a blockchain response may be cached, and for how long, depends on
//! how far the queried block sits behind the chain head:
//!
//! - transactions and receipts never change once they exist → permanent
//! - head-relative queries (`latest`, `pending`, ...) → `cache_ttl_latest`
//! - a numbered block deeper than the finality margin → permanent
//! - a numbered block inside the reorg window → `cache_ttl_blocks`
//! - anything else → `cache_ttl_latest`
//!
//! The store is bounded by entry count. When full, the entry closest to its
//! natural expiry is evicted; if every entry is permanent the oldest insert
//! goes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{ChainReaderError, Result};
use crate::params::{BlockRef, Params};

/// Methods whose results are immutable once they exist.
pub const IMMUTABLE_METHODS: &[&str] = &[
    "get_transaction",
    "get_transaction_receipt",
    "eth_getTransactionByHash",
    "eth_getTransactionReceipt",
];

/// How long a cached value stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Never expires; removed only by invalidation, clear or eviction.
    Permanent,
    Expires(Duration),
}

impl Ttl {
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent)
    }
}

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for numbered blocks still inside the finality margin.
    pub cache_ttl_blocks: Duration,
    /// TTL for head-relative and unclassified requests.
    pub cache_ttl_latest: Duration,
    /// Entry-count cap.
    pub max_cache_size: usize,
    /// Confirmations after which a block is treated as final.
    pub finality_margin: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_ttl_blocks: Duration::from_secs(60),
            cache_ttl_latest: Duration::from_secs(12),
            max_cache_size: 10_000,
            finality_margin: 12,
        }
    }
}

/// Snapshot of cache effectiveness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub size: usize,
}

struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
    created_at: Instant,
    seq: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

struct Store<V> {
    entries: HashMap<String, CacheEntry<V>>,
    next_seq: u64,
}

/// Thread-safe, size-bounded TTL cache keyed by request fingerprint.
pub struct TtlCache<V> {
    config: CacheConfig,
    store: Mutex<Store<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Deterministic fingerprint of a request.
///
/// Parameters are hashed in name order so insertion order never matters; the
/// method is both hashed and used as a readable prefix, which lets callers
/// invalidate everything cached for one method.
pub fn fingerprint(method: &str, params: &Params) -> String {
    let canonical = params.canonical();
    // Serializing plain tuples of strings and enums cannot fail.
    let encoded = serde_json::to_vec(&canonical).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update([0u8]);
    hasher.update(&encoded);
    format!("{method}:{}", hex::encode(hasher.finalize()))
}

impl<V: Clone> TtlCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            store: Mutex::new(Store {
                entries: HashMap::new(),
                next_seq: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// See [`fingerprint`].
    pub fn key(&self, method: &str, params: &Params) -> String {
        fingerprint(method, params)
    }

    /// Pick the TTL for a request from its method and block context.
    pub fn determine_ttl(&self, method: &str, params: &Params, current_block: Option<u64>) -> Ttl {
        if IMMUTABLE_METHODS.contains(&method) {
            return Ttl::Permanent;
        }
        match params.block_ref() {
            Some(block) if block.is_head_relative() => Ttl::Expires(self.config.cache_ttl_latest),
            Some(BlockRef::Number(requested)) => match current_block {
                Some(head) if head.saturating_sub(requested) > self.config.finality_margin => {
                    Ttl::Permanent
                }
                _ => Ttl::Expires(self.config.cache_ttl_blocks),
            },
            _ => Ttl::Expires(self.config.cache_ttl_latest),
        }
    }

    /// Returns `true` if the response can be cached forever.
    pub fn is_immutable(&self, method: &str, params: &Params, current_block: Option<u64>) -> bool {
        self.determine_ttl(method, params, current_block).is_permanent()
    }

    /// Look up a key, counting a hit or miss.
    pub fn get(&self, key: &str) -> Result<Option<V>> {
        self.get_at(key, Instant::now())
    }

    /// [`get`](Self::get) evaluated at an explicit instant.
    pub fn get_at(&self, key: &str, now: Instant) -> Result<Option<V>> {
        let mut store = self.lock()?;
        let expired = match store.entries.get(key) {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return Ok(None);
            }
            Some(entry) => entry.is_expired(now),
        };
        if expired {
            store.entries.remove(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key, "cache entry expired");
            return Ok(None);
        }
        self.hits.fetch_add(1, Ordering::Relaxed);
        Ok(store.entries.get(key).map(|e| e.value.clone()))
    }

    /// Store a value, evicting first if the cache is full.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Ttl) -> Result<()> {
        self.set_at(key, value, ttl, Instant::now())
    }

    /// [`set`](Self::set) evaluated at an explicit instant.
    pub fn set_at(&self, key: impl Into<String>, value: V, ttl: Ttl, now: Instant) -> Result<()> {
        let key = key.into();
        let mut store = self.lock()?;

        if !store.entries.contains_key(&key) && store.entries.len() >= self.config.max_cache_size {
            if let Some(victim) = Self::eviction_candidate(&store) {
                if let Some(evicted) = store.entries.remove(&victim) {
                    tracing::debug!(
                        key = %victim,
                        age_ms = now.saturating_duration_since(evicted.created_at).as_millis() as u64,
                        permanent = evicted.expires_at.is_none(),
                        "evicted cache entry"
                    );
                }
            }
        }

        let seq = store.next_seq;
        store.next_seq += 1;
        // A TTL past the end of the clock never expires.
        let expires_at = match ttl {
            Ttl::Permanent => None,
            Ttl::Expires(d) => now.checked_add(d),
        };
        store.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at,
                created_at: now,
                seq,
            },
        );
        Ok(())
    }

    fn eviction_candidate(store: &Store<V>) -> Option<String> {
        let soonest = store
            .entries
            .iter()
            .filter_map(|(k, e)| e.expires_at.map(|at| (at, e.seq, k)))
            .min();
        if let Some((_, _, key)) = soonest {
            return Some(key.clone());
        }
        store
            .entries
            .iter()
            .min_by_key(|(_, e)| e.seq)
            .map(|(k, _)| k.clone())
    }

    /// Remove every entry whose key starts with `prefix`.
    pub fn invalidate(&self, prefix: &str) -> Result<usize> {
        let mut store = self.lock()?;
        let before = store.entries.len();
        store.entries.retain(|k, _| !k.starts_with(prefix));
        let removed = before - store.entries.len();
        tracing::debug!(prefix, removed, "invalidated cache entries");
        Ok(removed)
    }

    /// Drop all entries. Hit/miss counters are lifetime totals and survive.
    pub fn clear(&self) -> Result<()> {
        self.lock()?.entries.clear();
        Ok(())
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        match self.store.lock() {
            Ok(store) => store.entries.len(),
            Err(poisoned) => poisoned.into_inner().entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
            size: self.len(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store<V>>> {
        self.store
            .lock()
            .map_err(|_| ChainReaderError::Cache("cache store lock poisoned".into()))
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
