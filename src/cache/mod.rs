//! Sharded in-memory response cache
//!
//! Responses are partitioned across a fixed number of [`Shard`]s. A key's
//! shard is `fnv1a(key) % N`, so every client operation touches exactly one
//! shard lock and shards never block each other. Sharding only bounds lock
//! contention; it has no effect on which answer a key resolves to, except that
//! the fuzzy fallback is scoped to the key's own shard.
//!
//! The cache is volatile: nothing survives a restart.

pub mod reaper;
pub mod shard;

pub use reaper::ReaperHandle;
pub use shard::{CacheEntry, Shard};

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::debug;

use crate::text::DEFAULT_SIMILARITY_THRESHOLD;

/// Cache tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Number of shards, fixed for the process lifetime
    #[serde(default = "default_shards")]
    pub shards: usize,

    /// Maximum entries per shard
    #[serde(default = "default_shard_capacity")]
    pub shard_capacity: usize,

    /// Time-to-live for cached responses
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Minimum similarity for a fuzzy hit (exclusive)
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Background sweep period
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,
}

fn default_shards() -> usize {
    8
}

fn default_shard_capacity() -> usize {
    5000
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_reap_interval_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shards: default_shards(),
            shard_capacity: default_shard_capacity(),
            ttl_secs: default_ttl_secs(),
            similarity_threshold: default_similarity_threshold(),
            reap_interval_secs: default_reap_interval_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub shards: usize,
    pub entries: usize,
    pub capacity: usize,
}

pub struct ShardedCache {
    shards: Box<[Shard]>,
    ttl: Duration,
    similarity_threshold: f64,
}

impl ShardedCache {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.shard_capacity).unwrap_or(NonZeroUsize::MIN);
        let shards = (0..config.shards.max(1))
            .map(|_| Shard::new(capacity))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            shards,
            ttl: config.ttl(),
            similarity_threshold: config.similarity_threshold,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Index of the shard owning `key`
    pub fn shard_index(&self, key: &str) -> usize {
        fnv1a(key.as_bytes()) as usize % self.shards.len()
    }

    pub fn shard_for(&self, key: &str) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Store `value` under `key` with the configured TTL
    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.set_with_ttl(key, value, self.ttl);
    }

    pub fn set_with_ttl(&self, key: &str, value: impl Into<String>, ttl: Duration) {
        if let Some(evicted) = self.shard_for(key).set(key, value.into(), ttl) {
            debug!("Cache shard full, evicted {:?}", evicted);
        }
    }

    /// Exact lookup, then fuzzy lookup within the same shard only
    pub fn get(&self, key: &str) -> Option<String> {
        let shard = self.shard_for(key);

        if let Some(value) = shard.get(key) {
            return Some(value);
        }

        let (matched, value) = shard.fuzzy_get(key, self.similarity_threshold)?;
        debug!("Fuzzy cache hit: {:?} ~ {:?}", key, matched);
        Some(value)
    }

    /// Sweep every shard; returns the number of entries removed
    pub fn remove_expired(&self) -> usize {
        self.shards.iter().map(Shard::remove_expired).sum()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(Shard::is_empty)
    }

    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            shards: self.shards.len(),
            entries: self.len(),
            capacity: self.shards.iter().map(Shard::capacity).sum(),
        }
    }
}

/// 32-bit FNV-1a
fn fnv1a(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    bytes.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(PRIME)
    })
}
