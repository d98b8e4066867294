//! Content-addressed memoization for expensive generation sub-steps.
//!
//! Entries are bounded by an LRU list and expire by TTL; a stored content
//! hash detects staleness independent of wall-clock time. One `CacheManager`
//! is scoped to one job (or explicitly cleared between jobs).

use crate::types::now_millis;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// A stored computation result. Owned exclusively by the cache; replaced
/// wholesale on `set`.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub stored_at_ms: u64,
    pub content_hash: String,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub oldest_entry_ms: Option<u64>,
}

/// Bounded, time-limited memoizer keyed by caller-chosen strings.
pub struct CacheManager<T> {
    entries: HashMap<String, CacheEntry<T>>,
    /// LRU bookkeeping, least-recently-used first. Kept separate from the
    /// entry map; every successful get/set moves the key to the back.
    lru: Vec<String>,
    ttl: Duration,
    max_size: usize,
}

impl<T: Clone + Serialize> CacheManager<T> {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            lru: Vec::new(),
            ttl,
            max_size,
        }
    }

    /// Blake3 digest of a content string, hex-encoded.
    pub fn content_hash(content: &str) -> String {
        hex::encode(blake3::hash(content.as_bytes()).as_bytes())
    }

    /// Store `value` under `key`.
    ///
    /// The content hash covers `content` when supplied; otherwise it covers
    /// the serialized value itself, which is a weaker invalidation guarantee
    /// (a recomputation that yields identical output looks unchanged even if
    /// its input changed).
    pub fn set(&mut self, key: &str, value: T, content: Option<&str>) {
        let content_hash = match content {
            Some(text) => Self::content_hash(text),
            None => Self::value_hash(&value),
        };
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_size {
            self.evict_lru();
        }
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                data: value,
                stored_at_ms: now_millis(),
                content_hash,
            },
        );
        self.touch(key);
    }

    /// Look up `key`. Returns `None` — and drops the stale entry — when the
    /// key is absent, the entry has outlived the TTL, or `content_hash` is
    /// supplied and does not match the stored hash. A hit refreshes recency.
    pub fn get(&mut self, key: &str, content_hash: Option<&str>) -> Option<T> {
        let entry = self.entries.get(key)?;
        if self.is_expired(entry) {
            debug!(key, "cache entry expired");
            self.drop_entry(key);
            return None;
        }
        if let Some(expected) = content_hash {
            if entry.content_hash != expected {
                debug!(key, "cache entry content hash mismatch");
                self.drop_entry(key);
                return None;
            }
        }
        let value = entry.data.clone();
        self.touch(key);
        Some(value)
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Single entry point combining lookup-with-hash and fallback
    /// computation. The computed value is stored keyed by the hash of
    /// `content` (when supplied).
    pub async fn get_or_compute<F, Fut, E>(
        &mut self,
        key: &str,
        content: Option<&str>,
        compute: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let hash = content.map(Self::content_hash);
        if let Some(hit) = self.get(key, hash.as_deref()) {
            return Ok(hit);
        }
        let value = compute().await?;
        self.set(key, value.clone(), content);
        Ok(value)
    }

    /// Remove one key. Returns whether it was present.
    pub fn invalidate(&mut self, key: &str) -> bool {
        let existed = self.entries.remove(key).is_some();
        if existed {
            self.lru.retain(|k| k != key);
        }
        existed
    }

    /// Remove every key the pattern matches. Returns the count removed.
    pub fn invalidate_pattern(&mut self, pattern: &Regex) -> usize {
        let doomed: Vec<String> = self
            .entries
            .keys()
            .filter(|key| pattern.is_match(key))
            .cloned()
            .collect();
        for key in &doomed {
            self.drop_entry(key);
        }
        doomed.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    /// Sweep all expired entries. Returns the count removed.
    pub fn cleanup(&mut self) -> usize {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            self.drop_entry(key);
        }
        doomed.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            max_size: self.max_size,
            oldest_entry_ms: self.entries.values().map(|e| e.stored_at_ms).min(),
        }
    }

    fn value_hash(value: &T) -> String {
        let bytes = serde_json::to_vec(value).unwrap_or_default();
        hex::encode(blake3::hash(&bytes).as_bytes())
    }

    fn is_expired(&self, entry: &CacheEntry<T>) -> bool {
        now_millis().saturating_sub(entry.stored_at_ms) > self.ttl.as_millis() as u64
    }

    fn touch(&mut self, key: &str) {
        self.lru.retain(|k| k != key);
        self.lru.push(key.to_string());
    }

    fn drop_entry(&mut self, key: &str) {
        self.entries.remove(key);
        self.lru.retain(|k| k != key);
    }

    fn evict_lru(&mut self) {
        if self.lru.is_empty() {
            return;
        }
        let victim = self.lru.remove(0);
        debug!(key = %victim, "evicting least-recently-used cache entry");
        self.entries.remove(&victim);
    }
}
