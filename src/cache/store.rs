//! Cache Store Module
//!
//! Main cache engine: stale-while-revalidate lookups, key/tag/pattern
//! invalidation, pruning and metrics.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{
    generate_etag, CacheEntry, CacheMetrics, EntryState, InvalidationEvent, InvalidationKind,
    InvalidationLog, LruIndex, MetricsRecorder, SetOptions, DEFAULT_SWR_SECONDS,
    DEFAULT_TTL_SECONDS,
};
use crate::cache::SharedCache;
use crate::config::Config;
use crate::error::Result;

// == Lookup Result ==
/// Outcome of a `get`. Absent and expired keys both yield `data: None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheLookup<T> {
    pub data: Option<T>,
    pub is_stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl<T> CacheLookup<T> {
    fn miss() -> Self {
        Self {
            data: None,
            is_stale: false,
            etag: None,
        }
    }

    /// Returns true if the lookup produced data.
    pub fn is_hit(&self) -> bool {
        self.data.is_some()
    }
}

impl CacheLookup<Value> {
    /// Deserializes the payload into `T`.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<CacheLookup<T>> {
        let data = self.data.map(serde_json::from_value).transpose()?;
        Ok(CacheLookup {
            data,
            is_stale: self.is_stale,
            etag: self.etag,
        })
    }
}

// == Entry Info ==
/// Metadata of a stored entry, without its payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryInfo {
    pub key: String,
    pub created_at: u64,
    pub stale_at: u64,
    pub expires_at: u64,
    pub age_ms: u64,
    pub state: EntryState,
    pub tags: Vec<String>,
    pub etag: String,
}

// == Cache Store ==
/// In-memory SWR cache.
///
/// Unbounded unless `with_max_entries` is used. A bounded store first drops
/// expired entries and then evicts the least recently used key to make room
/// for a new one.
#[derive(Debug)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    /// Present only when a size bound is configured. Locked separately so
    /// read-only lookups can still record use.
    lru: Option<Mutex<LruIndex>>,
    max_entries: Option<usize>,
    metrics: MetricsRecorder,
    history: InvalidationLog,
    default_ttl: u64,
    default_swr: u64,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    // == Constructors ==
    /// Creates an unbounded store with the default 300s TTL and 60s fresh window.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            lru: None,
            max_entries: None,
            metrics: MetricsRecorder::default(),
            history: InvalidationLog::default(),
            default_ttl: DEFAULT_TTL_SECONDS,
            default_swr: DEFAULT_SWR_SECONDS,
        }
    }

    /// Creates a store from server configuration.
    pub fn from_config(config: &Config) -> Self {
        let store = Self::new()
            .with_defaults(config.default_ttl, config.default_stale_while_revalidate)
            .with_metrics_window(config.metrics_window)
            .with_history_limit(config.history_limit);

        match config.max_entries {
            Some(max) => store.with_max_entries(max),
            None => store,
        }
    }

    /// Overrides the TTL and fresh window applied when options omit them.
    pub fn with_defaults(mut self, ttl_seconds: u64, swr_seconds: u64) -> Self {
        self.default_ttl = ttl_seconds;
        self.default_swr = swr_seconds;
        self
    }

    /// Bounds the number of entries, evicting least recently used keys.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        let mut lru = LruIndex::new();
        for key in self.entries.keys() {
            lru.touch(key);
        }
        self.lru = Some(Mutex::new(lru));
        self.max_entries = Some(max_entries.max(1));
        self
    }

    pub fn with_metrics_window(mut self, window: usize) -> Self {
        self.metrics = MetricsRecorder::new(window);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = InvalidationLog::new(limit);
        self
    }

    // == Get ==
    /// Retrieves and deserializes a value.
    ///
    /// Fails only when a stored payload does not deserialize into `T`.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Result<CacheLookup<T>> {
        self.get_value(key).deserialize()
    }

    /// Retrieves a raw JSON value.
    ///
    /// Expired entries are removed and counted as misses. Stale entries are
    /// returned with `is_stale` set; refreshing them is up to the caller.
    pub fn get_value(&mut self, key: &str) -> CacheLookup<Value> {
        let started = Instant::now();
        if let Some(lookup) = self.lookup(key, started) {
            return lookup;
        }

        self.remove_entry(key);
        self.metrics.record_miss();
        self.metrics.record_response_time(started.elapsed());
        CacheLookup::miss()
    }

    /// Retrieves a raw JSON value without mutable access to the store.
    ///
    /// Returns `None`, recording nothing, when the entry has expired and must
    /// be removed through `get_value`. Otherwise behaves like `get_value`.
    pub fn try_get_value(&self, key: &str) -> Option<CacheLookup<Value>> {
        self.lookup(key, Instant::now())
    }

    fn lookup(&self, key: &str, started: Instant) -> Option<CacheLookup<Value>> {
        let now = current_timestamp_ms();
        let lookup = match self.entries.get(key) {
            None => {
                self.metrics.record_miss();
                CacheLookup::miss()
            }
            Some(entry) => {
                let state = entry.state_at(now);
                if state == EntryState::Expired {
                    return None;
                }
                let is_stale = state == EntryState::Stale;
                self.metrics.record_hit(is_stale);
                if let Some(lru) = &self.lru {
                    lru.lock().touch(key);
                }
                CacheLookup {
                    data: Some(entry.data.clone()),
                    is_stale,
                    etag: Some(entry.etag.clone()),
                }
            }
        };

        self.metrics.record_response_time(started.elapsed());
        Some(lookup)
    }

    // == Set ==
    /// Serializes and stores a value, replacing any existing entry.
    ///
    /// Returns the etag of the stored payload.
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        data: &T,
        options: SetOptions,
    ) -> Result<String> {
        let value = serde_json::to_value(data)?;
        self.set_value(key, value, options)
    }

    /// Stores a raw JSON value, replacing any existing entry (last write wins).
    pub fn set_value(
        &mut self,
        key: impl Into<String>,
        data: Value,
        options: SetOptions,
    ) -> Result<String> {
        let key = key.into();
        let etag = generate_etag(&data)?;

        if !self.entries.contains_key(&key) {
            self.make_room();
        }

        let entry = CacheEntry::new(
            data,
            etag.clone(),
            options.ttl.unwrap_or(self.default_ttl),
            options.stale_while_revalidate.unwrap_or(self.default_swr),
            options.tags.into_iter().collect(),
            current_timestamp_ms(),
        );

        if let Some(lru) = self.lru.as_mut() {
            lru.get_mut().touch(&key);
        }
        self.entries.insert(key, entry);

        Ok(etag)
    }

    /// Makes room for one more entry: expired entries go first, then the
    /// least recently used ones.
    fn make_room(&mut self) {
        let Some(max) = self.max_entries else {
            return;
        };

        if self.entries.len() >= max {
            let pruned = self.prune();
            if pruned > 0 {
                debug!(pruned, "reclaimed expired entries before evicting");
            }
        }

        while self.entries.len() >= max {
            let Some(oldest) = self.lru.as_mut().and_then(|lru| lru.get_mut().pop_oldest()) else {
                break;
            };
            if self.entries.remove(&oldest).is_some() {
                self.metrics.record_eviction();
                debug!(key = %oldest, "evicted least recently used entry");
            }
        }
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        if let Some(lru) = self.lru.as_mut() {
            lru.get_mut().remove(key);
        }
        self.entries.remove(key)
    }

    // == Invalidation ==
    /// Removes one entry. Returns whether it existed.
    pub fn invalidate(&mut self, key: &str, reason: Option<&str>) -> bool {
        let existed = self.remove_entry(key).is_some();
        self.history
            .record(InvalidationEvent::new(InvalidationKind::Key, key, reason));
        debug!(key, existed, "invalidated key");
        existed
    }

    /// Removes every entry carrying at least one of `tags`.
    ///
    /// Records a single event for the whole tag list.
    pub fn invalidate_by_tags<S: AsRef<str>>(&mut self, tags: &[S], reason: Option<&str>) -> usize {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.has_any_tag(tags))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            self.remove_entry(key);
        }

        let target = tags
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(",");
        debug!(tags = %target, removed = doomed.len(), "invalidated by tags");
        self.history
            .record(InvalidationEvent::new(InvalidationKind::Tag, target, reason));
        doomed.len()
    }

    /// Removes every entry whose key matches `pattern`.
    ///
    /// A pattern that fails to compile is returned as an error and removes
    /// nothing.
    pub fn invalidate_by_pattern(&mut self, pattern: &str, reason: Option<&str>) -> Result<usize> {
        let regex = Regex::new(pattern)?;
        Ok(self.invalidate_by_regex(&regex, reason))
    }

    /// Removes every entry whose key matches a precompiled regex.
    pub fn invalidate_by_regex(&mut self, regex: &Regex, reason: Option<&str>) -> usize {
        let doomed: Vec<String> = self
            .entries
            .keys()
            .filter(|key| regex.is_match(key))
            .cloned()
            .collect();

        for key in &doomed {
            self.remove_entry(key);
        }

        debug!(pattern = regex.as_str(), removed = doomed.len(), "invalidated by pattern");
        self.history.record(InvalidationEvent::new(
            InvalidationKind::Pattern,
            regex.as_str(),
            reason,
        ));
        doomed.len()
    }

    // == Clear ==
    /// Removes every entry and records a `"*"` pattern event.
    pub fn clear(&mut self) {
        let removed = self.entries.len();
        self.entries.clear();
        if let Some(lru) = self.lru.as_mut() {
            lru.get_mut().clear();
        }
        self.history
            .record(InvalidationEvent::new(InvalidationKind::Pattern, "*", None));
        debug!(removed, "cleared cache");
    }

    // == Prune ==
    /// Removes all expired entries, including ones nobody has read since
    /// they expired. Returns the number removed.
    pub fn prune(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_entry(key);
        }
        expired.len()
    }

    // == Accessors ==
    /// Returns current counters.
    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.snapshot()
    }

    pub fn hit_ratio(&self) -> f64 {
        self.metrics.snapshot().hit_ratio()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Number of stored entries, including expired ones not yet pruned.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns all stored keys in lexicographic order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns true if `key` holds a servable (fresh or stale) entry.
    ///
    /// Does not touch metrics or remove expired entries.
    pub fn has(&self, key: &str) -> bool {
        let now = current_timestamp_ms();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Returns metadata for `key` if an entry is stored, expired or not.
    pub fn info(&self, key: &str) -> Option<EntryInfo> {
        let now = current_timestamp_ms();
        self.entries.get(key).map(|entry| {
            let mut tags: Vec<String> = entry.tags.iter().cloned().collect();
            tags.sort();
            EntryInfo {
                key: key.to_string(),
                created_at: entry.created_at,
                stale_at: entry.stale_at,
                expires_at: entry.expires_at,
                age_ms: entry.age_ms(now),
                state: entry.state_at(now),
                tags,
                etag: entry.etag.clone(),
            }
        })
    }

    /// Returns recorded invalidations, oldest first.
    pub fn invalidation_history(&self) -> Vec<InvalidationEvent> {
        self.history.events()
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }
}

// == Shared Lookup ==
/// Looks up `key` in a shared store.
///
/// Runs under the read lock and only takes the write lock when the entry has
/// expired and has to be removed.
pub async fn get_shared(cache: &SharedCache, key: &str) -> CacheLookup<Value> {
    let found = cache.read().await.try_get_value(key);
    match found {
        Some(lookup) => lookup,
        None => cache.write().await.get_value(key),
    }
}
