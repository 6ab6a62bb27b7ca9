//! Cache Entry Module
//!
//! Defines a single cached payload together with its freshness window.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;

// == Entry State ==
/// Freshness state of an entry at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    /// `now < stale_at`
    Fresh,
    /// `stale_at <= now < expires_at`, still servable
    Stale,
    /// `now >= expires_at`, treated as absent
    Expired,
}

// == Cache Entry ==
/// Represents a single cache entry with its payload and lifecycle timestamps.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload
    pub data: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Point after which the entry is served as stale (Unix milliseconds)
    pub stale_at: u64,
    /// Point after which the entry is no longer servable (Unix milliseconds)
    pub expires_at: u64,
    /// Labels used for group invalidation
    pub tags: HashSet<String>,
    /// Fingerprint of the serialized payload
    pub etag: String,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry written at `now` (Unix milliseconds).
    ///
    /// # Arguments
    /// * `data` - The payload to store
    /// * `etag` - Fingerprint of `data`
    /// * `ttl_seconds` - Seconds until the entry expires
    /// * `swr_seconds` - Seconds until the entry turns stale
    /// * `tags` - Invalidation labels
    pub fn new(
        data: Value,
        etag: String,
        ttl_seconds: u64,
        swr_seconds: u64,
        tags: HashSet<String>,
        now: u64,
    ) -> Self {
        Self {
            data,
            created_at: now,
            stale_at: now.saturating_add(swr_seconds.saturating_mul(1000)),
            expires_at: now.saturating_add(ttl_seconds.saturating_mul(1000)),
            tags,
            etag,
        }
    }

    // == State ==
    /// Classifies the entry at `now`.
    ///
    /// Expiry takes precedence over staleness, so an entry whose stale window
    /// is longer than its TTL goes straight from fresh to expired.
    pub fn state_at(&self, now: u64) -> EntryState {
        if now >= self.expires_at {
            EntryState::Expired
        } else if now >= self.stale_at {
            EntryState::Stale
        } else {
            EntryState::Fresh
        }
    }

    /// Checks if the entry has expired.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.state_at(now) == EntryState::Expired
    }

    /// Returns true if any of `tags` is attached to this entry.
    pub fn has_any_tag<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().any(|tag| self.tags.contains(tag.as_ref()))
    }

    /// Milliseconds elapsed since the entry was written.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry_at(now: u64, ttl: u64, swr: u64) -> CacheEntry {
        CacheEntry::new(json!({"v": 1}), "e".to_string(), ttl, swr, HashSet::new(), now)
    }

    #[test]
    fn test_entry_timestamps() {
        let entry = entry_at(1_000, 300, 60);

        assert_eq!(entry.created_at, 1_000);
        assert_eq!(entry.stale_at, 61_000);
        assert_eq!(entry.expires_at, 301_000);
    }

    #[test]
    fn test_entry_lifecycle() {
        let entry = entry_at(0, 2, 1);

        assert_eq!(entry.state_at(0), EntryState::Fresh);
        assert_eq!(entry.state_at(999), EntryState::Fresh);
        assert_eq!(entry.state_at(1_000), EntryState::Stale);
        assert_eq!(entry.state_at(1_999), EntryState::Stale);
        assert_eq!(entry.state_at(2_000), EntryState::Expired);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = entry_at(5_000, 0, 0);

        assert!(entry.is_expired_at(5_000), "Entry should be expired at boundary");
        assert_ne!(entry.state_at(5_000), EntryState::Stale);
    }

    #[test]
    fn test_stale_window_longer_than_ttl() {
        let entry = entry_at(0, 1, 10);

        assert_eq!(entry.state_at(500), EntryState::Fresh);
        assert_eq!(entry.state_at(1_000), EntryState::Expired);
    }

    #[test]
    fn test_has_any_tag() {
        let tags: HashSet<String> = ["x", "y"].iter().map(|s| s.to_string()).collect();
        let entry = CacheEntry::new(json!(null), "e".into(), 10, 5, tags, 0);

        assert!(entry.has_any_tag(&["y", "z"]));
        assert!(!entry.has_any_tag(&["z"]));
        assert!(!entry.has_any_tag::<&str>(&[]));
    }

    #[test]
    fn test_age_ms() {
        let entry = entry_at(1_000, 10, 5);
        assert_eq!(entry.age_ms(3_500), 2_500);
        assert_eq!(entry.age_ms(500), 0);
    }
}
