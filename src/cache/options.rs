//! Write Options Module
//!
//! Per-entry lifetime and tag settings accepted by `CacheStore::set`.

use serde::Deserialize;

/// Default time-to-live in seconds.
pub const DEFAULT_TTL_SECONDS: u64 = 300;

/// Default fresh window in seconds before an entry is served as stale.
pub const DEFAULT_SWR_SECONDS: u64 = 60;

// == Set Options ==
/// Options for a single write. Unset fields fall back to the store defaults.
///
/// Wire names follow the management endpoint: `ttl`, `staleWhileRevalidate`,
/// `tags`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetOptions {
    /// Seconds until the entry expires
    #[serde(default)]
    pub ttl: Option<u64>,
    /// Seconds until the entry turns stale
    #[serde(default)]
    pub stale_while_revalidate: Option<u64>,
    /// Group invalidation labels
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, seconds: u64) -> Self {
        self.ttl = Some(seconds);
        self
    }

    pub fn stale_while_revalidate(mut self, seconds: u64) -> Self {
        self.stale_while_revalidate = Some(seconds);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}
