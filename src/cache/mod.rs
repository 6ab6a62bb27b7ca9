//! Cache Module
//!
//! Stale-while-revalidate cache engine with tag and pattern invalidation.

mod entry;
mod etag;
mod history;
mod lru;
mod metrics;
mod options;
mod store;


use std::sync::Arc;
use tokio::sync::RwLock;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry, EntryState};
pub use etag::generate_etag;
pub use history::{InvalidationEvent, InvalidationKind, InvalidationLog, DEFAULT_HISTORY_LIMIT};
pub use lru::LruIndex;
pub use metrics::{CacheMetrics, MetricsRecorder, DEFAULT_RESPONSE_WINDOW};
pub use options::{SetOptions, DEFAULT_SWR_SECONDS, DEFAULT_TTL_SECONDS};
pub use store::{get_shared, CacheLookup, CacheStore, EntryInfo};

/// The process-wide store as shared between handlers and background tasks.
///
/// Lookups go through `get_shared`, which only takes the write half to drop
/// an expired entry.
pub type SharedCache = Arc<RwLock<CacheStore>>;
