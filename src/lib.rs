//! SWR Cache - an in-memory stale-while-revalidate cache server
//!
//! Serves cached values immediately, flags them once stale so callers can
//! refresh out of band, and supports invalidation by key, tag and key pattern.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheLookup, CacheStore, SetOptions, SharedCache};
pub use config::Config;
pub use error::CacheError;
pub use tasks::{spawn_prune_task, Revalidator};
