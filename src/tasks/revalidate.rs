//! Stale-While-Revalidate Coordinator
//!
//! Caller-side helper that serves cached data immediately and recomputes
//! stale entries out of band. The cache engine only reports staleness; this
//! is where the refresh is scheduled.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{get_shared, CacheLookup, SetOptions, SharedCache};
use crate::error::{CacheError, Result};

/// Where the value returned by [`Revalidator::fetch`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Served from a fresh entry
    Fresh,
    /// Served from a stale entry; a refresh may be running
    Stale,
    /// Computed by the loader because nothing servable was cached
    Loaded,
}

/// Value returned by [`Revalidator::fetch`].
#[derive(Debug)]
pub struct Fetched<T> {
    pub data: T,
    pub etag: String,
    pub outcome: FetchOutcome,
    /// Background refresh spawned by this call, if any
    pub refresh: Option<JoinHandle<()>>,
}

// == Revalidator ==
/// Wraps the shared cache with fetch-or-load semantics.
///
/// Without single-flight every stale read spawns its own refresh, so a burst
/// of stale reads recomputes the same key several times and the last `set`
/// wins. With single-flight enabled at most one refresh per key runs at a time.
#[derive(Clone)]
pub struct Revalidator {
    cache: SharedCache,
    single_flight: bool,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Revalidator {
    pub fn new(cache: SharedCache) -> Self {
        Self {
            cache,
            single_flight: false,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Enables per-key coalescing of background refreshes.
    pub fn single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    // == Fetch ==
    /// Returns the cached value for `key`, loading it when absent.
    ///
    /// - fresh hit: returned as is, `loader` is dropped unused
    /// - stale hit: returned immediately; `loader` runs in a spawned task
    ///   and its result is written back with `options`
    /// - miss: `loader` runs inline and its result is stored and returned
    pub async fn fetch<T, F, Fut>(&self, key: &str, options: SetOptions, loader: F) -> Result<Fetched<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let lookup: CacheLookup<T> = get_shared(&self.cache, key).await.deserialize()?;

        match lookup {
            CacheLookup {
                data: Some(data),
                is_stale: false,
                etag,
            } => Ok(Fetched {
                data,
                etag: etag.unwrap_or_default(),
                outcome: FetchOutcome::Fresh,
                refresh: None,
            }),
            CacheLookup {
                data: Some(data),
                is_stale: true,
                etag,
            } => Ok(Fetched {
                data,
                etag: etag.unwrap_or_default(),
                outcome: FetchOutcome::Stale,
                refresh: self.spawn_refresh(key, options, loader),
            }),
            CacheLookup { data: None, .. } => {
                let data = loader().await.map_err(|e| CacheError::Loader {
                    key: key.to_string(),
                    message: format!("{:#}", e),
                })?;
                let etag = self.cache.write().await.set(key, &data, options)?;
                Ok(Fetched {
                    data,
                    etag,
                    outcome: FetchOutcome::Loaded,
                    refresh: None,
                })
            }
        }
    }

    // == Spawn Refresh ==
    /// Runs `loader` in the background and stores its result under `key`.
    ///
    /// Returns `None` when single-flight is enabled and a refresh for `key`
    /// is already running. Loader and store failures are logged; the stale
    /// entry stays in place until it expires.
    pub fn spawn_refresh<T, F, Fut>(
        &self,
        key: &str,
        options: SetOptions,
        loader: F,
    ) -> Option<JoinHandle<()>>
    where
        T: Serialize + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let claim = if self.single_flight {
            match InFlightClaim::acquire(&self.in_flight, key) {
                Some(claim) => Some(claim),
                None => {
                    debug!(key, "refresh already in flight");
                    return None;
                }
            }
        } else {
            None
        };

        let cache = Arc::clone(&self.cache);
        let key = key.to_string();

        Some(tokio::spawn(async move {
            let _claim = claim;
            match loader().await {
                Ok(data) => {
                    let stored = cache.write().await.set(key.as_str(), &data, options);
                    match stored {
                        Ok(etag) => debug!(key = %key, etag = %etag, "revalidated entry"),
                        Err(e) => warn!(key = %key, error = %e, "failed to store revalidated value"),
                    }
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    warn!(key = %key, error = %message, "revalidation loader failed");
                }
            }
        }))
    }

    /// Number of keys with a coalesced refresh currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }
}

/// Marks a key as being refreshed until dropped.
struct InFlightClaim {
    in_flight: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlightClaim {
    fn acquire(in_flight: &Arc<Mutex<HashSet<String>>>, key: &str) -> Option<Self> {
        let inserted = in_flight.lock().insert(key.to_string());

        inserted.then(|| Self {
            in_flight: Arc::clone(in_flight),
            key: key.to_string(),
        })
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{Notify, RwLock};

    fn shared() -> SharedCache {
        Arc::new(RwLock::new(CacheStore::new()))
    }

    /// Entries written with a zero fresh window are stale immediately.
    fn stale_options() -> SetOptions {
        SetOptions::new().ttl(60).stale_while_revalidate(0)
    }

    type BoxedLoad = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send>>;

    fn counting_loader(
        calls: &Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl FnOnce() -> BoxedLoad + Send + 'static {
        let calls = Arc::clone(calls);
        move || -> BoxedLoad {
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(value.to_string())
            })
        }
    }

    #[tokio::test]
    async fn test_fetch_miss_loads_and_stores() {
        let cache = shared();
        let revalidator = Revalidator::new(cache.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let fetched = revalidator
            .fetch("news", SetOptions::default(), counting_loader(&calls, "loaded"))
            .await
            .unwrap();

        assert_eq!(fetched.data, "loaded");
        assert_eq!(fetched.outcome, FetchOutcome::Loaded);
        assert!(fetched.refresh.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.read().await.has("news"));
    }

    #[tokio::test]
    async fn test_fetch_fresh_hit_skips_loader() {
        let cache = shared();
        let etag = cache
            .write()
            .await
            .set("news", &"cached", SetOptions::default())
            .unwrap();
        let revalidator = Revalidator::new(cache);
        let calls = Arc::new(AtomicUsize::new(0));

        let fetched = revalidator
            .fetch("news", SetOptions::default(), counting_loader(&calls, "loaded"))
            .await
            .unwrap();

        assert_eq!(fetched.data, "cached");
        assert_eq!(fetched.etag, etag);
        assert_eq!(fetched.outcome, FetchOutcome::Fresh);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_stale_returns_old_value_then_refreshes() {
        let cache = shared();
        cache
            .write()
            .await
            .set("news", &"old", stale_options())
            .unwrap();
        let revalidator = Revalidator::new(cache.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let fetched = revalidator
            .fetch("news", SetOptions::default(), counting_loader(&calls, "new"))
            .await
            .unwrap();

        assert_eq!(fetched.data, "old");
        assert_eq!(fetched.outcome, FetchOutcome::Stale);
        fetched.refresh.expect("refresh should be spawned").await.unwrap();

        let lookup = cache.write().await.get_value("news");
        assert_eq!(lookup.data, Some(serde_json::json!("new")));
        assert!(!lookup.is_stale);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_stale_reads_each_refresh_by_default() {
        let cache = shared();
        cache.write().await.set("k", &"old", stale_options()).unwrap();
        let revalidator = Revalidator::new(cache);
        let calls = Arc::new(AtomicUsize::new(0));

        let first = revalidator
            .fetch("k", stale_options(), counting_loader(&calls, "a"))
            .await
            .unwrap();
        let second = revalidator
            .fetch("k", stale_options(), counting_loader(&calls, "b"))
            .await
            .unwrap();

        first.refresh.unwrap().await.unwrap();
        second.refresh.unwrap().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_flight_coalesces_refreshes() {
        let cache = shared();
        cache.write().await.set("k", &"old", stale_options()).unwrap();
        let revalidator = Revalidator::new(cache).single_flight(true);
        let release = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let gate = Arc::clone(&release);
        let counter = Arc::clone(&calls);
        let first = revalidator
            .fetch("k", stale_options(), move || async move {
                gate.notified().await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>("a".to_string())
            })
            .await
            .unwrap();
        assert!(first.refresh.is_some());
        assert_eq!(revalidator.in_flight(), 1);

        let second = revalidator
            .fetch("k", stale_options(), counting_loader(&calls, "b"))
            .await
            .unwrap();
        assert_eq!(second.outcome, FetchOutcome::Stale);
        assert!(second.refresh.is_none());

        release.notify_one();
        first.refresh.unwrap().await.unwrap();
        assert_eq!(revalidator.in_flight(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let third = revalidator
            .fetch("k", stale_options(), counting_loader(&calls, "c"))
            .await
            .unwrap();
        assert_eq!(third.data, "a");
        third.refresh.expect("claim should be released").await.unwrap();
    }

    #[tokio::test]
    async fn test_loader_failure_on_miss_is_returned() {
        let revalidator = Revalidator::new(shared());

        let result = revalidator
            .fetch("k", SetOptions::default(), || async {
                Err::<String, _>(anyhow::anyhow!("upstream unavailable"))
            })
            .await;

        match result {
            Err(CacheError::Loader { key, message }) => {
                assert_eq!(key, "k");
                assert!(message.contains("upstream unavailable"));
            }
            other => panic!("expected loader error, got {:?}", other.map(|f| f.data)),
        }
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_stale_value() {
        let cache = shared();
        cache.write().await.set("k", &"old", stale_options()).unwrap();
        let revalidator = Revalidator::new(cache.clone());

        let fetched = revalidator
            .fetch("k", SetOptions::default(), || async {
                Err::<String, _>(anyhow::anyhow!("timeout"))
            })
            .await
            .unwrap();
        fetched.refresh.unwrap().await.unwrap();

        let lookup = cache.write().await.get_value("k");
        assert_eq!(lookup.data, Some(serde_json::json!("old")));
        assert!(lookup.is_stale);
    }
}
