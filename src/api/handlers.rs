//! API Handlers
//!
//! HTTP request handlers for the cache management endpoints.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::cache::{get_shared, CacheStore, SharedCache};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    CacheAction, CacheQuery, ClearResponse, HealthResponse, HistoryResponse, InvalidateResponse,
    MetricsResponse, PruneResponse, SetRequest, SetResponse,
};
use crate::tasks::Revalidator;

/// Application state shared across all handlers.
///
/// Contains the cache store wrapped in Arc<RwLock<>> for thread-safe access.
/// The management routes use `cache` directly; `revalidator` is there for
/// routes an embedding application adds to serve its own data.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe cache store
    pub cache: SharedCache,
    /// Fetch-or-load helper over the same store
    pub revalidator: Revalidator,
}

impl AppState {
    /// Creates a new AppState with the given cache store.
    pub fn new(cache: CacheStore) -> Self {
        let cache: SharedCache = Arc::new(RwLock::new(cache));
        Self {
            revalidator: Revalidator::new(Arc::clone(&cache)),
            cache,
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut state = Self::new(CacheStore::from_config(config));
        state.revalidator = state
            .revalidator
            .single_flight(config.revalidate_single_flight);
        state
    }
}

fn required<'a>(value: Option<&'a str>, name: &str, action: &str) -> Result<&'a str> {
    value.ok_or_else(|| {
        CacheError::InvalidRequest(format!("Missing '{}' parameter for action '{}'", name, action))
    })
}

/// Handler for GET /cache?action=...
///
/// Dispatches on `action` (default `metrics`).
pub async fn cache_query_handler(
    State(state): State<AppState>,
    Query(query): Query<CacheQuery>,
) -> Result<Response> {
    let action = query.action().map_err(CacheError::InvalidRequest)?;
    let reason = query.reason.as_deref();

    let response = match action {
        CacheAction::Metrics => {
            let cache = state.cache.read().await;
            let metrics = cache.metrics();
            Json(MetricsResponse {
                hit_ratio: metrics.hit_ratio(),
                metrics,
                size: cache.len(),
                keys: cache.keys(),
            })
            .into_response()
        }
        CacheAction::Get => {
            let key = required(query.key(), "key", "get")?;
            let lookup = get_shared(&state.cache, key).await;
            match lookup.etag.clone() {
                Some(etag) => ([(header::ETAG, etag)], Json(lookup)).into_response(),
                None => Json(lookup).into_response(),
            }
        }
        CacheAction::Info => {
            let key = required(query.key(), "key", "info")?;
            Json(state.cache.read().await.info(key)).into_response()
        }
        CacheAction::Invalidate => {
            let tags = query.tag_list();
            let mut cache = state.cache.write().await;
            let response = if let Some(key) = query.key() {
                InvalidateResponse::key(key, cache.invalidate(key, reason))
            } else if !tags.is_empty() {
                let count = cache.invalidate_by_tags(&tags, reason);
                InvalidateResponse::tags(tags, count)
            } else if let Some(pattern) = query.pattern.as_deref().filter(|p| !p.is_empty()) {
                let count = cache.invalidate_by_pattern(pattern, reason)?;
                InvalidateResponse::pattern(pattern, count)
            } else {
                return Err(CacheError::InvalidRequest(
                    "Action 'invalidate' requires 'key', 'tags' or 'pattern'".to_string(),
                ));
            };
            Json(response).into_response()
        }
        CacheAction::Clear => {
            state.cache.write().await.clear();
            info!("cache cleared via management endpoint");
            Json(ClearResponse { cleared: true }).into_response()
        }
        CacheAction::Prune => {
            let pruned = state.cache.write().await.prune();
            Json(PruneResponse { pruned }).into_response()
        }
        CacheAction::History => {
            let history = state.cache.read().await.invalidation_history();
            Json(HistoryResponse { history }).into_response()
        }
    };

    Ok(response)
}

/// Handler for POST /cache
///
/// Writes `data` under `key`, replacing any existing entry.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let options = req.options.unwrap_or_default();
    let etag = state
        .cache
        .write()
        .await
        .set_value(req.key.as_str(), req.data, options)?;

    Ok(Json(SetResponse::new(req.key, etag)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SetOptions;
    use serde_json::json;

    fn query(pairs: &[(&str, &str)]) -> Query<CacheQuery> {
        let mut q = CacheQuery::default();
        for (name, value) in pairs {
            let value = Some(value.to_string());
            match *name {
                "action" => q.action = value,
                "key" => q.key = value,
                "tags" => q.tags = value,
                "pattern" => q.pattern = value,
                "reason" => q.reason = value,
                _ => unreachable!("unknown query parameter {}", name),
            }
        }
        Query(q)
    }

    #[tokio::test]
    async fn test_set_handler_stores_value() {
        let state = AppState::new(CacheStore::new());

        let req = SetRequest {
            key: "news".to_string(),
            data: json!({"items": []}),
            options: Some(SetOptions::new().tag("news")),
        };
        let response = set_handler(State(state.clone()), Json(req)).await.unwrap();
        assert!(response.success);
        assert_eq!(response.key, "news");

        let info = state.cache.read().await.info("news").unwrap();
        assert_eq!(info.etag, response.etag);
        assert_eq!(info.tags, vec!["news".to_string()]);
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = AppState::new(CacheStore::new());

        let req = SetRequest {
            key: "".to_string(),
            data: json!(1),
            options: None,
        };
        let result = set_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_get_requires_key() {
        let state = AppState::new(CacheStore::new());

        let result = cache_query_handler(State(state), query(&[("action", "get")])).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_invalidate_requires_target() {
        let state = AppState::new(CacheStore::new());

        let result = cache_query_handler(State(state), query(&[("action", "invalidate")])).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_invalidate_bad_pattern() {
        let state = AppState::new(CacheStore::new());

        let result = cache_query_handler(
            State(state),
            query(&[("action", "invalidate"), ("pattern", "([")]),
        )
        .await;
        assert!(matches!(result, Err(CacheError::InvalidPattern(_))));
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let state = AppState::new(CacheStore::new());

        let result = cache_query_handler(State(state), query(&[("action", "explode")])).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_invalidate_by_tags_with_reason() {
        let state = AppState::new(CacheStore::new());
        {
            let mut cache = state.cache.write().await;
            cache.set("n1", &"X", SetOptions::new().tag("news")).unwrap();
            cache
                .set("n2", &"Y", SetOptions::new().tags(["news", "posts"]))
                .unwrap();
        }

        let result = cache_query_handler(
            State(state.clone()),
            query(&[("action", "invalidate"), ("tags", "posts"), ("reason", "republish")]),
        )
        .await;
        assert!(result.is_ok());

        let cache = state.cache.read().await;
        assert_eq!(cache.keys(), vec!["n1".to_string()]);
        assert_eq!(
            cache.invalidation_history()[0].reason.as_deref(),
            Some("republish")
        );
    }

    #[tokio::test]
    async fn test_revalidator_shares_the_store() {
        let state = AppState::from_config(&Config::default());

        let fetched = state
            .revalidator
            .fetch("rankings", SetOptions::default(), || async { Ok::<_, anyhow::Error>(vec![1, 2, 3]) })
            .await
            .unwrap();
        assert_eq!(fetched.data, vec![1, 2, 3]);
        assert!(state.cache.read().await.has("rankings"));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
