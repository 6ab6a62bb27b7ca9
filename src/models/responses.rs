//! Response DTOs for the cache management API
//!
//! Defines the structure of outgoing HTTP response bodies. Field names are
//! camelCase on the wire.

use serde::Serialize;

use crate::cache::{CacheMetrics, InvalidationEvent};

/// Response body for `action=metrics`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub metrics: CacheMetrics,
    pub hit_ratio: f64,
    pub size: usize,
    pub keys: Vec<String>,
}

/// Result of an invalidation: a flag for a single key, a count otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Invalidated {
    Existed(bool),
    Count(usize),
}

/// Response body for `action=invalidate`
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub invalidated: Invalidated,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl InvalidateResponse {
    pub fn key(key: impl Into<String>, existed: bool) -> Self {
        Self {
            invalidated: Invalidated::Existed(existed),
            key: Some(key.into()),
            tags: None,
            pattern: None,
        }
    }

    pub fn tags(tags: Vec<String>, count: usize) -> Self {
        Self {
            invalidated: Invalidated::Count(count),
            key: None,
            tags: Some(tags),
            pattern: None,
        }
    }

    pub fn pattern(pattern: impl Into<String>, count: usize) -> Self {
        Self {
            invalidated: Invalidated::Count(count),
            key: None,
            tags: None,
            pattern: Some(pattern.into()),
        }
    }
}

/// Response body for `action=clear`
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
}

/// Response body for `action=prune`
#[derive(Debug, Clone, Serialize)]
pub struct PruneResponse {
    pub pruned: usize,
}

/// Response body for `action=history`
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<InvalidationEvent>,
}

/// Response body for `POST /cache`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub success: bool,
    pub key: String,
    pub etag: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>, etag: impl Into<String>) -> Self {
        Self {
            success: true,
            key: key.into(),
            etag: etag.into(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
