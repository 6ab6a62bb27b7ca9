//! Request DTOs for the cache management API
//!
//! Defines the query string of `GET /cache` and the body of `POST /cache`.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::SetOptions;

/// Operation selected by the `action` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    Metrics,
    Get,
    Info,
    Invalidate,
    Clear,
    Prune,
    History,
}

impl FromStr for CacheAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metrics" => Ok(Self::Metrics),
            "get" => Ok(Self::Get),
            "info" => Ok(Self::Info),
            "invalidate" => Ok(Self::Invalidate),
            "clear" => Ok(Self::Clear),
            "prune" => Ok(Self::Prune),
            "history" => Ok(Self::History),
            other => Err(format!("Unknown action '{}'", other)),
        }
    }
}

/// Query parameters of `GET /cache`.
///
/// # Fields
/// - `action`: operation to run, `metrics` when omitted
/// - `key`: target key for `get`, `info` and `invalidate`
/// - `tags`: comma separated tags for `invalidate`
/// - `pattern`: key regex for `invalidate`
/// - `reason`: free text recorded in the invalidation history
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheQuery {
    pub action: Option<String>,
    pub key: Option<String>,
    pub tags: Option<String>,
    pub pattern: Option<String>,
    pub reason: Option<String>,
}

impl CacheQuery {
    /// Parses `action`, defaulting to `metrics`.
    pub fn action(&self) -> Result<CacheAction, String> {
        self.action.as_deref().map_or(Ok(CacheAction::Metrics), |action| action.parse())
    }

    /// Splits `tags` on commas, dropping blanks.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Returns `key` if present and non-empty.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref().filter(|key| !key.is_empty())
    }
}

/// Request body of `POST /cache`.
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// Payload to cache
    pub data: Value,
    /// Lifetime and tags; store defaults apply when omitted
    #[serde(default)]
    pub options: Option<SetOptions>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.trim().is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        None
    }
}
