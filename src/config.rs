//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::cache::{
    DEFAULT_HISTORY_LIMIT, DEFAULT_RESPONSE_WINDOW, DEFAULT_SWR_SECONDS, DEFAULT_TTL_SECONDS,
};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// TTL in seconds for writes that do not specify one
    pub default_ttl: u64,
    /// Fresh window in seconds for writes that do not specify one
    pub default_stale_while_revalidate: u64,
    /// Optional size bound; `None` keeps the cache unbounded
    pub max_entries: Option<usize>,
    /// HTTP server port
    pub server_port: u16,
    /// Seconds between background prune runs
    pub prune_interval: u64,
    /// Number of lookup timings kept for the moving average
    pub metrics_window: usize,
    /// Number of invalidation events retained
    pub history_limit: usize,
    /// Coalesce concurrent background refreshes of the same key
    pub revalidate_single_flight: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `DEFAULT_STALE_WHILE_REVALIDATE` - Default fresh window in seconds (default: 60)
    /// - `MAX_ENTRIES` - Maximum cache entries (default: unbounded)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `PRUNE_INTERVAL` - Prune frequency in seconds (default: 60)
    /// - `METRICS_WINDOW` - Response-time samples kept (default: 1000)
    /// - `HISTORY_LIMIT` - Invalidation events kept (default: 1000)
    /// - `REVALIDATE_SINGLE_FLIGHT` - `true` to coalesce refreshes (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            default_stale_while_revalidate: env_or(
                "DEFAULT_STALE_WHILE_REVALIDATE",
                defaults.default_stale_while_revalidate,
            ),
            max_entries: env_parse("MAX_ENTRIES").filter(|max| *max > 0),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            prune_interval: env_or("PRUNE_INTERVAL", defaults.prune_interval).max(1),
            metrics_window: env_or("METRICS_WINDOW", defaults.metrics_window),
            history_limit: env_or("HISTORY_LIMIT", defaults.history_limit),
            revalidate_single_flight: env_or(
                "REVALIDATE_SINGLE_FLIGHT",
                defaults.revalidate_single_flight,
            ),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env_parse(name).unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL_SECONDS,
            default_stale_while_revalidate: DEFAULT_SWR_SECONDS,
            max_entries: None,
            server_port: 3000,
            prune_interval: 60,
            metrics_window: DEFAULT_RESPONSE_WINDOW,
            history_limit: DEFAULT_HISTORY_LIMIT,
            revalidate_single_flight: false,
        }
    }
}
