//! API Module
//!
//! HTTP handlers and routing for the cache management API.
//!
//! # Endpoints
//! - `GET /cache?action=metrics|get|info|invalidate|clear|prune|history`
//! - `POST /cache` - Store a value with optional ttl, staleWhileRevalidate and tags
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
