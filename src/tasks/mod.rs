//! Background Tasks Module
//!
//! Work that runs outside the request path.
//!
//! # Tasks
//! - Prune: removes expired entries nobody has read since they expired
//! - Revalidate: recomputes stale entries after they have been served

mod prune;
mod revalidate;

pub use prune::spawn_prune_task;
pub use revalidate::{FetchOutcome, Fetched, Revalidator};
