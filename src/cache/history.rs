//! Invalidation History Module
//!
//! Bounded audit log of invalidations. Diagnostic only; never read by the
//! cache itself.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Default number of events retained.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// What an invalidation targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationKind {
    Key,
    Tag,
    Pattern,
}

// == Invalidation Event ==
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidationEvent {
    #[serde(rename = "type")]
    pub kind: InvalidationKind,
    /// Key, comma-joined tag list, or pattern source
    pub target: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl InvalidationEvent {
    pub fn new(kind: InvalidationKind, target: impl Into<String>, reason: Option<&str>) -> Self {
        Self {
            kind,
            target: target.into(),
            timestamp: Utc::now(),
            reason: reason.map(str::to_string),
        }
    }
}

// == Invalidation Log ==
/// Ring buffer of invalidation events, oldest first.
#[derive(Debug)]
pub struct InvalidationLog {
    events: VecDeque<InvalidationEvent>,
    limit: usize,
}

impl Default for InvalidationLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl InvalidationLog {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            events: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn record(&mut self, event: InvalidationEvent) {
        if self.events.len() == self.limit {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Returns a copy of the retained events, oldest first.
    pub fn events(&self) -> Vec<InvalidationEvent> {
        self.events.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_drops_oldest() {
        let mut log = InvalidationLog::new(2);
        log.record(InvalidationEvent::new(InvalidationKind::Key, "a", None));
        log.record(InvalidationEvent::new(InvalidationKind::Tag, "b", None));
        log.record(InvalidationEvent::new(InvalidationKind::Pattern, "c", Some("deploy")));

        let events = log.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].target, "b");
        assert_eq!(events[1].target, "c");
        assert_eq!(events[1].reason.as_deref(), Some("deploy"));
    }

    #[test]
    fn test_event_serialize() {
        let event = InvalidationEvent::new(InvalidationKind::Tag, "news,posts", None);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "tag");
        assert_eq!(json["target"], "news,posts");
        assert!(json.get("timestamp").is_some());
        assert!(json.get("reason").is_none());
    }
}
