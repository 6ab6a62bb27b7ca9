//! LRU Index Module
//!
//! Recency index used only when the store is given a size bound.

use std::collections::{BTreeMap, HashMap};

// == LRU Index ==
/// Orders keys by last use with a monotonically increasing tick.
///
/// `touch` and `remove` are O(log n), unlike a scan of an ordered list.
#[derive(Debug, Default)]
pub struct LruIndex {
    tick: u64,
    /// tick -> key, oldest first
    by_tick: BTreeMap<u64, String>,
    /// key -> its current tick
    ticks: HashMap<String, u64>,
}

impl LruIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used.
    pub fn touch(&mut self, key: &str) {
        self.tick += 1;
        if let Some(old) = self.ticks.insert(key.to_string(), self.tick) {
            self.by_tick.remove(&old);
        }
        self.by_tick.insert(self.tick, key.to_string());
    }

    pub fn remove(&mut self, key: &str) {
        if let Some(old) = self.ticks.remove(key) {
            self.by_tick.remove(&old);
        }
    }

    // == Pop Oldest ==
    /// Removes and returns the least recently used key.
    pub fn pop_oldest(&mut self) -> Option<String> {
        let (_, key) = self.by_tick.pop_first()?;
        self.ticks.remove(&key);
        Some(key)
    }

    pub fn clear(&mut self) {
        self.by_tick.clear();
        self.ticks.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.ticks.len()
    }
}
