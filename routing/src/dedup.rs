//! Time-windowed record of already-processed identifiers.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A set of identifiers with bounded retention.
///
/// Correctness of flood suppression only requires remembering an id for as
/// long as a flood can still be live (a few TTL hops of link latency), so
/// entries are swept once they outlive the retention window instead of
/// accumulating for the whole process lifetime.
#[derive(Debug)]
pub struct SeenSet<K> {
    entries: HashMap<K, Instant>,
    retention: Duration,
}

impl<K: Eq + Hash + Copy> SeenSet<K> {
    /// Create an empty set with the given retention window.
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            retention,
        }
    }

    /// Whether `key` is currently remembered.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Record `key`; returns `false` if it was already remembered.
    pub fn insert(&mut self, key: K, now: Instant) -> bool {
        self.entries.insert(key, now).is_none()
    }

    /// Drop every entry older than the retention window.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let retention = self.retention;
        self.entries
            .retain(|_, seen_at| now.duration_since(*seen_at) < retention);
        before - self.entries.len()
    }

    /// Number of remembered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
