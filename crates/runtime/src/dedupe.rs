// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay defense: a bounded LRU of handled incident ids.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

/// Shared bounded set of incident ids a worker has already handled.
///
/// Clones share the same cache; eviction is least-recently-touched so
/// a long-running worker never grows without bound.
#[derive(Clone)]
pub struct IncidentCache {
    inner: Arc<Mutex<LruCache<String, ()>>>,
}

impl IncidentCache {
    /// Default capacity for worker replay defense.
    pub const DEFAULT_CAPACITY: usize = 512;

    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Check-and-mark: returns `true` when the incident was already
    /// handled; otherwise marks it handled and returns `false`.
    pub fn already_handled(&self, incident_id: &str) -> bool {
        let mut cache = self.inner.lock();
        if cache.contains(incident_id) {
            cache.promote(incident_id);
            return true;
        }
        cache.put(incident_id.to_string(), ());
        false
    }

    /// Non-mutating membership probe.
    pub fn contains(&self, incident_id: &str) -> bool {
        self.inner.lock().contains(incident_id)
    }

    /// Mark an incident handled without a probe.
    pub fn mark(&self, incident_id: &str) {
        self.inner.lock().put(incident_id.to_string(), ());
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for IncidentCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for IncidentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncidentCache")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "dedupe_tests.rs"]
mod tests;
