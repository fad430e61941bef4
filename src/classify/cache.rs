//! Memoizing prediction cache.
//!
//! Bounded map with least-recently-used eviction, keyed by normalized
//! text. Each key owns a slot with its own lock, so a computation runs
//! at most once per distinct key: concurrent callers for the same
//! in-flight key block on the slot and receive the stored result, while
//! unrelated keys never contend past the brief map-bookkeeping lock.
//!
//! Computation errors propagate to the caller and are not stored, so a
//! failed computation does not poison the key for later callers.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::classify::types::{Classification, Source};
use crate::error::ClassifyError;

/// Per-key slot. The value mutex is the single-flight gate.
#[derive(Default)]
struct Slot {
    value: Mutex<Option<Classification>>,
}

struct Entry {
    slot: Arc<Slot>,
    stamp: u64,
}

/// Map plus recency index. `recency` orders live keys by last access;
/// its first entry is always the eviction candidate.
#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    recency: BTreeMap<u64, String>,
    clock: u64,
}

/// Bounded, single-flight LRU cache over classification results.
pub struct PredictionCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl PredictionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Return the cached result for `key`, or run `compute` exactly once
    /// and store its result.
    ///
    /// Hits return the stored metrics unchanged, with `source` reported
    /// as [`Source::Cache`]; uncertainty is never recomputed.
    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> Result<Classification, ClassifyError>
    where
        F: FnOnce() -> Result<Classification, ClassifyError>,
    {
        let slot = self.touch(key);

        let mut value = slot.value.lock().expect("cache slot lock poisoned");
        if let Some(stored) = value.as_ref() {
            debug!(key, "Prediction cache hit");
            let mut hit = stored.clone();
            hit.source = Source::Cache;
            return Ok(hit);
        }

        // Miss: compute while holding the slot, so concurrent callers
        // for this key wait instead of recomputing. On error the slot
        // stays empty.
        let computed = compute()?;
        *value = Some(computed.clone());
        Ok(computed)
    }

    /// Get or insert the slot for `key`, refresh its recency stamp, and
    /// evict the least-recently-used entry if over capacity.
    fn touch(&self, key: &str) -> Arc<Slot> {
        let mut guard = self.inner.lock().expect("cache lock poisoned");
        let inner = &mut *guard;

        inner.clock += 1;
        let stamp = inner.clock;

        if let Some(entry) = inner.entries.get_mut(key) {
            inner.recency.remove(&entry.stamp);
            inner.recency.insert(stamp, key.to_string());
            entry.stamp = stamp;
            return Arc::clone(&entry.slot);
        }

        if inner.entries.len() >= self.capacity {
            if let Some((_, oldest)) = inner.recency.pop_first() {
                debug!(key = oldest, "Evicting least-recently-used cache entry");
                inner.entries.remove(&oldest);
            }
        }

        let slot = Arc::new(Slot::default());
        inner.entries.insert(
            key.to_string(),
            Entry {
                slot: Arc::clone(&slot),
                stamp,
            },
        );
        inner.recency.insert(stamp, key.to_string());
        slot
    }

    /// Number of live entries (including in-flight slots).
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries.
    pub fn clear(&self) {
        let mut guard = self.inner.lock().expect("cache lock poisoned");
        guard.entries.clear();
        guard.recency.clear();
    }
}
