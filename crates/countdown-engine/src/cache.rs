//! Per-event memoization of the resolved next occurrence.
//!
//! Resolution walks the calendar, which is cheap but not free, and widgets
//! re-render often. The cached value stays valid for the calendar day it was
//! computed on; a day rollover or an explicit invalidation (any edit to the
//! event's dates or recurrence) forces recomputation.
//!
//! The cache is process-local state: it never participates in equality,
//! hashing, or serialization of the owning event. Interior mutability keeps
//! lookups available through shared references, so it is **not** thread-safe
//! — one event instance belongs to a single writer/reader at a time,
//! matching how the surrounding application serializes access.

use std::cell::Cell;

use chrono::NaiveDateTime;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct OccurrenceCache {
    next_start: Cell<Option<NaiveDateTime>>,
    updated_at: Cell<Option<NaiveDateTime>>,
}

impl OccurrenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached occurrence, if it was computed on the same calendar day
    /// as `now`.
    pub fn lookup(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let updated_at = self.updated_at.get()?;
        if updated_at.date() == now.date() {
            self.next_start.get()
        } else {
            None
        }
    }

    pub fn store(&self, next_start: NaiveDateTime, now: NaiveDateTime) {
        self.next_start.set(Some(next_start));
        self.updated_at.set(Some(now));
    }

    /// Clear both fields. Must be called on any mutation of the owning
    /// event's title, dates, or recurrence settings, or stale occurrence
    /// dates persist across edits.
    pub fn invalidate(&self) {
        self.next_start.set(None);
        self.updated_at.set(None);
    }

    /// Return the cached value for `now`'s calendar day, or compute, store,
    /// and return a fresh one.
    pub fn get_or_compute(
        &self,
        now: NaiveDateTime,
        compute: impl FnOnce() -> NaiveDateTime,
    ) -> NaiveDateTime {
        if let Some(hit) = self.lookup(now) {
            return hit;
        }
        debug!("occurrence cache miss, resolving");
        let value = compute();
        self.store(value, now);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_empty_cache_misses() {
        let cache = OccurrenceCache::new();
        assert_eq!(cache.lookup(dt(2024, 6, 10, 9)), None);
    }

    #[test]
    fn test_hit_within_same_day() {
        let cache = OccurrenceCache::new();
        cache.store(dt(2024, 6, 15, 9), dt(2024, 6, 10, 8));
        // Later the same day, still a hit.
        assert_eq!(cache.lookup(dt(2024, 6, 10, 22)), Some(dt(2024, 6, 15, 9)));
    }

    #[test]
    fn test_day_rollover_misses() {
        let cache = OccurrenceCache::new();
        cache.store(dt(2024, 6, 15, 9), dt(2024, 6, 10, 8));
        assert_eq!(cache.lookup(dt(2024, 6, 11, 0)), None);
    }

    #[test]
    fn test_invalidate_clears() {
        let cache = OccurrenceCache::new();
        cache.store(dt(2024, 6, 15, 9), dt(2024, 6, 10, 8));
        cache.invalidate();
        assert_eq!(cache.lookup(dt(2024, 6, 10, 9)), None);
    }

    #[test]
    fn test_get_or_compute_runs_once_per_day() {
        let cache = OccurrenceCache::new();
        let mut calls = 0;
        let first = cache.get_or_compute(dt(2024, 6, 10, 8), || {
            calls += 1;
            dt(2024, 6, 15, 9)
        });
        let second = cache.get_or_compute(dt(2024, 6, 10, 20), || {
            calls += 1;
            dt(2024, 6, 16, 9)
        });
        assert_eq!(first, second);
        assert_eq!(calls, 1);
    }
}
