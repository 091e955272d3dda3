// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time-indexed event cache.
//!
//! Holds timestamped entries sorted ascending, fetchable by interval (both
//! ends inclusive at second granularity) and evictable oldest-first. One
//! readers-writer lock guards the entries and the cached head timestamp;
//! readers always see a consistent snapshot of both.
//!
//! Interval lookups binary-search for the nearest entry, then slide across
//! every entry sharing that entry's second, so a fetch never splits a
//! second boundary.

use crate::event::Timestamped;
use crate::timestamp::truncate_millis;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Sorted, bounded, thread-safe store of timestamped events
pub struct EventCache<T> {
    inner: RwLock<Inner<T>>,
}

struct Inner<T> {
    entries: Vec<T>,
    first_ts: Option<i64>,
}

impl<T: Timestamped + Clone> EventCache<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: Vec::new(),
                first_ts: None,
            }),
        }
    }

    /// Smallest timestamp present, or None when empty
    pub fn first_timestamp(&self) -> Option<i64> {
        self.read().first_ts
    }

    /// Smallest timestamp strictly after `last_ts`, comparing at
    /// second-truncated granularity. None when no such entry exists.
    pub fn first_timestamp_since(&self, last_ts: i64) -> Option<i64> {
        let inner = self.read();
        if inner.entries.is_empty() {
            return None;
        }
        let idx = slide_forward(&inner.entries, find_nearest(&inner.entries, last_ts)) + 1;
        inner.entries.get(idx).map(Timestamped::timestamp_millis)
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// Add a batch of entries.
    ///
    /// The batch is sorted first. When it starts at or after the current
    /// tail it is appended; otherwise the two sorted runs are stably
    /// merged, existing entries first on equal timestamps. Either way the
    /// entries stay sorted for the binary searches above.
    pub fn add_all(&self, mut batch: Vec<T>) {
        if batch.is_empty() {
            return;
        }
        batch.sort_by_key(Timestamped::timestamp_millis);
        let batch_first = batch[0].timestamp_millis();
        let added = batch.len();

        let mut inner = self.write();
        let in_order = inner
            .entries
            .last()
            .is_none_or(|last| last.timestamp_millis() <= batch_first);
        if in_order {
            inner.entries.extend(batch);
        } else {
            let existing = std::mem::take(&mut inner.entries);
            inner.entries = merge_by_timestamp(existing, batch);
        }
        inner.first_ts = Some(match inner.first_ts {
            Some(ts) => ts.min(batch_first),
            None => batch_first,
        });
        drop(inner);
        tracing::debug!(added, "added entries");
    }

    /// Copy of all entries for the period, both ends inclusive.
    ///
    /// The bounds are widened to whole seconds: every entry sharing a
    /// second with either endpoint's nearest entry is included.
    pub fn fetch(&self, period_start: i64, period_end: i64) -> Vec<T> {
        let inner = self.read();
        if inner.entries.is_empty() {
            return Vec::new();
        }
        let start = slide_back(&inner.entries, find_nearest(&inner.entries, period_start));
        let end = slide_forward(&inner.entries, find_nearest(&inner.entries, period_end));
        if start > end {
            return Vec::new();
        }
        inner.entries[start..=end].to_vec()
    }

    /// Drop `count` entries from the front; the whole cache when
    /// `count >= len`. `evict(0)` is a no-op.
    pub fn evict(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut inner = self.write();
        let previous = inner.entries.len();
        if count < previous {
            inner.entries.drain(..count);
            inner.first_ts = inner.entries.first().map(Timestamped::timestamp_millis);
        } else {
            inner.entries.clear();
            inner.first_ts = None;
        }
        let remaining = inner.entries.len();
        drop(inner);
        tracing::debug!(count, previous, remaining, "evicted entries");
    }

    /// Empty the cache
    pub fn full_evict(&self) {
        let mut inner = self.write();
        inner.entries.clear();
        inner.first_ts = None;
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner<T>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<T>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Timestamped + Clone> Default for EventCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge two sorted runs, keeping `a`'s entries first on equal timestamps
fn merge_by_timestamp<T: Timestamped>(a: Vec<T>, b: Vec<T>) -> Vec<T> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let mut a = a.into_iter().peekable();
    let mut b = b.into_iter().peekable();
    while let (Some(x), Some(y)) = (a.peek(), b.peek()) {
        if x.timestamp_millis() <= y.timestamp_millis() {
            merged.extend(a.next());
        } else {
            merged.extend(b.next());
        }
    }
    merged.extend(a);
    merged.extend(b);
    merged
}

/// Binary partition search for a timestamp over sorted entries.
///
/// When the timestamp is present, some index holding it is returned; when
/// it falls between two entries, the nearer one wins, ties to the lower
/// index. Entries must be non-empty.
fn find_nearest<T: Timestamped>(entries: &[T], ts: i64) -> usize {
    let ts_at = |idx: isize| entries[idx as usize].timestamp_millis();
    let mut low: isize = 0;
    let mut high: isize = entries.len() as isize - 1;
    if ts < ts_at(low) {
        return low as usize;
    }
    if ts > ts_at(high) {
        return high as usize;
    }
    while low <= high {
        let mid = (low + high) / 2;
        match ts.cmp(&ts_at(mid)) {
            std::cmp::Ordering::Less => high = mid - 1,
            std::cmp::Ordering::Greater => low = mid + 1,
            std::cmp::Ordering::Equal => return mid as usize,
        }
    }
    if (ts - ts_at(low)).abs() >= (ts - ts_at(high)).abs() {
        high as usize
    } else {
        low as usize
    }
}

/// First index sharing `idx`'s second, walking back in time
fn slide_back<T: Timestamped>(entries: &[T], idx: usize) -> usize {
    let second = truncate_millis(entries[idx].timestamp_millis());
    let mut i = idx;
    while i > 0 && truncate_millis(entries[i - 1].timestamp_millis()) == second {
        i -= 1;
    }
    i
}

/// Last index sharing `idx`'s second, walking into the future
fn slide_forward<T: Timestamped>(entries: &[T], idx: usize) -> usize {
    let second = truncate_millis(entries[idx].timestamp_millis());
    let mut i = idx;
    while i + 1 < entries.len() && truncate_millis(entries[i + 1].timestamp_millis()) == second {
        i += 1;
    }
    i
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
