// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule dispatch.
//!
//! On every tick the dispatcher determines which schedules are ready,
//! assembles each one's event window from the cache, and hands the
//! executions to a single serial worker: schedules run in ascending
//! period order, and the cache is evicted only after every ready schedule
//! has consumed its window. Eviction is tied to the longest-period
//! schedule, so cache retention equals the longest period.

use crate::worker::{TaskWorker, WorkerError};
use pulse_core::{is_in_schedule, timestamp, Clock, EventCache, PeriodicSchedule, Timestamped};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

type SharedSchedule<T> = Arc<Mutex<Box<dyn PeriodicSchedule<T>>>>;

/// Fires periodic schedules against the event cache
pub struct ScheduleDispatcher<T, C> {
    cache: Arc<EventCache<T>>,
    clock: C,
    schedules: Mutex<Vec<SharedSchedule<T>>>,
    worker: TaskWorker,
    last_evict_tick: Mutex<i64>,
}

impl<T, C> ScheduleDispatcher<T, C>
where
    T: Timestamped + Clone + Send + Sync + 'static,
    C: Clock,
{
    pub fn new(cache: Arc<EventCache<T>>, clock: C) -> Self {
        Self {
            cache,
            clock,
            schedules: Mutex::new(Vec::new()),
            worker: TaskWorker::new("schedules"),
            last_evict_tick: Mutex::new(-1),
        }
    }

    pub fn start(&self) -> Result<(), WorkerError> {
        self.worker.start()
    }

    pub fn stop(&self) -> Result<(), WorkerError> {
        self.worker.stop()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    pub fn pending_tasks(&self) -> usize {
        self.worker.pending_tasks()
    }

    pub fn join_tasks(&self, timeout: Duration) -> bool {
        self.worker.join_tasks(timeout)
    }

    /// Add a schedule; the list stays sorted by ascending period, ties in
    /// registration order. Schedules with period 0 are rejected.
    pub fn register(&self, schedule: Box<dyn PeriodicSchedule<T>>) {
        let name = schedule.name();
        let period_secs = schedule.period_secs();
        if period_secs == 0 {
            tracing::error!(schedule = %name, "ignoring schedule with period 0");
            return;
        }
        tracing::info!(schedule = %name, period_secs, "schedule registered");
        let mut schedules = self.lock_schedules();
        schedules.push(Arc::new(Mutex::new(schedule)));
        schedules.sort_by_key(|s| lock_schedule(s).period_secs());
    }

    /// Fire the schedules ready at `tick` and queue the eviction that
    /// keeps cache retention bounded by the longest period.
    pub fn dispatch(&self, tick: u64) {
        let schedules = self.lock_schedules();
        let snapshot: Vec<(String, u32, i64)> = schedules
            .iter()
            .map(|s| {
                let guard = lock_schedule(s);
                (guard.name(), guard.period_secs(), guard.last_seen_timestamp())
            })
            .collect();
        let ready = snapshot
            .iter()
            .filter(|(_, period, _)| is_in_schedule(tick, *period))
            .count();
        if ready == 0 {
            return;
        }

        // longest period governs eviction; on ties the last registered wins
        let mut longest_idx = 0;
        for (idx, (_, period, _)) in snapshot.iter().enumerate() {
            if *period >= snapshot[longest_idx].1 {
                longest_idx = idx;
            }
        }
        let cache_has_data = !self.cache.is_empty();
        let evict_tick = cache_has_data && is_in_schedule(tick, snapshot[longest_idx].1);
        let first_tick_after_eviction = {
            let mut last_evict = self.lock_last_evict();
            if evict_tick {
                *last_evict = tick as i64;
            }
            *last_evict + 1 == tick as i64
        };
        if cache_has_data {
            tracing::debug!(
                ready,
                tick,
                evict_period_secs = snapshot[longest_idx].1,
                evict = evict_tick,
                head = ?self.cache.first_timestamp().map(timestamp::display),
                "dispatching"
            );
        }

        for (idx, schedule) in schedules.iter().enumerate() {
            let (ref name, period_secs, last_seen) = snapshot[idx];
            if !is_in_schedule(tick, period_secs) {
                continue;
            }
            let is_evicting_schedule = idx == longest_idx;
            let start_ts = if is_evicting_schedule || last_seen == 0 || first_tick_after_eviction {
                self.cache.first_timestamp()
            } else {
                self.cache.first_timestamp_since(last_seen)
            };
            let (end_ts, events) = match start_ts {
                Some(start) => {
                    let end = start + i64::from(period_secs - 1) * 1000;
                    (Some(end), self.cache.fetch(start, end))
                }
                None => (None, Vec::new()),
            };
            tracing::debug!(
                schedule = %name,
                tick,
                events = events.len(),
                start = ?start_ts.map(timestamp::display),
                end = ?end_ts.map(timestamp::display),
                "firing schedule"
            );

            let schedule = Arc::clone(schedule);
            let cache = Arc::clone(&self.cache);
            let clock = self.clock.clone();
            let task_name = name.clone();
            let evict_after = is_evicting_schedule && evict_tick;
            let submitted = self.worker.submit(move || {
                let now = clock.epoch_millis();
                let period_start = start_ts.unwrap_or(now);
                let period_end = end_ts.unwrap_or(now);
                let observed = events.len();
                let mut guard = lock_schedule(&schedule);
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    guard.execute(period_start, period_end, &events);
                }));
                drop(guard);
                if outcome.is_err() {
                    tracing::error!(schedule = %task_name, "schedule execution panicked");
                }
                // eviction still happens after a failed execution
                if evict_after {
                    cache.evict(observed);
                }
            });
            if let Err(e) = submitted {
                tracing::warn!(schedule = %name, error = %e, "could not submit schedule execution");
            }
        }
    }

    fn lock_schedules(&self) -> MutexGuard<'_, Vec<SharedSchedule<T>>> {
        self.schedules.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_last_evict(&self) -> MutexGuard<'_, i64> {
        self.last_evict_tick.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn lock_schedule<T>(schedule: &SharedSchedule<T>) -> MutexGuard<'_, Box<dyn PeriodicSchedule<T>>>
where
    T: Timestamped,
{
    schedule.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
