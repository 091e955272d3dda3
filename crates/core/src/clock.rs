// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! The tick loop needs a monotonic reading for elapsed-time arithmetic,
//! and the dispatcher needs a wall-clock stamp when a schedule fires over
//! an empty cache. Both come through the same trait so tests can drive
//! them together.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic reading, for measuring elapsed time
    fn now(&self) -> Instant;

    /// Wall-clock UTC Epoch in milliseconds
    fn epoch_millis(&self) -> i64;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }
}

struct FakeReadings {
    now: Instant,
    epoch_millis: i64,
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    readings: Arc<Mutex<FakeReadings>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            readings: Arc::new(Mutex::new(FakeReadings {
                now: Instant::now(),
                epoch_millis: 0,
            })),
        }
    }

    /// Advance both readings by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut readings = self.readings.lock().unwrap_or_else(|e| e.into_inner());
        readings.now += duration;
        readings.epoch_millis += duration.as_millis() as i64;
    }

    /// Pin the wall-clock reading to a specific Epoch millisecond
    pub fn set_epoch_millis(&self, epoch_millis: i64) {
        let mut readings = self.readings.lock().unwrap_or_else(|e| e.into_inner());
        readings.epoch_millis = epoch_millis;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.readings.lock().unwrap_or_else(|e| e.into_inner()).now
    }

    fn epoch_millis(&self) -> i64 {
        self.readings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .epoch_millis
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
