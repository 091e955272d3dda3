// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! High traffic gauge.
//!
//! Walks a period's events second by second, maintaining a cumulative
//! average of requests per second. A report line goes out when the
//! average first climbs above the threshold, and another when it drops
//! back below. The trailing second of a period is left open; it is folded
//! into the average the next time the gauge fires.

use crate::record::Clf;
use pulse_core::{timestamp, PeriodicSchedule, Timestamped};
use std::io::Write;

/// Reports threshold crossings of the average request throughput
pub struct HighTrafficGauge<W> {
    out: W,
    period_secs: u32,
    threshold_rps: f64,
    threshold_crossed: bool,
    last_seen_ts: i64,
}

impl<W: Write + Send> HighTrafficGauge<W> {
    /// Default period is 120 seconds
    pub const DEFAULT_PERIOD_SECS: u32 = 120;

    /// Default threshold is 10 requests per second
    pub const DEFAULT_THRESHOLD_RPS: f64 = 10.0;

    pub fn new(out: W, period_secs: u32, threshold_rps: f64) -> Self {
        Self {
            out,
            period_secs,
            threshold_rps,
            threshold_crossed: false,
            last_seen_ts: 0,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold_rps
    }

    pub fn set_threshold(&mut self, threshold_rps: f64) {
        self.threshold_rps = threshold_rps;
    }

    fn report(&mut self, message: &str, hits: usize, avg: f64, ts: i64) {
        let line = format!(
            "{}: {} - hits = {{{}}}, avg: {:.2}, triggered: {{{}}}\n",
            self.name(),
            message,
            hits,
            avg,
            timestamp::display(ts)
        );
        if let Err(e) = self.out.write_all(line.as_bytes()) {
            tracing::warn!(error = %e, "failed writing gauge report");
        }
    }
}

impl<W: Write + Send> PeriodicSchedule<Clf> for HighTrafficGauge<W> {
    fn name(&self) -> String {
        format!("High Traffic Gauge ({:.2} req. per sec.)", self.threshold_rps)
    }

    fn period_secs(&self) -> u32 {
        self.period_secs
    }

    fn last_seen_timestamp(&self) -> i64 {
        self.last_seen_ts
    }

    fn execute(&mut self, _period_start: i64, period_end: i64, events: &[Clf]) {
        self.last_seen_ts = period_end;
        if events.is_empty() {
            return;
        }
        let mut next_second_boundary = timestamp::truncate_millis(events[0].timestamp_millis()) + 1000;
        let mut seconds_seen = 0u32;
        let mut hits_this_second = 0usize;
        let mut total_hits = 0usize;
        for event in events {
            let second = timestamp::truncate_millis(event.timestamp_millis());
            if second >= next_second_boundary {
                total_hits += hits_this_second;
                let avg = total_hits as f64 / f64::from(seconds_seen + 1);
                if avg > self.threshold_rps && !self.threshold_crossed {
                    self.threshold_crossed = true;
                    let offending = total_hits - hits_this_second + self.threshold_rps.floor() as usize;
                    if let Some(culprit) = events.get(offending) {
                        self.report("High Traffic", offending, avg, culprit.timestamp_millis());
                    }
                }
                if avg < self.threshold_rps && self.threshold_crossed {
                    self.threshold_crossed = false;
                    if let Some(culprit) = events.get(total_hits) {
                        self.report(
                            "Traffic is back to normal",
                            total_hits,
                            avg,
                            culprit.timestamp_millis(),
                        );
                    }
                }
                seconds_seen += 1;
                hits_this_second = 0;
                next_second_boundary = second + 1000;
            }
            hits_this_second += 1;
        }
    }
}

#[cfg(test)]
#[path = "gauge_tests.rs"]
mod tests;
