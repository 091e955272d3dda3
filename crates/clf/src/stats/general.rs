// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! General traffic statistics over a reporting period.
//!
//! [`GeneralStats`] is the model: counters rebuilt from scratch on every
//! execution. [`GeneralStatsView`] wraps it and prints a report block
//! after each period.

use crate::record::{Clf, HttpMethod};
use pulse_core::{timestamp, PeriodicSchedule, Timestamped};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;

/// Category for HTTP status values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCategory {
    /// 1xx
    InformationResponse,
    /// 2xx
    Success,
    /// 3xx
    Redirection,
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
}

impl StatusCategory {
    /// Category the status belongs to, None when out of the 1xx..5xx range
    pub fn of(status: u16) -> Option<StatusCategory> {
        match status {
            100..=199 => Some(StatusCategory::InformationResponse),
            200..=299 => Some(StatusCategory::Success),
            300..=399 => Some(StatusCategory::Redirection),
            400..=499 => Some(StatusCategory::ClientError),
            500..=599 => Some(StatusCategory::ServerError),
            _ => None,
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StatusCategory::InformationResponse => "InformationResponse",
            StatusCategory::Success => "Success",
            StatusCategory::Redirection => "Redirection",
            StatusCategory::ClientError => "ClientError",
            StatusCategory::ServerError => "ServerError",
        };
        f.write_str(text)
    }
}

/// General statistics model for one reporting period
#[derive(Debug)]
pub struct GeneralStats {
    period_secs: u32,
    start_ts: i64,
    end_ts: i64,
    count: u64,
    in_bytes: u64,
    out_bytes: u64,
    per_section: HashMap<String, u64>,
    per_method: HashMap<HttpMethod, u64>,
    per_version: HashMap<String, u64>,
    per_status_category: HashMap<StatusCategory, u64>,
}

impl GeneralStats {
    /// Default reporting period is 10 seconds
    pub const DEFAULT_PERIOD_SECS: u32 = 10;

    pub fn new(period_secs: u32) -> Self {
        Self {
            period_secs,
            start_ts: 0,
            end_ts: 0,
            count: 0,
            in_bytes: 0,
            out_bytes: 0,
            per_section: HashMap::new(),
            per_method: HashMap::new(),
            per_version: HashMap::new(),
            per_status_category: HashMap::new(),
        }
    }

    /// Rebuild the counters from one period's events
    pub fn collect(&mut self, period_start: i64, period_end: i64, events: &[Clf]) {
        self.reset();
        if events.is_empty() {
            self.start_ts = period_start;
            self.end_ts = period_end;
        }
        for log in events {
            if self.start_ts == 0 {
                self.start_ts = log.timestamp_millis();
            }
            if self.end_ts == 0 {
                self.end_ts = period_end;
            }
            if let Some(section) = log.section() {
                *self.per_section.entry(section.to_string()).or_default() += 1;
            }
            *self.per_version.entry(log.version.clone()).or_default() += 1;
            if let Some(category) = StatusCategory::of(log.status) {
                *self.per_status_category.entry(category).or_default() += 1;
            }
            *self.per_method.entry(log.method).or_default() += 1;
            if log.method.is_upload() {
                self.in_bytes += log.bytes;
            } else {
                self.out_bytes += log.bytes;
            }
            self.count += 1;
        }
    }

    /// Zero every counter
    pub fn reset(&mut self) {
        self.start_ts = 0;
        self.end_ts = 0;
        self.count = 0;
        self.in_bytes = 0;
        self.out_bytes = 0;
        self.per_section.clear();
        self.per_method.clear();
        self.per_version.clear();
        self.per_status_category.clear();
    }

    pub fn start_ts(&self) -> i64 {
        self.start_ts
    }

    pub fn end_ts(&self) -> i64 {
        self.end_ts
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Bytes received from clients (upload methods)
    pub fn in_bytes(&self) -> u64 {
        self.in_bytes
    }

    /// Bytes sent to clients
    pub fn out_bytes(&self) -> u64 {
        self.out_bytes
    }

    pub fn per_section(&self) -> &HashMap<String, u64> {
        &self.per_section
    }

    pub fn per_method(&self) -> &HashMap<HttpMethod, u64> {
        &self.per_method
    }

    pub fn per_version(&self) -> &HashMap<String, u64> {
        &self.per_version
    }

    pub fn per_status_category(&self) -> &HashMap<StatusCategory, u64> {
        &self.per_status_category
    }
}

impl Default for GeneralStats {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PERIOD_SECS)
    }
}

impl PeriodicSchedule<Clf> for GeneralStats {
    fn name(&self) -> String {
        "General HTTP Traffic Statistics".to_string()
    }

    fn period_secs(&self) -> u32 {
        self.period_secs
    }

    fn last_seen_timestamp(&self) -> i64 {
        self.end_ts
    }

    fn execute(&mut self, period_start: i64, period_end: i64, events: &[Clf]) {
        self.collect(period_start, period_end, events);
    }
}

/// Prints a [`GeneralStats`] report block after every period
pub struct GeneralStatsView<W> {
    stats: GeneralStats,
    out: W,
}

const MAX_LINES_PER_STAT: usize = 10;

impl<W: Write + Send> GeneralStatsView<W> {
    pub fn new(out: W, period_secs: u32) -> Self {
        Self {
            stats: GeneralStats::new(period_secs),
            out,
        }
    }

    pub fn stats(&self) -> &GeneralStats {
        &self.stats
    }

    fn build_report(&self) -> String {
        let stats = &self.stats;
        let name = self.name();
        let period = stats.period_secs();
        let mut report = String::new();
        report.push_str(&name);
        report.push('\n');
        report.push_str(&"=".repeat(name.len()));
        report.push('\n');
        report.push_str(&format!("Period: {period} seconds\n"));
        report.push_str(&format!("From: {}\n", timestamp::display(stats.start_ts())));
        report.push_str(&format!("To: {}\n", timestamp::display(stats.end_ts())));
        report.push_str(&format!("Count: {}\n", stats.count()));
        report.push_str(&format!(
            "Logs per second: {:.2}\n",
            stats.count() as f64 / f64::from(period)
        ));
        push_counters(&mut report, "Count per section:", stats.per_section());
        push_counters(&mut report, "Count per method:", stats.per_method());
        push_counters(&mut report, "Count per version:", stats.per_version());
        push_counters(
            &mut report,
            "Count per status category:",
            stats.per_status_category(),
        );
        let received = stats.in_bytes();
        let sent = stats.out_bytes();
        push_total(&mut report, "Total received (POST, PUT): ", received, period);
        push_total(
            &mut report,
            "Total sent (GET, HEAD, PATCH, OPTIONS, DELETE): ",
            sent,
            period,
        );
        push_total(&mut report, "Total IO: ", received + sent, period);
        report
    }
}

impl<W: Write + Send> PeriodicSchedule<Clf> for GeneralStatsView<W> {
    fn name(&self) -> String {
        self.stats.name()
    }

    fn period_secs(&self) -> u32 {
        self.stats.period_secs()
    }

    fn last_seen_timestamp(&self) -> i64 {
        self.stats.last_seen_timestamp()
    }

    fn execute(&mut self, period_start: i64, period_end: i64, events: &[Clf]) {
        self.stats.collect(period_start, period_end, events);
        let report = self.build_report();
        if let Err(e) = self.out.write_all(report.as_bytes()) {
            tracing::warn!(error = %e, "failed writing statistics report");
        }
    }
}

/// Counter block: value descending, then key text descending, ten lines max
fn push_counters<K: ToString>(report: &mut String, title: &str, counters: &HashMap<K, u64>) {
    if counters.is_empty() {
        return;
    }
    let mut entries: Vec<(String, u64)> = counters
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
    report.push_str(title);
    report.push('\n');
    for (key, value) in entries.into_iter().take(MAX_LINES_PER_STAT) {
        report.push_str(&format!(" - {key}: {value}\n"));
    }
}

fn push_total(report: &mut String, title: &str, bytes: u64, period_secs: u32) {
    report.push_str(&format!(
        "{title}{} ({}ps)\n",
        human_readable_size(bytes as f64),
        human_readable_size(bytes as f64 / f64::from(period_secs))
    ));
}

const SCALE: [char; 6] = ['B', 'K', 'M', 'G', 'T', 'P'];

fn human_readable_size(byte_count: f64) -> String {
    if byte_count < 1024.0 {
        return format!("{byte_count:.2}B");
    }
    let step = (byte_count.log2() as u32) / 10;
    let size = byte_count / (1u64 << (10 * step)) as f64;
    format!("{size:.2}{}B", SCALE[step as usize])
}

#[cfg(test)]
#[path = "general_tests.rs"]
mod tests;
