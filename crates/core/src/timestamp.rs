// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLF timestamp handling.
//!
//! Access logs carry datetimes shaped like `13/11/2020:12:30:21 +0000`;
//! some producers spell the month out (`05/November/2020:16:09:42 +0000`).
//! Internally every timestamp is a UTC Epoch in milliseconds, and the
//! application's resolution is one second.

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

/// Numeric-month form, also the canonical output rendering.
const FORMAT_NUMERIC: &str = "%d/%m/%Y:%H:%M:%S %z";
/// Named-month form; chrono accepts full and abbreviated names here.
const FORMAT_NAMED: &str = "%d/%B/%Y:%H:%M:%S %z";

/// Error parsing a CLF datetime
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unparseable datetime: {0}")]
pub struct TimestampError(pub String);

/// Parse a CLF datetime into a UTC Epoch in milliseconds.
///
/// Tries the numeric-month form first, then the named-month form.
pub fn parse(text: &str) -> Result<i64, TimestampError> {
    for format in [FORMAT_NUMERIC, FORMAT_NAMED] {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Ok(dt.timestamp_millis());
        }
    }
    Err(TimestampError(text.to_string()))
}

/// Render a UTC Epoch millisecond as a CLF datetime (numeric month, UTC)
pub fn format(ts: i64) -> String {
    match Utc.timestamp_millis_opt(ts).single() {
        Some(dt) => dt.format(FORMAT_NUMERIC).to_string(),
        None => ts.to_string(),
    }
}

/// Display rendering: `<formatted> (<millis>)`
pub fn display(ts: i64) -> String {
    format!("{} ({})", format(ts), ts)
}

/// Drop millisecond precision, flooring to the second boundary
pub const fn truncate_millis(ts: i64) -> i64 {
    (ts / 1000) * 1000
}

#[cfg(test)]
#[path = "timestamp_tests.rs"]
mod tests;
