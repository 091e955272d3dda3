// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contracts between the readout side and the cache.
//!
//! The pipeline never looks inside an event beyond its timestamp, and it
//! consumes line parsing through a trait so the wire format stays a
//! collaborator.

use thiserror::Error;

/// A value carrying a UTC Epoch timestamp in milliseconds
pub trait Timestamped {
    fn timestamp_millis(&self) -> i64;
}

/// Stable sort by timestamp; arrival order is preserved within a millisecond
pub fn sort_by_timestamp<T: Timestamped>(events: &mut [T]) {
    events.sort_by_key(Timestamped::timestamp_millis);
}

/// A line failed to parse and will be skipped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseLineError(pub String);

/// Turns raw log lines into events.
///
/// `Ok(Some(event))` accepts the line. `Ok(None)` is a throttle signal:
/// the tailer stops the current readout without advancing its cursor, so
/// the same line is offered again on the next call. `Err` marks the line
/// malformed; it is logged and skipped.
pub trait LineParser: Send {
    type Event: Timestamped;

    fn parse_line(&mut self, line: &str) -> Result<Option<Self::Event>, ParseLineError>;
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
