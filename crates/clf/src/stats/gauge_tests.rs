// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::record::HttpMethod;
use std::sync::{Arc, Mutex};

/// Shared sink standing in for stdout
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// 13/11/2020:12:30:21 +0000
const BASE: i64 = 1_605_270_621_000;

/// One event per hit, each stamped on its second's boundary
fn events_per_second(counts: &[usize]) -> Vec<Clf> {
    let mut events = Vec::new();
    for (second, &count) in counts.iter().enumerate() {
        for _ in 0..count {
            events.push(
                Clf::builder()
                    .host("127.0.0.1")
                    .auth_user("admin")
                    .timestamp(BASE + second as i64 * 1000)
                    .method(HttpMethod::Get)
                    .resource("/wp-content/uploads")
                    .version("1.1")
                    .status(200)
                    .bytes(1024)
                    .build(),
            );
        }
    }
    events
}

#[test]
fn reports_each_threshold_crossing() {
    let out = SharedBuf::default();
    let mut gauge = HighTrafficGauge::new(out.clone(), 2, 7.4);
    let events = events_per_second(&[5, 10, 6, 2, 27, 4]);

    gauge.execute(
        events[0].timestamp,
        events[events.len() - 1].timestamp,
        &events,
    );

    assert_eq!(
        out.text(),
        "High Traffic Gauge (7.40 req. per sec.): High Traffic - hits = {12}, avg: 7.50, triggered: {13/11/2020:12:30:22 +0000 (1605270622000)}\n\
         High Traffic Gauge (7.40 req. per sec.): Traffic is back to normal - hits = {21}, avg: 7.00, triggered: {13/11/2020:12:30:24 +0000 (1605270624000)}\n\
         High Traffic Gauge (7.40 req. per sec.): High Traffic - hits = {30}, avg: 10.00, triggered: {13/11/2020:12:30:25 +0000 (1605270625000)}\n"
    );
}

#[test]
fn stays_quiet_below_the_threshold() {
    let out = SharedBuf::default();
    let mut gauge = HighTrafficGauge::new(out.clone(), 2, 100.0);
    let events = events_per_second(&[5, 10, 6, 2, 27, 4]);

    gauge.execute(
        events[0].timestamp,
        events[events.len() - 1].timestamp,
        &events,
    );

    assert_eq!(out.text(), "");
}

#[test]
fn crossing_state_carries_across_executions() {
    let out = SharedBuf::default();
    let mut gauge = HighTrafficGauge::new(out.clone(), 2, 7.4);

    // climbs above 7.4 and stays there; one report only
    let first = events_per_second(&[5, 10]);
    let second = events_per_second(&[20, 20]);
    gauge.execute(first[0].timestamp, first[first.len() - 1].timestamp, &first);
    gauge.execute(
        second[0].timestamp,
        second[second.len() - 1].timestamp,
        &second,
    );

    assert_eq!(out.text().matches("High Traffic -").count(), 1);
    assert!(!out.text().contains("back to normal"));
}

#[test]
fn empty_period_still_advances_last_seen() {
    let out = SharedBuf::default();
    let mut gauge = HighTrafficGauge::new(out.clone(), 2, 7.4);

    gauge.execute(BASE, BASE + 1000, &[]);

    assert_eq!(gauge.last_seen_timestamp(), BASE + 1000);
    assert_eq!(out.text(), "");
}

#[test]
fn name_carries_the_threshold() {
    let gauge = HighTrafficGauge::new(SharedBuf::default(), 2, 7.4);
    assert_eq!(gauge.name(), "High Traffic Gauge (7.40 req. per sec.)");
}
