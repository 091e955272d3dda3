// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::SchedulerError;
use pulse_clf::{Clf, ClfLineParser, HttpMethod};
use pulse_core::Timestamped;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize};
use tempfile::TempDir;

fn clf_line(ts: i64, bytes: u64) -> String {
    Clf::builder()
        .host("127.0.0.1")
        .auth_user("admin")
        .timestamp(ts)
        .method(HttpMethod::Get)
        .resource("/resources/index.php")
        .version("2.0")
        .status(200)
        .bytes(bytes)
        .build()
        .to_string()
}

fn append(path: &Path, text: &str) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.sync_all().unwrap();
}

#[derive(Default)]
struct Probe {
    events_seen: AtomicUsize,
    bytes_seen: AtomicU64,
    last_seen: AtomicI64,
}

struct CountingSchedule {
    period_secs: u32,
    probe: Arc<Probe>,
}

impl PeriodicSchedule<Clf> for CountingSchedule {
    fn name(&self) -> String {
        "counting".to_string()
    }

    fn period_secs(&self) -> u32 {
        self.period_secs
    }

    fn last_seen_timestamp(&self) -> i64 {
        self.probe.last_seen.load(Ordering::SeqCst)
    }

    fn execute(&mut self, _period_start: i64, period_end: i64, events: &[Clf]) {
        self.probe.events_seen.fetch_add(events.len(), Ordering::SeqCst);
        let bytes: u64 = events.iter().map(|e| e.bytes).sum();
        self.probe.bytes_seen.fetch_add(bytes, Ordering::SeqCst);
        self.probe.last_seen.store(period_end, Ordering::SeqCst);
    }
}

fn scheduler_for(path: &Path) -> Scheduler<ClfLineParser> {
    Scheduler::new(FileTailer::new(path, ClfLineParser), false)
}

#[test]
fn wont_start_when_the_parent_folder_does_not_exist() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("nested");
    let file = nested.join("access.log");

    let scheduler = scheduler_for(&file);
    let err = scheduler.start().unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("cannot access parent folder: {}", nested.display())
    );
    assert!(!scheduler.is_running());
}

#[test]
fn cannot_be_started_twice() {
    let dir = TempDir::new().unwrap();
    let scheduler = scheduler_for(&dir.path().join("access.log"));

    scheduler.start().unwrap();
    assert!(matches!(
        scheduler.start(),
        Err(SchedulerError::AlreadyRunning)
    ));
    scheduler.stop().unwrap();
}

#[test]
fn cannot_be_stopped_when_not_running() {
    let dir = TempDir::new().unwrap();
    let scheduler = scheduler_for(&dir.path().join("access.log"));
    assert!(matches!(scheduler.stop(), Err(SchedulerError::NotRunning)));
}

#[test]
fn start_stop_toggles_is_running() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("access.log");
    let scheduler = scheduler_for(&file);

    assert_eq!(scheduler.watched_dir(), dir.path());
    assert!(!scheduler.is_running());
    scheduler.start().unwrap();
    assert!(scheduler.is_running());
    scheduler.stop().unwrap();
    assert!(!scheduler.is_running());
}

#[test]
fn can_be_restarted_after_a_stop() {
    let dir = TempDir::new().unwrap();
    let scheduler = scheduler_for(&dir.path().join("access.log"));

    scheduler.start().unwrap();
    scheduler.stop().unwrap();
    scheduler.start().unwrap();
    assert!(scheduler.is_running());
    scheduler.stop().unwrap();
}

#[test]
fn join_tasks_reflects_the_running_state() {
    let dir = TempDir::new().unwrap();
    let scheduler = scheduler_for(&dir.path().join("access.log"));

    assert!(!scheduler.join_tasks(0));
    scheduler.start().unwrap();
    assert!(scheduler.join_tasks(100));
    scheduler.stop().unwrap();
    assert!(!scheduler.join_tasks(0));
}

#[test]
fn finishes_gracefully_when_the_parent_folder_is_deleted() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("nested");
    std::fs::create_dir_all(&nested).unwrap();
    let scheduler = scheduler_for(&nested.join("access.log"));

    scheduler.start().unwrap();
    std::fs::remove_dir_all(&nested).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while scheduler.is_running() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(100));
    }

    assert!(!scheduler.is_running());
    assert!(!scheduler.join_tasks(0));
    // the self-stop already happened, an explicit stop is a state error
    assert!(matches!(scheduler.stop(), Err(SchedulerError::NotRunning)));
}

#[test]
fn delivers_appended_lines_to_a_one_second_schedule() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("access.log");
    let scheduler = scheduler_for(&file);
    let probe = Arc::new(Probe::default());
    scheduler.register(Box::new(CountingSchedule {
        period_secs: 1,
        probe: Arc::clone(&probe),
    }));
    scheduler.start().unwrap();

    // ten lines over two seconds, stamped with the wall clock
    let clock = pulse_core::SystemClock;
    for _ in 0..10 {
        let now = pulse_core::Clock::epoch_millis(&clock);
        append(&file, &format!("{}\n", clf_line(now, 150)));
        thread::sleep(Duration::from_millis(200));
    }

    let deadline = Instant::now() + Duration::from_secs(15);
    while probe.events_seen.load(Ordering::SeqCst) < 10 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(100));
    }
    scheduler.stop().unwrap();

    assert_eq!(probe.events_seen.load(Ordering::SeqCst), 10);
    assert!(probe.bytes_seen.load(Ordering::SeqCst) > 300);
}

#[test]
fn a_deleted_file_resets_the_pipeline() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("access.log");
    let scheduler = scheduler_for(&file);
    let probe = Arc::new(Probe::default());
    scheduler.register(Box::new(CountingSchedule {
        period_secs: 1,
        probe: Arc::clone(&probe),
    }));
    scheduler.start().unwrap();

    let clock = pulse_core::SystemClock;
    append(
        &file,
        &format!("{}\n", clf_line(pulse_core::Clock::epoch_millis(&clock), 100)),
    );
    let deadline = Instant::now() + Duration::from_secs(10);
    while probe.events_seen.load(Ordering::SeqCst) < 1 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(100));
    }
    assert_eq!(probe.events_seen.load(Ordering::SeqCst), 1);

    // delete and recreate; the pipeline starts clean and keeps delivering
    std::fs::remove_file(&file).unwrap();
    thread::sleep(Duration::from_millis(1500));
    append(
        &file,
        &format!("{}\n", clf_line(pulse_core::Clock::epoch_millis(&clock), 200)),
    );

    let deadline = Instant::now() + Duration::from_secs(10);
    while probe.events_seen.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(100));
    }
    scheduler.stop().unwrap();

    assert_eq!(probe.events_seen.load(Ordering::SeqCst), 2);
}
