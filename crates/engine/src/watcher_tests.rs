// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs::OpenOptions;
use std::io::Write;
use std::time::Instant;
use tempfile::TempDir;

/// Poll until an event of `kind` for `name` shows up
fn await_event(watcher: &DirWatcher, kind: FileEvent, name: &str) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        let events = watcher.poll(Duration::from_millis(200)).unwrap();
        let seen = events.iter().any(|(k, p)| {
            *k == kind && p.file_name().is_some_and(|n| n == name)
        });
        if seen {
            return true;
        }
    }
    false
}

#[test]
fn a_quiet_directory_polls_to_empty() {
    let dir = TempDir::new().unwrap();
    let watcher = DirWatcher::watch(dir.path()).unwrap();
    assert!(watcher.poll(Duration::from_millis(50)).unwrap().is_empty());
}

#[test]
fn create_write_remove_are_observed() {
    let dir = TempDir::new().unwrap();
    let watcher = DirWatcher::watch(dir.path()).unwrap();
    let path = dir.path().join("access.log");

    std::fs::write(&path, b"").unwrap();
    assert!(await_event(&watcher, FileEvent::Created, "access.log"));

    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"appended\n").unwrap();
    file.sync_all().unwrap();
    drop(file);
    assert!(await_event(&watcher, FileEvent::Modified, "access.log"));

    std::fs::remove_file(&path).unwrap();
    assert!(await_event(&watcher, FileEvent::Removed, "access.log"));
}

#[test]
fn sibling_files_are_reported_by_their_own_name() {
    let dir = TempDir::new().unwrap();
    let watcher = DirWatcher::watch(dir.path()).unwrap();

    std::fs::write(dir.path().join("other.log"), b"x").unwrap();
    assert!(await_event(&watcher, FileEvent::Created, "other.log"));
}
