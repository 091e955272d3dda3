// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parent-directory watch.
//!
//! The OS watch service pushes events from a background thread; they are
//! bridged onto a channel so the tick loop can poll with a bounded
//! timeout and keep its one-second cadence when nothing changes.

use crate::error::WatchError;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

/// File event kinds the tick loop reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEvent {
    Created,
    Removed,
    Modified,
}

/// Non-recursive watch over one directory, pollable with a timeout.
///
/// Dropping the watcher cancels the registration.
pub struct DirWatcher {
    // kept alive for the registration; events arrive through `rx`
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
}

impl DirWatcher {
    pub fn watch(dir: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |event| {
            let _ = tx.send(event);
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Block up to `timeout` for the first event, then drain whatever else
    /// is queued. An empty vec means the poll timed out.
    pub fn poll(&self, timeout: Duration) -> Result<Vec<(FileEvent, PathBuf)>, WatchError> {
        let mut events = Vec::new();
        match self.rx.recv_timeout(timeout) {
            Ok(event) => translate(event, &mut events),
            Err(RecvTimeoutError::Timeout) => return Ok(events),
            Err(RecvTimeoutError::Disconnected) => return Err(WatchError::Closed),
        }
        while let Ok(event) = self.rx.try_recv() {
            translate(event, &mut events);
        }
        Ok(events)
    }
}

fn translate(event: notify::Result<Event>, into: &mut Vec<(FileEvent, PathBuf)>) {
    let event = match event {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "watch error");
            return;
        }
    };
    let kind = match event.kind {
        EventKind::Create(_) => FileEvent::Created,
        EventKind::Remove(_) => FileEvent::Removed,
        EventKind::Modify(_) => FileEvent::Modified,
        other => {
            tracing::debug!(kind = ?other, "ignoring watch event kind");
            return;
        }
    };
    for path in event.paths {
        into.push((kind, path));
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
