// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors reading the watched file
#[derive(Debug, Error)]
pub enum TailError {
    /// The file disappeared between the watch event and the readout.
    /// Transient: the next CREATE or MODIFY event retries.
    #[error("cannot access file: {}", .0.display())]
    FileVanished(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the directory watch
#[derive(Debug, Error)]
pub enum WatchError {
    /// The watch service shut down; the tick loop stops
    #[error("watch service closed")]
    Closed,
}

/// Scheduler lifecycle errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("already running")]
    AlreadyRunning,

    #[error("not running")]
    NotRunning,

    #[error("cannot access parent folder: {}", .0.display())]
    ParentNotAccessible(PathBuf),

    #[error("could not register watch: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Worker(#[from] crate::worker::WorkerError),
}
