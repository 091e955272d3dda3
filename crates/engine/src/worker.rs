// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-thread task queue.
//!
//! Lifecycle: instantiate, start, submit.., stop. One worker runs its
//! tasks strictly in submission order, which is what serialises schedule
//! execution against cache eviction.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Time allowed for the thread to finish on stop before it is abandoned
/// to complete naturally
const STOP_JOIN_TIMEOUT: Duration = Duration::from_millis(200);

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Worker lifecycle errors
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("already running")]
    AlreadyRunning,

    #[error("not running")]
    NotRunning,

    #[error("could not spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Named single-thread task queue
pub struct TaskWorker {
    name: String,
    pending: Arc<AtomicUsize>,
    handle: Mutex<Option<Handle>>,
}

struct Handle {
    tx: Sender<Task>,
    thread: JoinHandle<()>,
}

impl TaskWorker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pending: Arc::new(AtomicUsize::new(0)),
            handle: Mutex::new(None),
        }
    }

    pub fn start(&self) -> Result<(), WorkerError> {
        let mut handle = self.lock_handle();
        if handle.is_some() {
            return Err(WorkerError::AlreadyRunning);
        }
        let (tx, rx) = mpsc::channel::<Task>();
        let thread = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                while let Ok(task) = rx.recv() {
                    task();
                }
            })?;
        *handle = Some(Handle { tx, thread });
        tracing::info!(worker = %self.name, "started");
        Ok(())
    }

    /// Queue a task. Panicking tasks are caught and logged so the worker
    /// survives them.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) -> Result<(), WorkerError> {
        let handle = self.lock_handle();
        let Some(handle) = handle.as_ref() else {
            return Err(WorkerError::NotRunning);
        };
        self.pending.fetch_add(1, Ordering::SeqCst);
        let pending = Arc::clone(&self.pending);
        let name = self.name.clone();
        let wrapped: Task = Box::new(move || {
            let outcome = catch_unwind(AssertUnwindSafe(task));
            pending.fetch_sub(1, Ordering::SeqCst);
            if outcome.is_err() {
                tracing::error!(worker = %name, "task panicked");
            }
        });
        if handle.tx.send(wrapped).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(WorkerError::NotRunning);
        }
        Ok(())
    }

    /// Close the queue and wait briefly for the thread. Queued tasks still
    /// run to completion even if the join times out.
    pub fn stop(&self) -> Result<(), WorkerError> {
        let Some(Handle { tx, thread }) = self.lock_handle().take() else {
            return Err(WorkerError::NotRunning);
        };
        drop(tx); // the thread drains its queue and exits
        let deadline = Instant::now() + STOP_JOIN_TIMEOUT;
        while !thread.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if thread.is_finished() {
            let _ = thread.join();
            tracing::info!(worker = %self.name, "stopped");
        } else {
            tracing::warn!(worker = %self.name, "stop timed out, worker left to finish");
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.lock_handle().is_some()
    }

    /// Number of submitted tasks not yet finished, 0 when not running
    pub fn pending_tasks(&self) -> usize {
        if self.is_running() {
            self.pending.load(Ordering::SeqCst)
        } else {
            0
        }
    }

    /// Wait for pending tasks to drain.
    ///
    /// Returns false when the worker is not running; true on timeout, or
    /// once the queue drains while still running. A zero timeout waits
    /// as long as tasks keep the queue busy.
    pub fn join_tasks(&self, timeout: Duration) -> bool {
        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
        let nap = if timeout.is_zero() {
            Duration::from_millis(100)
        } else {
            (timeout / 4).max(Duration::from_millis(1))
        };
        while self.is_running() && self.pending.load(Ordering::SeqCst) > 0 {
            if deadline.is_some_and(|d| Instant::now() > d) {
                return true;
            }
            thread::sleep(nap);
        }
        self.is_running()
    }

    fn lock_handle(&self) -> MutexGuard<'_, Option<Handle>> {
        self.handle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
