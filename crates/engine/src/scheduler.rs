// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tick-driven scheduler.
//!
//! Three cooperating workers: the tick loop polls the directory watch and
//! keeps an approximate one-second cadence; the ingestion worker reads
//! and parses newly appended bytes into the cache; the dispatch worker
//! runs schedule callbacks serially. The loop is soft real time — the
//! poll timeout and a drift adjustment make it converge toward one
//! iteration per second, and ingestion that completes after a tick's
//! dispatch simply lands in the next tick's window.
//!
//! Workflow: instantiate, register schedules, start, stop (or join_tasks
//! followed by stop).

use crate::dispatcher::ScheduleDispatcher;
use crate::error::SchedulerError;
use crate::tailer::FileTailer;
use crate::watcher::{DirWatcher, FileEvent};
use crate::worker::TaskWorker;
use pulse_core::{Clock, EventCache, LineParser, PeriodicSchedule, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Initial poll-timeout adjustment in milliseconds
const INITIAL_ADJUSTMENT: i64 = 10;
/// Slice length for interruptible sleeps
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Watches a file through its parent directory and feeds parsed events to
/// periodic schedules on an approximate one-second application clock
pub struct Scheduler<P, C = SystemClock>
where
    P: LineParser + 'static,
    P::Event: Clone + Send + Sync + 'static,
    C: Clock,
{
    tailer: Arc<Mutex<FileTailer<P>>>,
    cache: Arc<EventCache<P::Event>>,
    dispatcher: Arc<ScheduleDispatcher<P::Event, C>>,
    ingest: Arc<TaskWorker>,
    data_available: Arc<AtomicBool>,
    read_from_start: bool,
    watched_dir: PathBuf,
    clock: C,
    running: Arc<AtomicBool>,
    tick_thread: Mutex<Option<JoinHandle<()>>>,
}

impl<P> Scheduler<P, SystemClock>
where
    P: LineParser + 'static,
    P::Event: Clone + Send + Sync + 'static,
{
    /// Tail mode by default: pass `read_from_start = true` to consume the
    /// file from offset 0 instead of its current end
    pub fn new(tailer: FileTailer<P>, read_from_start: bool) -> Self {
        Self::with_clock(tailer, read_from_start, SystemClock)
    }
}

impl<P, C> Scheduler<P, C>
where
    P: LineParser + 'static,
    P::Event: Clone + Send + Sync + 'static,
    C: Clock,
{
    pub fn with_clock(tailer: FileTailer<P>, read_from_start: bool, clock: C) -> Self {
        let watched_dir = tailer.parent().to_path_buf();
        let cache = Arc::new(EventCache::new());
        Self {
            tailer: Arc::new(Mutex::new(tailer)),
            dispatcher: Arc::new(ScheduleDispatcher::new(Arc::clone(&cache), clock.clone())),
            cache,
            ingest: Arc::new(TaskWorker::new("readout")),
            data_available: Arc::new(AtomicBool::new(false)),
            read_from_start,
            watched_dir,
            clock,
            running: Arc::new(AtomicBool::new(false)),
            tick_thread: Mutex::new(None),
        }
    }

    /// Path of the watched folder (parent of the watched file)
    pub fn watched_dir(&self) -> &Path {
        &self.watched_dir
    }

    /// Register a periodic schedule; allowed before and after start
    pub fn register(&self, schedule: Box<dyn PeriodicSchedule<P::Event>>) {
        self.dispatcher.register(schedule);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the pipeline: verify the parent folder, register the watch,
    /// start the workers, and spawn the tick loop
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut thread_slot = self.lock_tick_thread();
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }
        if folder_is_not_accessible(&self.watched_dir) {
            return Err(SchedulerError::ParentNotAccessible(self.watched_dir.clone()));
        }
        let watcher = DirWatcher::watch(&self.watched_dir)?;
        self.ingest.start()?;
        self.dispatcher.start()?;
        self.running.store(true, Ordering::SeqCst);

        let tick_loop = TickLoop {
            watcher,
            tailer: Arc::clone(&self.tailer),
            cache: Arc::clone(&self.cache),
            dispatcher: Arc::clone(&self.dispatcher),
            ingest: Arc::clone(&self.ingest),
            data_available: Arc::clone(&self.data_available),
            running: Arc::clone(&self.running),
            read_from_start: self.read_from_start,
            watched_dir: self.watched_dir.clone(),
            clock: self.clock.clone(),
        };
        let handle = thread::Builder::new()
            .name("scheduler".to_string())
            .spawn(move || tick_loop.run())
            .map_err(crate::worker::WorkerError::Spawn)?;
        *thread_slot = Some(handle);
        tracing::info!(dir = %self.watched_dir.display(), "started watching");
        Ok(())
    }

    /// Stop the pipeline. The tick loop exits within its current poll or
    /// sleep slice and shuts both workers down on the way out.
    pub fn stop(&self) -> Result<(), SchedulerError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(SchedulerError::NotRunning);
        }
        tracing::info!("stopping");
        if let Some(handle) = self.lock_tick_thread().take() {
            let _ = handle.join();
        }
        tracing::info!("stopped");
        Ok(())
    }

    /// Wait for in-flight ingestion and dispatch work.
    ///
    /// Returns false when the scheduler is no longer running; true on
    /// timeout, or once pending work drains while still running. A zero
    /// timeout waits as long as work keeps arriving.
    pub fn join_tasks(&self, timeout_ms: u64) -> bool {
        let deadline = (timeout_ms > 0).then(|| Instant::now() + Duration::from_millis(timeout_ms));
        let nap = if timeout_ms > 0 {
            Duration::from_millis((timeout_ms / 4).max(1))
        } else {
            Duration::from_millis(100)
        };
        while self.is_running()
            && self.ingest.pending_tasks() + self.dispatcher.pending_tasks() > 0
        {
            if deadline.is_some_and(|d| Instant::now() > d) {
                return true;
            }
            thread::sleep(nap);
        }
        self.is_running()
    }

    fn lock_tick_thread(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.tick_thread.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One of: does not exist, is not a directory, or cannot be listed
fn folder_is_not_accessible(dir: &Path) -> bool {
    !dir.is_dir() || std::fs::read_dir(dir).is_err()
}

/// State moved onto the tick thread
struct TickLoop<P, C>
where
    P: LineParser + 'static,
    P::Event: Clone + Send + Sync + 'static,
    C: Clock,
{
    watcher: DirWatcher,
    tailer: Arc<Mutex<FileTailer<P>>>,
    cache: Arc<EventCache<P::Event>>,
    dispatcher: Arc<ScheduleDispatcher<P::Event, C>>,
    ingest: Arc<TaskWorker>,
    data_available: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    read_from_start: bool,
    watched_dir: PathBuf,
    clock: C,
}

impl<P, C> TickLoop<P, C>
where
    P: LineParser + 'static,
    P::Event: Clone + Send + Sync + 'static,
    C: Clock,
{
    /// Tick loop body, repeated until stopped or the parent folder is
    /// lost:
    ///
    /// 1. poll the watch with timeout `1000 - adjustment` ms
    /// 2. route file events (readout work goes to the ingestion worker)
    /// 3. sleep out the remainder of the second, adjusting for drift
    /// 4. once data has been seen, dispatch schedules and advance the tick
    /// 5. verify the parent folder still exists
    fn run(self) {
        tracing::info!("tick loop starts");
        self.data_available.store(false, Ordering::SeqCst);
        tracing::info!(read_from_start = self.read_from_start, "readout mode");
        if !self.read_from_start {
            let mut tailer = lock_tailer(&self.tailer);
            if tailer.offset() == 0 && !tailer.move_to_end() {
                tracing::info!("schedules will start as soon as there is data available");
            }
        }

        let mut tick: u64 = 1;
        let mut adjustment: i64 = INITIAL_ADJUSTMENT;
        while self.running.load(Ordering::SeqCst) {
            let start = self.clock.now();
            let timeout = Duration::from_millis((1000 - adjustment).max(0) as u64);
            match self.watcher.poll(timeout) {
                Ok(events) => self.process_events(&events),
                Err(e) => {
                    tracing::error!(error = %e, "watch service closed, stopping");
                    break;
                }
            }

            let elapsed_ms = (self.clock.now() - start).as_millis() as i64;
            if elapsed_ms < 1000 {
                self.sleep_while_running(Duration::from_millis((999 - elapsed_ms) as u64));
                adjustment = (adjustment - 2).max(0);
            } else if elapsed_ms > 1000 {
                adjustment += elapsed_ms - 1000;
            }

            if self.data_available.load(Ordering::SeqCst) {
                self.dispatcher.dispatch(tick);
                tick += 1;
            }

            if folder_is_not_accessible(&self.watched_dir) {
                tracing::info!("parent folder is not accessible, stopping");
                break;
            }
        }
        tracing::info!("tick loop ended");
        self.finish();
    }

    fn process_events(&self, events: &[(FileEvent, PathBuf)]) {
        for (kind, path) in events {
            if !lock_tailer(&self.tailer).file_matches(path) {
                continue;
            }
            tracing::debug!(kind = ?kind, "file event");
            match kind {
                FileEvent::Created => {
                    let tailer = Arc::clone(&self.tailer);
                    let cache = Arc::clone(&self.cache);
                    let data_available = Arc::clone(&self.data_available);
                    self.submit_ingest(move || {
                        cache.full_evict();
                        let mut tailer = lock_tailer(&tailer);
                        tailer.move_to_start();
                        match tailer.fetch_available_lines() {
                            Ok(batch) => {
                                cache.add_all(batch);
                                data_available.store(!cache.is_empty(), Ordering::SeqCst);
                            }
                            Err(e) => tracing::error!(error = %e, "cannot read watched file"),
                        }
                    });
                }
                FileEvent::Removed => {
                    self.cache.full_evict();
                    lock_tailer(&self.tailer).move_to_start();
                    self.data_available.store(false, Ordering::SeqCst);
                }
                FileEvent::Modified => {
                    let tailer = Arc::clone(&self.tailer);
                    let cache = Arc::clone(&self.cache);
                    let data_available = Arc::clone(&self.data_available);
                    self.submit_ingest(move || {
                        let batch = lock_tailer(&tailer).fetch_available_lines();
                        match batch {
                            Ok(batch) => {
                                cache.add_all(batch);
                                let has_data = !cache.is_empty();
                                let _ = data_available.compare_exchange(
                                    false,
                                    has_data,
                                    Ordering::SeqCst,
                                    Ordering::SeqCst,
                                );
                            }
                            Err(e) => tracing::error!(error = %e, "cannot read watched file"),
                        }
                    });
                }
            }
        }
    }

    fn submit_ingest(&self, task: impl FnOnce() + Send + 'static) {
        if let Err(e) = self.ingest.submit(task) {
            tracing::warn!(error = %e, "could not submit readout task");
        }
    }

    /// Sleep in slices so a stop takes effect promptly
    fn sleep_while_running(&self, total: Duration) {
        let deadline = Instant::now() + total;
        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }

    /// Shut both workers down; also flips `running` when the loop exits
    /// on its own (watch closed, parent folder lost)
    fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
        if self.ingest.stop().is_err() {
            tracing::debug!("readout worker was already stopped");
        }
        if self.dispatcher.stop().is_err() {
            tracing::debug!("dispatch worker was already stopped");
        }
    }
}

fn lock_tailer<P: LineParser>(tailer: &Arc<Mutex<FileTailer<P>>>) -> MutexGuard<'_, FileTailer<P>> {
    tailer.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
