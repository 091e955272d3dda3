// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::AtomicBool;

#[test]
fn lifecycle_guards_double_transitions() {
    let worker = TaskWorker::new("w");
    assert!(!worker.is_running());
    assert!(matches!(worker.stop(), Err(WorkerError::NotRunning)));

    worker.start().unwrap();
    assert!(worker.is_running());
    assert!(matches!(worker.start(), Err(WorkerError::AlreadyRunning)));

    worker.stop().unwrap();
    assert!(!worker.is_running());
    assert!(matches!(worker.stop(), Err(WorkerError::NotRunning)));
}

#[test]
fn submit_requires_a_running_worker() {
    let worker = TaskWorker::new("w");
    assert!(matches!(worker.submit(|| {}), Err(WorkerError::NotRunning)));
}

#[test]
fn tasks_run_in_submission_order() {
    let worker = TaskWorker::new("w");
    worker.start().unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..20 {
        let order = Arc::clone(&order);
        worker
            .submit(move || order.lock().unwrap().push(i))
            .unwrap();
    }
    assert!(worker.join_tasks(Duration::from_secs(5)));
    worker.stop().unwrap();

    assert_eq!(*order.lock().unwrap(), (0..20).collect::<Vec<_>>());
}

#[test]
fn pending_counts_cover_queued_tasks() {
    let worker = TaskWorker::new("w");
    worker.start().unwrap();

    let release = Arc::new(AtomicBool::new(false));
    let gate = Arc::clone(&release);
    worker
        .submit(move || {
            while !gate.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(5));
            }
        })
        .unwrap();
    worker.submit(|| {}).unwrap();

    assert_eq!(worker.pending_tasks(), 2);
    // times out while the gate is closed
    assert!(worker.join_tasks(Duration::from_millis(50)));

    release.store(true, Ordering::SeqCst);
    assert!(worker.join_tasks(Duration::from_secs(5)));
    assert_eq!(worker.pending_tasks(), 0);

    worker.stop().unwrap();
    assert!(!worker.join_tasks(Duration::from_millis(10)));
    assert_eq!(worker.pending_tasks(), 0);
}

#[test]
fn a_panicking_task_does_not_kill_the_worker() {
    let worker = TaskWorker::new("w");
    worker.start().unwrap();

    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    worker.submit(|| panic!("boom")).unwrap();
    worker.submit(move || flag.store(true, Ordering::SeqCst)).unwrap();

    assert!(worker.join_tasks(Duration::from_secs(5)));
    worker.stop().unwrap();
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn stop_is_bounded_and_abandons_a_slow_task() {
    let worker = TaskWorker::new("w");
    worker.start().unwrap();

    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    worker
        .submit(move || {
            thread::sleep(Duration::from_millis(400));
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();

    let before = Instant::now();
    worker.stop().unwrap();
    assert!(before.elapsed() < Duration::from_millis(350));
    assert!(!worker.is_running());

    // the abandoned task still completes naturally
    thread::sleep(Duration::from_millis(500));
    assert!(finished.load(Ordering::SeqCst));
}
