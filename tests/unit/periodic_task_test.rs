//! Unit tests for PeriodicTask scheduling and cancellation.

use darkelf_shell::services::periodic_task::PeriodicTask;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn test_ticks_immediately() {
    let (tx, rx) = mpsc::channel();
    let mut task = PeriodicTask::spawn("test-immediate", Duration::from_secs(60), move || {
        let _ = tx.send(());
    })
    .unwrap();

    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok(), "First tick should not wait for the interval");
    task.stop();
}

#[test]
fn test_ticks_repeatedly() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();
    let mut task = PeriodicTask::spawn("test-repeat", Duration::from_millis(20), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while ticks.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    task.stop();
    assert!(ticks.load(Ordering::SeqCst) >= 3);
}

/// `stop()` wakes the worker out of a long interval instead of waiting it out.
#[test]
fn test_stop_interrupts_interval_wait() {
    let mut task = PeriodicTask::spawn("test-stop", Duration::from_secs(3600), || {}).unwrap();
    assert!(task.is_running());

    let started = Instant::now();
    task.stop();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!task.is_running());
}

#[test]
fn test_no_ticks_after_stop() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();
    let mut task = PeriodicTask::spawn("test-quiet", Duration::from_millis(10), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    std::thread::sleep(Duration::from_millis(50));
    task.stop();
    let after_stop = ticks.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
}

#[test]
fn test_stop_is_idempotent() {
    let mut task = PeriodicTask::spawn("test-twice", Duration::from_secs(60), || {}).unwrap();
    task.stop();
    task.stop();
    assert!(!task.is_running());
}

#[test]
fn test_drop_stops_task() {
    let (tx, rx) = mpsc::channel::<()>();
    {
        let _task = PeriodicTask::spawn("test-drop", Duration::from_secs(3600), move || {
            let _keep = &tx;
        })
        .unwrap();
    }
    // The closure (and its sender) is gone once the thread has exited.
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Err(mpsc::RecvTimeoutError::Disconnected));
}
