//! Cancellable periodic background task.
//!
//! Runs a closure on a dedicated thread: once immediately, then after every
//! `interval`. The cancellation token is the sending half of a channel; the
//! worker's interval wait doubles as the cancellation wait, so `stop()` wakes
//! it at once and then joins the thread.

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle to a running periodic task. Dropping it stops the task.
pub struct PeriodicTask {
    name: String,
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawns a thread named `name` that calls `tick` every `interval`.
    pub fn spawn<F>(name: &str, interval: Duration, mut tick: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || loop {
                tick();
                match cancel_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        tracing::debug!(task = %name, interval_ms = interval.as_millis() as u64, "Started periodic task");
        Ok(Self {
            name: name.to_string(),
            cancel: Some(cancel_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signals cancellation and blocks until the worker thread has exited.
    ///
    /// A tick already in progress is allowed to finish. Calling `stop` more
    /// than once is a no-op.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(task = %self.name, "Periodic task panicked");
            } else {
                tracing::debug!(task = %self.name, "Stopped periodic task");
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}
