//! Panic Handler for Darkelf Shell.
//!
//! Emergency wipe of every durable browsing artifact under the data root.
//! Steps are independent: a failure is recorded in the [`PanicReport`] and
//! the remaining steps still run. Needs nothing but a [`ShellPaths`], so it
//! can run from a signal handler before any registry or controller exists.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc::UnboundedSender;

use crate::platform::ShellPaths;
use crate::types::errors::WipeError;
use crate::types::panic::{PanicEvent, PanicReport, WipeOutcome, WipeStep};

/// SQLite side files that may sit next to the sessions database.
const DB_SIDE_SUFFIXES: &[&str] = &["-wal", "-shm", "-journal"];

/// Panic coordinator bound to one data root.
pub struct PanicHandler {
    paths: ShellPaths,
    events: Option<UnboundedSender<PanicEvent>>,
}

impl PanicHandler {
    pub fn new(paths: ShellPaths) -> Self {
        Self { paths, events: None }
    }

    /// Publishes `Triggered`/`Completed` on `events` for every wipe.
    pub fn with_events(mut self, events: UnboundedSender<PanicEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Runs every wipe step and emits completion. Safe to call repeatedly and
    /// against a root that was never populated.
    pub fn trigger(&self) -> PanicReport {
        self.emit(PanicEvent::Triggered);
        let report = panic_shutdown(&self.paths);
        self.emit(PanicEvent::Completed(report.clone()));
        report
    }

    fn emit(&self, event: PanicEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

/// Standalone wipe entry point.
pub fn panic_shutdown(paths: &ShellPaths) -> PanicReport {
    tracing::warn!(root = %paths.root().display(), "PANIC SHUTDOWN INITIATED");

    let mut report = PanicReport::default();
    for step in WipeStep::ALL {
        let (outcome, errors) = run_step(step, &wipe_targets(paths, step));
        report.steps.push(outcome);
        report.errors.extend(errors);
    }

    if report.is_clean() {
        tracing::warn!(removed = report.removed_count(), "Panic shutdown complete - sensitive data cleared");
    } else {
        tracing::error!(
            removed = report.removed_count(),
            failures = report.errors.len(),
            "Panic shutdown finished with failures"
        );
    }
    report
}

/// Paths removed by one step.
pub fn wipe_targets(paths: &ShellPaths, step: WipeStep) -> Vec<PathBuf> {
    match step {
        WipeStep::BrowserData => vec![paths.cache_dir(), paths.data_dir()],
        WipeStep::SessionStore => {
            let db = paths.sessions_db();
            let mut targets = vec![db.clone()];
            for suffix in DB_SIDE_SUFFIXES {
                let mut side = db.clone().into_os_string();
                side.push(suffix);
                targets.push(PathBuf::from(side));
            }
            targets
        }
        WipeStep::TempFiles => vec![paths.temp_dir(), paths.tor_data_dir()],
    }
}

fn run_step(step: WipeStep, targets: &[PathBuf]) -> (WipeOutcome, Vec<WipeError>) {
    let mut outcome = WipeOutcome {
        step,
        removed: Vec::new(),
        failures: 0,
    };
    let mut errors = Vec::new();

    for path in targets {
        match remove_path(path) {
            Ok(true) => {
                tracing::info!(step = %step, path = %path.display(), "Cleared");
                outcome.removed.push(path.clone());
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(step = %step, path = %path.display(), error = %e, "Failed to clear");
                outcome.failures += 1;
                errors.push(WipeError {
                    step,
                    path: path.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
    (outcome, errors)
}

/// Removes a file or directory tree. `Ok(false)` when nothing was there.
fn remove_path(path: &Path) -> io::Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}
