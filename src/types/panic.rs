use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::errors::WipeError;

/// Independent steps of the panic wipe, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WipeStep {
    BrowserData,
    SessionStore,
    TempFiles,
}

impl WipeStep {
    pub const ALL: [WipeStep; 3] = [WipeStep::BrowserData, WipeStep::SessionStore, WipeStep::TempFiles];

    pub fn as_str(self) -> &'static str {
        match self {
            WipeStep::BrowserData => "browser_data",
            WipeStep::SessionStore => "session_store",
            WipeStep::TempFiles => "temp_files",
        }
    }
}

impl fmt::Display for WipeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one wipe step removed.
#[derive(Debug, Clone, PartialEq)]
pub struct WipeOutcome {
    pub step: WipeStep,
    pub removed: Vec<PathBuf>,
    pub failures: usize,
}

/// Aggregate result of a panic wipe. Failures are recorded, never raised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanicReport {
    pub steps: Vec<WipeOutcome>,
    pub errors: Vec<WipeError>,
}

impl PanicReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn removed_count(&self) -> usize {
        self.steps.iter().map(|s| s.removed.len()).sum()
    }
}

/// Events emitted by the panic coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum PanicEvent {
    Triggered,
    Completed(PanicReport),
}
