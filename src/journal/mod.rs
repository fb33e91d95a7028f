//! Run journal: append-only event log plus the last-run record.
//!
//! The journal is informational. Nothing in it changes how the next run
//! behaves; every run starts from the first step.

pub mod eventlog;
pub mod hasher;
pub mod state;

use crate::core::types::RunEvent;
use std::path::{Path, PathBuf};

/// Handle on a state directory.
#[derive(Debug, Clone)]
pub struct Journal {
    state_dir: PathBuf,
}

impl Journal {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Append an event. Write failures are logged, never fatal to a run.
    pub fn record(&self, event: RunEvent) {
        if let Err(e) = eventlog::append_event(&self.state_dir, event) {
            log::warn!("journal write failed: {}", e);
        }
    }
}
