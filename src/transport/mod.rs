//! Command execution transport.
//!
//! The executor never spawns processes itself; it hands an [`Invocation`] to
//! a [`CommandRunner`]. Production uses [`local::LocalRunner`]; tests swap in
//! a scripted fake.

#[cfg(test)]
pub mod fake;
pub mod local;

use crate::core::error::TransportError;
use indexmap::IndexMap;
use std::path::Path;

/// Output from executing a script.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub exit_code: i32,
    /// Empty unless the runner captures output.
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// What to run and where.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub script: &'a str,
    pub cwd: &'a Path,
    /// Complete environment for the child; nothing else leaks in.
    pub env: &'a IndexMap<String, String>,
}

/// Capability to run a shell script synchronously.
pub trait CommandRunner {
    /// Block until the script exits. Only the exit status is interpreted.
    fn run(&mut self, invocation: &Invocation<'_>) -> Result<ExecOutput, TransportError>;
}
