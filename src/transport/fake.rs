//! Scripted runner for tests: records invocations, returns canned exit codes.

use super::{CommandRunner, ExecOutput, Invocation};
use crate::core::error::TransportError;
use indexmap::IndexMap;
use std::path::PathBuf;

/// A recorded call.
#[derive(Debug, Clone)]
pub struct Call {
    pub script: String,
    pub cwd: PathBuf,
    pub env: IndexMap<String, String>,
}

#[derive(Debug, Default)]
pub struct ScriptedRunner {
    failures: Vec<(String, i32)>,
    spawn_failures: Vec<String>,
    create_clone_dirs: bool,
    calls: Vec<Call>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts containing `needle` exit with `code`.
    pub fn fail_on(mut self, needle: &str, code: i32) -> Self {
        self.failures.push((needle.to_string(), code));
        self
    }

    /// Scripts containing `needle` fail to spawn.
    pub fn spawn_error_on(mut self, needle: &str) -> Self {
        self.spawn_failures.push(needle.to_string());
        self
    }

    /// Create the target directory of `git clone` scripts under the cwd.
    pub fn creating_clone_dirs(mut self) -> Self {
        self.create_clone_dirs = true;
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn scripts(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.script.as_str()).collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&mut self, invocation: &Invocation<'_>) -> Result<ExecOutput, TransportError> {
        self.calls.push(Call {
            script: invocation.script.to_string(),
            cwd: invocation.cwd.to_path_buf(),
            env: invocation.env.clone(),
        });

        if self
            .spawn_failures
            .iter()
            .any(|n| invocation.script.contains(n.as_str()))
        {
            return Err(TransportError::Spawn {
                program: "fake".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted spawn failure"),
            });
        }

        if let Some((_, code)) = self
            .failures
            .iter()
            .find(|(n, _)| invocation.script.contains(n.as_str()))
        {
            return Ok(ExecOutput {
                exit_code: *code,
                ..Default::default()
            });
        }

        if self.create_clone_dirs && invocation.script.contains("git clone") {
            if let Some(dir) = shell_words::split(invocation.script)
                .ok()
                .and_then(|words| words.last().cloned())
            {
                let _ = std::fs::create_dir_all(invocation.cwd.join(dir));
            }
        }

        Ok(ExecOutput::default())
    }
}
