//! Local execution transport.

use super::{CommandRunner, ExecOutput, Invocation};
use crate::core::error::TransportError;
use std::io::Write;
use std::process::{Command, Stdio};

/// Whether child output goes to the terminal or is collected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Inherit,
    Capture,
}

/// Runs scripts through a local shell. The script is piped to the shell's
/// stdin rather than passed as an argument, so length and quoting limits of
/// argv do not apply.
#[derive(Debug, Clone)]
pub struct LocalRunner {
    shell: String,
    output: OutputMode,
}

impl Default for LocalRunner {
    fn default() -> Self {
        Self::new("bash")
    }
}

impl LocalRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            output: OutputMode::Inherit,
        }
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }
}

impl CommandRunner for LocalRunner {
    fn run(&mut self, invocation: &Invocation<'_>) -> Result<ExecOutput, TransportError> {
        let (stdout, stderr) = match self.output {
            OutputMode::Inherit => (Stdio::inherit(), Stdio::inherit()),
            OutputMode::Capture => (Stdio::piped(), Stdio::piped()),
        };

        let mut child = Command::new(&self.shell)
            .current_dir(invocation.cwd)
            .env_clear()
            .envs(invocation.env)
            .stdin(Stdio::piped())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| TransportError::Spawn {
                program: self.shell.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(invocation.script.as_bytes())
                .map_err(TransportError::Stdin)?;
        }

        let output = child.wait_with_output().map_err(TransportError::Wait)?;

        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
