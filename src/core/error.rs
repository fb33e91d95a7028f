//! Error types.
//!
//! Recipe errors ([`ParseError`]) are reported before anything runs. Step
//! errors ([`StepError`]) stop a run at the failing step. Each maps to the
//! process exit status the CLI returns.

use std::io;
use std::path::PathBuf;

/// Exit status for recipe and configuration errors.
pub const EXIT_USAGE: i32 = 2;
/// Exit status when the runner cannot start the shell at all.
pub const EXIT_SPAWN: i32 = 127;

/// Malformed recipe line. `line` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: unknown instruction '{keyword}'")]
    UnknownInstruction { line: usize, keyword: String },

    #[error("line {line}: {keyword} requires {expected}")]
    MissingArgument {
        line: usize,
        keyword: &'static str,
        expected: &'static str,
    },

    #[error("line {line}: invalid variable name '{name}'")]
    InvalidVariableName { line: usize, name: String },

    #[error("line {line}: {keyword}: {message}")]
    InvalidArgument {
        line: usize,
        keyword: &'static str,
        message: String,
    },

    #[error("line {line}: line continuation at end of recipe")]
    UnterminatedContinuation { line: usize },

    #[error("line {line}: cannot derive a directory name from '{url}'")]
    CloneDirectory { line: usize, url: String },
}

/// A referenced directory or variable does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvironmentError {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("unterminated variable reference in '{0}'")]
    MalformedReference(String),

    #[error("directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// The runner could not drive a subprocess to completion.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("stdin write error: {0}")]
    Stdin(#[source] io::Error),

    #[error("wait error: {0}")]
    Wait(#[source] io::Error),
}

/// Why a step stopped the run.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("command exited with status {exit_code}")]
    Execution { exit_code: i32 },

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl StepError {
    /// Exit status to report for this failure, always in `1..=255`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Execution { exit_code } => clamp_exit_code(*exit_code),
            Self::Environment(_) => 1,
            Self::Transport(_) => EXIT_SPAWN,
        }
    }
}

/// Map a raw subprocess status onto a non-zero process exit code.
/// Signal termination (`-1`) and out-of-range codes become 1.
pub fn clamp_exit_code(code: i32) -> i32 {
    if (1..=255).contains(&code) {
        code
    } else {
        1
    }
}

/// Settings file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("expected KEY=VALUE, got '{0}'")]
    KeyValue(String),

    #[error("invalid config {}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },
}

/// State directory errors.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON serialize error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

impl JournalError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Top-level error surfaced by the CLI.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot read recipe {}: {source}", .path.display())]
    RecipeRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error("step {} (line {line}) failed: {source}", .step_index + 1)]
    StepFailed {
        /// 0-based; displayed 1-based like the CLI progress lines.
        step_index: usize,
        line: usize,
        exit_code: i32,
        #[source]
        source: StepError,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::RecipeRead { .. } | Self::Parse(_) | Self::Config(_) => EXIT_USAGE,
            Self::StepFailed { exit_code, .. } => *exit_code,
            Self::Journal(_) | Self::Environment(_) | Self::Other(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
