//! Recipe, plan, and run-result types.
//!
//! A recipe parses into a [`Plan`] of [`Instruction`]s; executing a plan
//! yields a [`RunReport`]. Journal events live here too so the executor and
//! the journal agree on one serialized shape.

use super::context::ExecutionContext;
use super::error::StepError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ============================================================================
// Steps
// ============================================================================

/// Package manager used by an `INSTALL` step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageProvider {
    #[default]
    Apt,
    Cargo,
    Pip,
}

impl PackageProvider {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "apt" => Some(Self::Apt),
            "cargo" => Some(Self::Cargo),
            "pip" => Some(Self::Pip),
            _ => None,
        }
    }
}

impl fmt::Display for PackageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apt => write!(f, "apt"),
            Self::Cargo => write!(f, "cargo"),
            Self::Pip => write!(f, "pip"),
        }
    }
}

/// One declarative provisioning action. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// `ARG NAME[=default]`
    SetBuildArg {
        name: String,
        default: Option<String>,
    },
    /// `RUN command`
    RunShellCommand { command: String },
    /// `SET NAME=value` / `ENV NAME=value`
    SetEnvironmentVariable { name: String, value: String },
    /// `CLONE [--branch B] [--depth N] URL [DIR]`
    CloneRepository {
        url: String,
        directory: String,
        branch: Option<String>,
        depth: Option<u32>,
    },
    /// `CD path` / `WORKDIR path`
    SetWorkingDirectory { path: String },
    /// `INSTALL [--provider P] PKG...`
    InstallPackages {
        provider: PackageProvider,
        packages: Vec<String>,
    },
}

impl Step {
    /// Canonical keyword for this step.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::SetBuildArg { .. } => "ARG",
            Self::RunShellCommand { .. } => "RUN",
            Self::SetEnvironmentVariable { .. } => "SET",
            Self::CloneRepository { .. } => "CLONE",
            Self::SetWorkingDirectory { .. } => "CD",
            Self::InstallPackages { .. } => "INSTALL",
        }
    }

    /// Whether applying this step spawns an external command.
    pub fn spawns_command(&self) -> bool {
        matches!(
            self,
            Self::RunShellCommand { .. } | Self::CloneRepository { .. } | Self::InstallPackages { .. }
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetBuildArg { name, default } => match default {
                Some(d) => write!(f, "ARG {}={}", name, d),
                None => write!(f, "ARG {}", name),
            },
            Self::RunShellCommand { command } => write!(f, "RUN {}", command),
            Self::SetEnvironmentVariable { name, value } => write!(f, "SET {}={}", name, value),
            Self::CloneRepository {
                url,
                directory,
                branch,
                depth,
            } => {
                write!(f, "CLONE")?;
                if let Some(b) = branch {
                    write!(f, " --branch {}", b)?;
                }
                if let Some(d) = depth {
                    write!(f, " --depth {}", d)?;
                }
                write!(f, " {} {}", url, directory)
            }
            Self::SetWorkingDirectory { path } => write!(f, "CD {}", path),
            Self::InstallPackages { provider, packages } => {
                write!(f, "INSTALL --provider {} {}", provider, packages.join(" "))
            }
        }
    }
}

// ============================================================================
// Plan
// ============================================================================

/// A step plus the recipe line it came from (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub line: usize,
    pub step: Step,
}

/// Ordered steps parsed from one recipe. Order is execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub instructions: Vec<Instruction>,
}

impl Plan {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.instructions.iter().map(|i| &i.step)
    }

    /// One canonical line per step; the input to [`Plan::digest`].
    pub fn render(&self) -> String {
        let mut out = String::new();
        for step in self.steps() {
            out.push_str(&step.to_string());
            out.push('\n');
        }
        out
    }

    /// BLAKE3 digest of the canonical rendering, `"blake3:{hex}"`.
    pub fn digest(&self) -> String {
        crate::journal::hasher::hash_string(&self.render())
    }
}

// ============================================================================
// Run state
// ============================================================================

/// Executor lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running { step_index: usize },
    Succeeded,
    Failed { step_index: usize, exit_code: i32 },
}

impl RunState {
    /// Whether `next` is a legal successor. Steps advance one at a time.
    pub fn can_transition_to(&self, next: &RunState) -> bool {
        match (self, next) {
            (Self::NotStarted, Self::Running { step_index: 0 }) => true,
            (Self::NotStarted, Self::Succeeded) => true,
            (Self::Running { step_index: a }, Self::Running { step_index: b }) => *b == a + 1,
            (Self::Running { .. }, Self::Succeeded) => true,
            (Self::Running { step_index: a }, Self::Failed { step_index: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NOT-STARTED"),
            Self::Running { step_index } => write!(f, "RUNNING({})", step_index),
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::Failed {
                step_index,
                exit_code,
            } => write!(f, "FAILED(step {}, exit {})", step_index, exit_code),
        }
    }
}

/// The step that stopped a run.
#[derive(Debug)]
pub struct StepFailure {
    /// 0-based index into the plan.
    pub step_index: usize,
    /// Recipe line of the failing step.
    pub line: usize,
    pub step: Step,
    pub error: StepError,
}

impl StepFailure {
    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }
}

/// Terminal outcome of a run.
#[derive(Debug)]
pub enum RunOutcome {
    Succeeded,
    Failed(StepFailure),
}

/// Everything a finished run hands back.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub outcome: RunOutcome,
    pub state: RunState,
    pub context: ExecutionContext,
    /// Steps started, including the failing one.
    pub steps_run: usize,
    pub total_duration: Duration,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, RunOutcome::Succeeded)
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        match &self.outcome {
            RunOutcome::Failed(f) => Some(f),
            RunOutcome::Succeeded => None,
        }
    }

    /// Process exit status for this run: 0 or the failing step's code.
    pub fn exit_code(&self) -> i32 {
        self.failure().map_or(0, StepFailure::exit_code)
    }
}

// ============================================================================
// Journal events
// ============================================================================

/// One line of the JSONL event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: String,
        recipe_digest: String,
        steps: usize,
        rigfile_version: String,
    },
    StepStarted {
        run_id: String,
        step_index: usize,
        line: usize,
        step: String,
    },
    StepSucceeded {
        run_id: String,
        step_index: usize,
        duration_seconds: f64,
    },
    StepFailed {
        run_id: String,
        step_index: usize,
        exit_code: i32,
        error: String,
    },
    RunCompleted {
        run_id: String,
        state: RunState,
        steps_run: usize,
        total_seconds: f64,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: RunEvent,
}
