//! Last-run record: load, save (atomic), path derivation.

use crate::core::error::JournalError;
use crate::core::types::{RunReport, RunState};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Summary of the most recent run, written after every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Schema version
    pub schema: String,

    pub run_id: String,

    /// Recipe path as given on the command line
    pub recipe: String,

    /// Plan digest (`blake3:...`)
    pub recipe_digest: String,

    pub started_at: String,
    pub finished_at: String,

    /// Generator version
    pub generator: String,

    pub state: RunState,

    pub steps_total: usize,
    pub steps_run: usize,

    /// Working directory when the run ended
    pub working_dir: String,

    #[serde(default)]
    pub failed_line: Option<usize>,

    #[serde(default)]
    pub failed_step: Option<String>,

    #[serde(default)]
    pub error: Option<String>,

    pub duration_seconds: f64,
}

impl RunRecord {
    /// Build a record from a finished run.
    pub fn from_report(
        report: &RunReport,
        recipe: &str,
        recipe_digest: &str,
        steps_total: usize,
        started_at: String,
    ) -> Self {
        let failure = report.failure();
        Self {
            schema: "1.0".to_string(),
            run_id: report.run_id.clone(),
            recipe: recipe.to_string(),
            recipe_digest: recipe_digest.to_string(),
            started_at,
            finished_at: super::eventlog::now_rfc3339(),
            generator: format!("rigfile {}", env!("CARGO_PKG_VERSION")),
            state: report.state,
            steps_total,
            steps_run: report.steps_run,
            working_dir: report.context.cwd().display().to_string(),
            failed_line: failure.map(|f| f.line),
            failed_step: failure.map(|f| f.step.to_string()),
            error: failure.map(|f| f.error.to_string()),
            duration_seconds: report.total_duration.as_secs_f64(),
        }
    }
}

/// Derive the record path within the state directory.
pub fn record_path(state_dir: &Path) -> PathBuf {
    state_dir.join("last-run.yaml")
}

/// Load the last-run record. Returns None if there is none yet.
pub fn load_record(state_dir: &Path) -> Result<Option<RunRecord>, JournalError> {
    let path = record_path(state_dir);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| JournalError::io(&path, e))?;
    let record = serde_yaml_ng::from_str(&content).map_err(|source| JournalError::Yaml {
        path: path.clone(),
        source,
    })?;
    Ok(Some(record))
}

/// Save the record atomically (write to temp, then rename).
pub fn save_record(state_dir: &Path, record: &RunRecord) -> Result<(), JournalError> {
    std::fs::create_dir_all(state_dir).map_err(|e| JournalError::io(state_dir, e))?;

    let path = record_path(state_dir);
    let yaml = serde_yaml_ng::to_string(record).map_err(|source| JournalError::Yaml {
        path: path.clone(),
        source,
    })?;

    let tmp_path = path.with_extension("yaml.tmp");
    std::fs::write(&tmp_path, &yaml).map_err(|e| JournalError::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, &path).map_err(|e| JournalError::io(&path, e))?;
    Ok(())
}
