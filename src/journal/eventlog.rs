//! Append-only JSONL event log.

use crate::core::error::JournalError;
use crate::core::types::{RunEvent, TimestampedEvent};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Current UTC time, RFC 3339 with second precision.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Generate a run ID.
pub fn generate_run_id() -> String {
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default() as u64;
    format!("r-{:012x}", nanos & 0xFFFF_FFFF_FFFF)
}

/// Derive the event log path.
pub fn event_log_path(state_dir: &Path) -> PathBuf {
    state_dir.join("events.jsonl")
}

/// Append an event to the log, creating the state directory if needed.
pub fn append_event(state_dir: &Path, event: RunEvent) -> Result<(), JournalError> {
    std::fs::create_dir_all(state_dir).map_err(|e| JournalError::io(state_dir, e))?;

    let path = event_log_path(state_dir);
    let te = TimestampedEvent {
        ts: now_rfc3339(),
        event,
    };
    let json = serde_json::to_string(&te)?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| JournalError::io(&path, e))?;

    writeln!(file, "{}", json).map_err(|e| JournalError::io(&path, e))?;
    Ok(())
}

/// Read every event in the log. A missing log reads as empty.
pub fn read_events(state_dir: &Path) -> Result<Vec<TimestampedEvent>, JournalError> {
    let path = event_log_path(state_dir);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = std::fs::File::open(&path).map_err(|e| JournalError::io(&path, e))?;
    let mut events = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| JournalError::io(&path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str(&line)?);
    }
    Ok(events)
}
