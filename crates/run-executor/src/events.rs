//! Structured per-step events, appended to `runs/{run_id}/events.jsonl`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("failed to write event log: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One line of the run's event log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StructuredEvent {
    pub ts: DateTime<Utc>,
    pub run_id: String,
    pub step: u32,
    /// Canonical action payload.
    pub action: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_selector: Option<Value>,
    pub result: Value,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dom_digest_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
}

/// Append-only writer, flushed after every event so a crashed run still
/// leaves a complete prefix on disk.
pub struct EventWriter {
    file: File,
    path: PathBuf,
}

impl EventWriter {
    pub fn create(path: &Path) -> Result<Self, EventError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, event: &StructuredEvent) -> Result<(), EventError> {
        let line = serde_json::to_string(event)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(step: u32) -> StructuredEvent {
        StructuredEvent {
            ts: Utc::now(),
            run_id: "run-test".into(),
            step,
            action: json!({"type": "refresh_catalog"}),
            resolved_selector: None,
            result: json!({"ok": true}),
            warnings: vec![],
            error: None,
            retry_count: 0,
            dom_digest_sha: None,
            screenshot_path: None,
        }
    }

    #[test]
    fn appends_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut writer = EventWriter::create(&path).unwrap();
        writer.append(&event(0)).unwrap();
        writer.append(&event(1)).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: StructuredEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.step, 0);
        let second: StructuredEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.step, 1);
    }

    #[test]
    fn steps_are_monotonic_in_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut writer = EventWriter::create(&path).unwrap();
        for step in 0..5 {
            writer.append(&event(step)).unwrap();
        }
        let body = std::fs::read_to_string(&path).unwrap();
        let steps: Vec<u32> = body
            .lines()
            .map(|line| serde_json::from_str::<StructuredEvent>(line).unwrap().step)
            .collect();
        assert_eq!(steps, vec![0, 1, 2, 3, 4]);
    }
}
