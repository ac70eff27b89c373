//! Session state and snapshots.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use webpilot_core_types::{SessionId, SharedBrowserMode};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Reply to an instruction-append request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionOutcome {
    Accepted,
    NotFound,
    NotRunning,
    Invalid,
}

/// Mutable per-session record.
#[derive(Debug)]
pub struct SessionState {
    pub session_id: SessionId,
    pub command: String,
    pub model_name: String,
    pub max_steps: u32,
    pub status: SessionStatus,
    pub steps: Vec<Value>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pending_instructions: VecDeque<String>,
    pub shared_browser_mode: SharedBrowserMode,
    pub shared_browser_endpoint: Option<String>,
}

impl SessionState {
    pub fn new(command: String, model_name: String, max_steps: u32) -> Self {
        let now = Utc::now();
        Self {
            session_id: SessionId::new(),
            command,
            model_name,
            max_steps,
            status: SessionStatus::Pending,
            steps: Vec::new(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            pending_instructions: VecDeque::new(),
            shared_browser_mode: SharedBrowserMode::Unknown,
            shared_browser_endpoint: None,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
        self.touch();
    }

    pub fn push_step(&mut self, step: Value) {
        self.steps.push(step);
        self.touch();
    }

    /// Deep copy served over HTTP. The queue itself stays private; only its
    /// length is exposed.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            command: self.command.clone(),
            model_name: self.model_name.clone(),
            max_steps: self.max_steps,
            status: self.status,
            steps: self.steps.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            pending_instructions: self.pending_instructions.len(),
            shared_browser_mode: self.shared_browser_mode,
            shared_browser_endpoint: self.shared_browser_endpoint.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub command: String,
    pub model_name: String,
    pub max_steps: u32,
    pub status: SessionStatus,
    pub steps: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pending_instructions: usize,
    pub shared_browser_mode: SharedBrowserMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_browser_endpoint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!SessionStatus::Pending.is_terminal());
        assert!(!SessionStatus::Running.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
    }

    #[test]
    fn snapshot_hides_the_instruction_queue() {
        let mut state = SessionState::new("go".into(), "default".into(), 10);
        state.pending_instructions.push_back("also this".into());
        let snapshot = state.snapshot();
        assert_eq!(snapshot.pending_instructions, 1);
        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value.get("pending_instructions").unwrap().is_number());
    }
}
