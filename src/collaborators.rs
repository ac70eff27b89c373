//! External collaborator seams.
//!
//! The broker treats the language model, the conversation history and the
//! visual extraction pipeline as pluggable collaborators: their interfaces
//! are fixed here, their implementations are deployment concerns. The
//! defaults let the service run (and the tests drive it) without any of
//! them configured.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("planner call failed: {0}")]
    Call(String),
}

/// Input handed to the planner each round.
#[derive(Clone, Debug)]
pub struct PlannerPrompt {
    pub command: String,
    pub model: String,
    /// Prior conversation plus appended instructions, oldest first.
    pub context: Vec<String>,
    /// Abbreviated element catalog rendered for the model, when available.
    pub catalog_text: Option<String>,
}

/// One planner round: an explanation plus an optional plan to execute.
/// `done` ends the session loop.
#[derive(Clone, Debug, Default)]
pub struct PlannerReply {
    pub explanation: String,
    pub plan: Option<Value>,
    pub done: bool,
}

/// The LLM call-out. `plan` is invoked once per session round.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, prompt: &PlannerPrompt) -> Result<PlannerReply, PlannerError>;
}

/// Default planner: commands that already are JSON plans execute directly;
/// anything else is acknowledged and the session completes. This is what
/// direct-plan callers and the test-suite use.
pub struct ScriptedPlanner;

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(&self, prompt: &PlannerPrompt) -> Result<PlannerReply, PlannerError> {
        let trimmed = prompt.command.trim();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            match serde_json::from_str::<Value>(trimmed) {
                Ok(plan) => {
                    return Ok(PlannerReply {
                        explanation: "executing caller-supplied plan".to_string(),
                        plan: Some(normalize_plan(plan)),
                        done: true,
                    })
                }
                Err(err) => {
                    return Err(PlannerError::Call(format!(
                        "command looked like a JSON plan but did not parse: {err}"
                    )))
                }
            }
        }
        Ok(PlannerReply {
            explanation: "no language model is configured; only JSON plans execute".to_string(),
            plan: None,
            done: true,
        })
    }
}

/// Bare action lists become a proper run payload.
fn normalize_plan(plan: Value) -> Value {
    match plan {
        Value::Array(actions) => serde_json::json!({ "actions": actions }),
        other => other,
    }
}

/// Conversation history persistence.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn load(&self) -> Vec<Value>;
    async fn append(&self, entry: Value);
}

/// Append-only JSONL file under the runs root.
pub struct JsonlHistoryStore {
    path: PathBuf,
}

impl JsonlHistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl HistoryStore for JsonlHistoryStore {
    async fn load(&self) -> Vec<Value> {
        let body = match tokio::fs::read_to_string(&self.path).await {
            Ok(body) => body,
            Err(_) => return Vec::new(),
        };
        body.lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    async fn append(&self, entry: Value) {
        if let Some(parent) = self.path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        let mut line = entry.to_string();
        line.push('\n');
        let result = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await;
        match result {
            Ok(mut file) => {
                use tokio::io::AsyncWriteExt;
                if let Err(err) = file.write_all(line.as_bytes()).await {
                    warn!(target: "webpilot", %err, "failed to append history entry");
                }
            }
            Err(err) => {
                warn!(target: "webpilot", %err, "failed to open history file");
            }
        }
    }
}

/// One OCR fragment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OcrSpan {
    pub text: String,
    pub bbox: [f64; 4],
    pub confidence: f32,
}

/// Readability-style article extraction result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// OCR + readability collaborator used by extraction fallbacks.
#[async_trait]
pub trait VisualExtractor: Send + Sync {
    async fn ocr_extract(&self, image: &[u8]) -> Vec<OcrSpan>;
    async fn extract_article(&self, html: &str) -> Option<Article>;
}

/// Default: no visual pipeline attached.
pub struct NoopVisualExtractor;

#[async_trait]
impl VisualExtractor for NoopVisualExtractor {
    async fn ocr_extract(&self, _image: &[u8]) -> Vec<OcrSpan> {
        Vec::new()
    }

    async fn extract_article(&self, _html: &str) -> Option<Article> {
        None
    }
}
