//! The session manager.

use std::sync::Arc;
use std::time::Duration;

use cdp_bridge::{BridgeError, PageDriver, SharedBrowser, WarmupReport};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use run_executor::RunExecutor;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use webpilot_core_types::{SessionId, SharedBrowserMode, TabKey};

use crate::collaborators::{HistoryStore, Planner, PlannerPrompt};
use crate::config::Config;
use crate::session::model::{InstructionOutcome, SessionSnapshot, SessionState, SessionStatus};

/// Budget for a cooperative cancel to reach a terminal state.
const CANCEL_JOIN_BUDGET: Duration = Duration::from_secs(10);

struct SessionHandle {
    state: RwLock<SessionState>,
    cancel: CancellationToken,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

/// Owns every session and the per-tab mutexes that serialize sessions
/// sharing a browser tab.
pub struct SessionManager {
    driver: Arc<dyn PageDriver>,
    browser: Option<Arc<SharedBrowser>>,
    planner: Arc<dyn Planner>,
    history: Arc<dyn HistoryStore>,
    config: Arc<Config>,
    sessions: DashMap<String, Arc<SessionHandle>>,
    tab_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl SessionManager {
    pub fn new(
        driver: Arc<dyn PageDriver>,
        browser: Option<Arc<SharedBrowser>>,
        planner: Arc<dyn Planner>,
        history: Arc<dyn HistoryStore>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            driver,
            browser,
            planner,
            history,
            config,
            sessions: DashMap::new(),
            tab_locks: DashMap::new(),
        }
    }

    /// Register and start a session. Returns immediately once the session
    /// task is spawned; a missing shared browser fails the session before
    /// the task starts and surfaces the connector error to the caller.
    pub async fn start_session(
        &self,
        command: String,
        model: Option<String>,
        max_steps: Option<u32>,
        conversation_context: Vec<String>,
    ) -> Result<SessionId, BridgeError> {
        let model_name = model.unwrap_or_else(|| self.config.default_model.clone());
        let max_steps = max_steps.unwrap_or(self.config.max_steps);

        let state = SessionState::new(command, model_name, max_steps);
        let session_id = state.session_id.clone();
        let handle = Arc::new(SessionHandle {
            state: RwLock::new(state),
            cancel: CancellationToken::new(),
            task: parking_lot::Mutex::new(None),
        });
        self.sessions.insert(session_id.0.clone(), handle.clone());

        if let Some(browser) = &self.browser {
            if let Err(err) = browser.connect().await {
                warn!(target: "webpilot", session_id = %session_id, %err, "shared browser unavailable at session start");
                {
                    let mut state = handle.state.write();
                    state.set_status(SessionStatus::Failed);
                    state.error = Some(err.to_string());
                }
                self.record_history(&handle).await;
                return Err(err);
            }
            let mut state = handle.state.write();
            state.shared_browser_mode = SharedBrowserMode::Remote;
        }

        let task = tokio::spawn(Self::run_session(
            handle.clone(),
            self.driver.clone(),
            self.planner.clone(),
            self.history.clone(),
            self.config.clone(),
            self.tab_lock(&TabKey::shared_default()),
            conversation_context,
        ));
        *handle.task.lock() = Some(task);

        info!(target: "webpilot", session_id = %session_id, "session started");
        Ok(session_id)
    }

    pub fn get_status(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.sessions
            .get(session_id)
            .map(|handle| handle.state.read().snapshot())
    }

    /// Cooperative cancel. Waits up to 10 s for the session task to unwind.
    pub async fn cancel_session(&self, session_id: &str) -> bool {
        let handle = match self.sessions.get(session_id) {
            Some(entry) => entry.clone(),
            None => return false,
        };
        handle.cancel.cancel();

        let task = handle.task.lock().take();
        if let Some(task) = task {
            if tokio::time::timeout(CANCEL_JOIN_BUDGET, task).await.is_err() {
                warn!(target: "webpilot", session_id, "session task did not unwind within cancel budget");
            }
        }

        let mut state = handle.state.write();
        if !state.status.is_terminal() {
            state.set_status(SessionStatus::Cancelled);
        }
        true
    }

    /// Append an instruction to a running session. The queue is consumed
    /// between planner rounds with append-only semantics.
    pub fn add_instruction(&self, session_id: &str, instruction: &str) -> InstructionOutcome {
        if instruction.trim().is_empty() {
            return InstructionOutcome::Invalid;
        }
        let handle = match self.sessions.get(session_id) {
            Some(entry) => entry.clone(),
            None => return InstructionOutcome::NotFound,
        };
        let mut state = handle.state.write();
        if state.status != SessionStatus::Running {
            return InstructionOutcome::NotRunning;
        }
        state
            .pending_instructions
            .push_back(instruction.trim().to_string());
        state.touch();
        InstructionOutcome::Accepted
    }

    /// Warmup delegate for external viewers.
    pub async fn ensure_shared_browser(
        &self,
        candidates: &[String],
    ) -> Result<WarmupReport, BridgeError> {
        match &self.browser {
            Some(browser) => browser.ensure(candidates).await,
            None => Err(BridgeError::Connection(
                "no shared browser connector configured".to_string(),
            )),
        }
    }

    fn tab_lock(&self, key: &TabKey) -> Arc<tokio::sync::Mutex<()>> {
        self.tab_locks
            .entry(key.0.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    async fn record_history(&self, handle: &Arc<SessionHandle>) {
        let entry = {
            let state = handle.state.read();
            json!({
                "ts": Utc::now().to_rfc3339(),
                "session_id": state.session_id.0,
                "command": state.command,
                "status": state.status,
                "error": state.error,
            })
        };
        self.history.append(entry).await;
    }

    async fn run_session(
        handle: Arc<SessionHandle>,
        driver: Arc<dyn PageDriver>,
        planner: Arc<dyn Planner>,
        history: Arc<dyn HistoryStore>,
        config: Arc<Config>,
        tab_lock: Arc<tokio::sync::Mutex<()>>,
        mut context: Vec<String>,
    ) {
        {
            let mut state = handle.state.write();
            state.set_status(SessionStatus::Running);
        }

        let executor = RunExecutor::new(
            driver,
            config.runs_root.clone(),
            config.allowed_domains.clone(),
        );

        let (command, model_name, max_steps) = {
            let state = handle.state.read();
            (
                state.command.clone(),
                state.model_name.clone(),
                state.max_steps,
            )
        };

        let mut final_status = SessionStatus::Completed;
        let mut round = 0u32;

        loop {
            if handle.cancel.is_cancelled() {
                final_status = SessionStatus::Cancelled;
                break;
            }
            if round >= max_steps {
                break;
            }
            round += 1;

            // Appended instructions extend the command context before the
            // next planner round.
            {
                let mut state = handle.state.write();
                while let Some(instruction) = state.pending_instructions.pop_front() {
                    context.push(instruction);
                }
            }

            let prompt = PlannerPrompt {
                command: command.clone(),
                model: model_name.clone(),
                context: context.clone(),
                catalog_text: executor
                    .last_catalog()
                    .map(|catalog| catalog.format_for_prompt()),
            };

            let reply = match planner.plan(&prompt).await {
                Ok(reply) => reply,
                Err(err) => {
                    let mut state = handle.state.write();
                    state.error = Some(err.to_string());
                    final_status = SessionStatus::Failed;
                    break;
                }
            };

            {
                let mut state = handle.state.write();
                state.push_step(json!({
                    "round": round,
                    "explanation": reply.explanation,
                    "timestamp": Utc::now().to_rfc3339(),
                }));
            }

            if let Some(plan) = &reply.plan {
                // Sessions sharing a tab never interleave actions; step
                // outcomes stream into the snapshot as they finalize.
                let _tab_guard = tab_lock.lock().await;
                let step_sink = handle.clone();
                let observe = move |step: u32, outcome: &run_executor::ActionOutcome| {
                    let mut state = step_sink.state.write();
                    state.push_step(json!({
                        "round": round,
                        "step": step,
                        "action": outcome.name,
                        "ok": outcome.ok,
                        "attempts": outcome.attempts,
                        "error": outcome.error,
                        "timestamp": Utc::now().to_rfc3339(),
                    }));
                };
                let summary = executor
                    .run_observed(plan, &handle.cancel, Some(&observe))
                    .await;

                {
                    let mut state = handle.state.write();
                    state.result = Some(summary.to_payload());
                }

                if summary.cancelled {
                    final_status = SessionStatus::Cancelled;
                    break;
                }
                if !summary.success {
                    let mut state = handle.state.write();
                    state.error = summary
                        .error
                        .as_ref()
                        .and_then(|error| error.get("message"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .or(Some("run failed".to_string()));
                    final_status = SessionStatus::Failed;
                    break;
                }
            }

            if reply.done {
                break;
            }
        }

        {
            let mut state = handle.state.write();
            if !state.status.is_terminal() {
                state.set_status(final_status);
            }
        }

        let entry = {
            let state = handle.state.read();
            json!({
                "ts": Utc::now().to_rfc3339(),
                "session_id": state.session_id.0,
                "command": state.command,
                "status": state.status,
                "steps": state.steps.len(),
                "error": state.error,
            })
        };
        history.append(entry).await;
        info!(
            target: "webpilot",
            session_id = %handle.state.read().session_id,
            status = ?handle.state.read().status,
            "session finished"
        );
    }
}
