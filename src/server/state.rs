//! Shared handler state.

use std::sync::Arc;

use run_executor::RunExecutor;

use crate::config::Config;
use crate::session::SessionManager;

#[derive(Clone)]
pub struct ServeState {
    pub config: Arc<Config>,
    pub manager: Arc<SessionManager>,
    /// Executor backing the automation surface (`/execute-dsl`, `/catalog`).
    /// Sessions build their own executors; this one serves direct callers.
    pub executor: Arc<RunExecutor>,
}

impl ServeState {
    pub fn new(config: Arc<Config>, manager: Arc<SessionManager>, executor: Arc<RunExecutor>) -> Self {
        Self {
            config,
            manager,
            executor,
        }
    }
}
