//! Error types for the shared browser connector.

use thiserror::Error;

/// Errors raised while locating or holding the shared browser connection.
#[derive(Debug, Error, Clone)]
pub enum BridgeError {
    /// No CDP candidate answered within the probe budget. Terminal for the
    /// session that asked for the browser.
    #[error("shared browser unavailable: {hint}")]
    SharedBrowserUnavailable {
        attempted: Vec<String>,
        hint: String,
    },

    /// The websocket connection could not be established or dropped.
    #[error("CDP connection error: {0}")]
    Connection(String),

    /// Chromium exposed no usable page target.
    #[error("no page target available: {0}")]
    NoPage(String),
}

impl BridgeError {
    /// Build the unavailable error with the operator-facing hint. The hint is
    /// written for the deployment this broker ships in, where the browser
    /// lives behind a VNC sidecar.
    pub fn unavailable(attempted: Vec<String>) -> Self {
        let listed = if attempted.is_empty() {
            "http://vnc:9222 (デフォルト)".to_string()
        } else {
            attempted.join("、")
        };
        let hint = format!(
            "ライブビューのブラウザに接続できないため実行できません。\
             試行した CDP エンドポイント: {listed}。\
             VNC サービスが起動し /json/version にアクセスできるか確認してください。\
             接続先を変更する場合は BROWSER_USE_CDP_URL / VNC_CDP_URL / CDP_URL を設定してください。"
        );
        Self::SharedBrowserUnavailable { attempted, hint }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::SharedBrowserUnavailable { .. } => "SHARED_BROWSER_UNAVAILABLE",
            Self::Connection(_) => "EXECUTION_ERROR",
            Self::NoPage(_) => "EXECUTION_ERROR",
        }
    }
}

/// Errors surfaced by [`crate::PageDriver`] operations. Higher layers map
/// these onto the stable action error codes.
#[derive(Debug, Error, Clone)]
pub enum DriverError {
    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("target not found: {0}")]
    TargetNotFound(String),

    /// The page navigated away while the call was in flight.
    #[error("page is navigating: {0}")]
    NavigationRace(String),

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("CDP I/O error: {0}")]
    Io(String),
}

impl DriverError {
    /// Transient errors the executor is allowed to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DriverError::Timeout(_) | DriverError::NavigationRace(_) | DriverError::Io(_)
        )
    }
}
