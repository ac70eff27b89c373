//! Error types for interaction primitives.

use cdp_bridge::DriverError;
use thiserror::Error;

/// Errors raised by the safe interaction primitives.
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// Navigation timed out waiting for page load.
    #[error("navigation timeout: {0}")]
    NavTimeout(String),

    /// A wait or assertion timed out.
    #[error("wait timeout: {0}")]
    WaitTimeout(String),

    /// The target element could not be found on the page.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// The element exists but cannot be interacted with.
    #[error("element not interactable: {0}")]
    NotInteractable(String),

    /// No editable input could be located for a fill.
    #[error("no editable target: {0}")]
    NotEditable(String),

    /// A dropdown option did not match value or label.
    #[error("option not found: {0}")]
    OptionNotFound(String),

    /// Every key press path failed.
    #[error("press key failed: {0}")]
    PressKeyFailed(String),

    /// The operation was cancelled.
    #[error("interrupted: {0}")]
    Interrupted(String),

    /// CDP communication error.
    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ActionError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::WaitTimeout(_) | ActionError::NavTimeout(_) | ActionError::CdpIo(_)
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NavTimeout(_) => "NAVIGATION_TIMEOUT",
            Self::WaitTimeout(_) => "ACTION_TIMEOUT",
            Self::ElementNotFound(_) => "ELEMENT_NOT_FOUND",
            Self::NotInteractable(_) | Self::NotEditable(_) => "ELEMENT_NOT_INTERACTABLE",
            Self::OptionNotFound(_) => "ELEMENT_NOT_FOUND",
            Self::PressKeyFailed(_) => "PRESS_KEY_FAILED",
            Self::Interrupted(_) => "EXECUTION_ERROR",
            Self::CdpIo(_) => "EXECUTION_ERROR",
            Self::Internal(_) => "EXECUTION_ERROR",
        }
    }
}

impl From<DriverError> for ActionError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Timeout(message) => ActionError::WaitTimeout(message),
            DriverError::TargetNotFound(message) => ActionError::ElementNotFound(message),
            DriverError::NavigationRace(message) | DriverError::Io(message) => {
                ActionError::CdpIo(message)
            }
            DriverError::Script(message) => ActionError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification() {
        assert!(ActionError::WaitTimeout("t".into()).is_retryable());
        assert!(ActionError::CdpIo("io".into()).is_retryable());
        assert!(!ActionError::ElementNotFound("#x".into()).is_retryable());
        assert!(!ActionError::PressKeyFailed("Enter".into()).is_retryable());
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ActionError::NavTimeout("t".into()).code(), "NAVIGATION_TIMEOUT");
        assert_eq!(ActionError::NotEditable("x".into()).code(), "ELEMENT_NOT_INTERACTABLE");
        assert_eq!(ActionError::PressKeyFailed("x".into()).code(), "PRESS_KEY_FAILED");
    }
}
