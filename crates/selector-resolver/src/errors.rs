//! Resolver error types.

use cdp_bridge::DriverError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ResolverError {
    /// Every applicable strategy ran and none produced a candidate.
    #[error("selector resolution failed for {selector} (tried: {})", attempted.join(", "))]
    ResolutionFailed {
        selector: String,
        attempted: Vec<String>,
        best_score: Option<f64>,
    },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl ResolverError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ResolutionFailed { .. } => "ELEMENT_NOT_FOUND",
            Self::Driver(DriverError::Timeout(_)) => "ACTION_TIMEOUT",
            Self::Driver(DriverError::TargetNotFound(_)) => "TARGET_NOT_FOUND",
            Self::Driver(_) => "EXECUTION_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ResolutionFailed { .. } => false,
            Self::Driver(err) => err.is_retryable(),
        }
    }
}
