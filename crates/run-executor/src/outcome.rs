//! Step outcome and error types.

use selector_resolver::ResolvedNode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Error codes that never go through the retry loop.
const NON_RETRYABLE_CODES: [&str; 7] = [
    "VALIDATION",
    "LOCATOR",
    "TARGET_NOT_FOUND",
    "ELEMENT_NOT_FOUND",
    "DRY_RUN_FAIL",
    "PRESS_KEY_FAILED",
    "UNSUPPORTED_ACTION",
];

/// A failed (or failing) step, carrying its stable code.
#[derive(Clone, Debug)]
pub struct StepError {
    pub code: String,
    pub message: String,
    pub details: Value,
    pub retryable: bool,
}

impl StepError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let retryable = !NON_RETRYABLE_CODES.contains(&code.as_str());
        Self {
            code,
            message: message.into(),
            details: Value::Null,
            retryable,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn non_retryable(mut self) -> Self {
        self.retryable = false;
        self
    }

    pub fn to_error_value(&self) -> Value {
        let mut out = json!({
            "code": self.code,
            "message": self.message,
        });
        if !self.details.is_null() {
            out["details"] = self.details.clone();
        }
        out
    }
}

impl From<page_interactions::ActionError> for StepError {
    fn from(err: page_interactions::ActionError) -> Self {
        let mut step = StepError::new(err.code(), err.to_string());
        step.retryable = err.is_retryable();
        step
    }
}

impl From<selector_resolver::ResolverError> for StepError {
    fn from(err: selector_resolver::ResolverError) -> Self {
        let mut step = StepError::new(err.code(), err.to_string());
        step.retryable = err.is_retryable();
        step
    }
}

impl From<element_catalog::CatalogError> for StepError {
    fn from(err: element_catalog::CatalogError) -> Self {
        let retryable = matches!(&err, element_catalog::CatalogError::Driver(inner) if inner.is_retryable());
        let mut step = StepError::new(err.code(), err.to_string());
        step.retryable = retryable;
        step
    }
}

impl From<cdp_bridge::DriverError> for StepError {
    fn from(err: cdp_bridge::DriverError) -> Self {
        let code = match &err {
            cdp_bridge::DriverError::Timeout(_) => "ACTION_TIMEOUT",
            cdp_bridge::DriverError::TargetNotFound(_) => "TARGET_NOT_FOUND",
            _ => "EXECUTION_ERROR",
        };
        let mut step = StepError::new(code, err.to_string());
        step.retryable = err.is_retryable();
        step
    }
}

/// Compact resolution summary attached to outcomes and events.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvedSummary {
    pub dom_path: String,
    pub stable_id: String,
    pub score: f64,
    pub strategy: String,
}

impl From<&ResolvedNode> for ResolvedSummary {
    fn from(node: &ResolvedNode) -> Self {
        Self {
            dom_path: node.dom_path.clone(),
            stable_id: node.stable_id.clone(),
            score: node.score,
            strategy: node.strategy.clone(),
        }
    }
}

/// Result of one executed action.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub name: String,
    pub ok: bool,
    #[serde(default)]
    pub details: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_details: Map<String, Value>,
    pub attempts: u32,
}

impl ActionOutcome {
    pub fn success(name: &str, details: Map<String, Value>, attempts: u32) -> Self {
        Self {
            name: name.to_string(),
            ok: true,
            details,
            resolved: None,
            warnings: Vec::new(),
            error: None,
            error_code: None,
            error_details: Map::new(),
            attempts,
        }
    }

    pub fn failure(name: &str, error: &StepError, attempts: u32) -> Self {
        let error_details = match &error.details {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("detail".to_string(), other.clone());
                map
            }
        };
        Self {
            name: name.to_string(),
            ok: false,
            details: Map::new(),
            resolved: None,
            warnings: Vec::new(),
            error: Some(error.message.clone()),
            error_code: Some(error.code.clone()),
            error_details,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_retryable_codes_are_fixed() {
        for code in NON_RETRYABLE_CODES {
            assert!(!StepError::new(code, "x").retryable, "{code}");
        }
        assert!(StepError::new("EXECUTION_ERROR", "x").retryable);
        assert!(StepError::new("ACTION_TIMEOUT", "x").retryable);
    }

    #[test]
    fn failure_outcome_carries_code_and_details() {
        let error = StepError::new("ELEMENT_NOT_FOUND", "no #buy")
            .with_details(json!({"selector": "#buy"}));
        let outcome = ActionOutcome::failure("click", &error, 2);
        assert!(!outcome.ok);
        assert_eq!(outcome.error_code.as_deref(), Some("ELEMENT_NOT_FOUND"));
        assert_eq!(outcome.error_details["selector"], "#buy");
        assert_eq!(outcome.attempts, 2);
    }
}
