//! Plan validation: structural rules per action plus run-level lints.

use thiserror::Error;
use url::Url;

use crate::actions::{Action, FrameStrategy, FrameValue};

/// Errors raised while parsing or validating plans. Each maps onto one of
/// the stable error codes surfaced to callers.
#[derive(Debug, Error, Clone)]
pub enum DslError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidIndex(String),

    #[error("unknown action '{0}'")]
    UnsupportedAction(String),

    #[error("domain not in allowlist: {0}")]
    DomainNotAllowed(String),
}

impl DslError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::InvalidIndex(_) => "INVALID_INDEX",
            Self::UnsupportedAction(_) => "UNSUPPORTED_ACTION",
            Self::DomainNotAllowed(_) => "DOMAIN_NOT_ALLOWED",
        }
    }

    /// Prefix the message with the failing plan position.
    pub fn with_step(self, index: usize) -> Self {
        match self {
            Self::Validation(message) => Self::Validation(format!("action {index}: {message}")),
            Self::InvalidIndex(message) => Self::InvalidIndex(format!("action {index}: {message}")),
            other => other,
        }
    }
}

/// Result of validating a plan: warnings only, errors abort.
#[derive(Clone, Debug, Default)]
pub struct PlanReport {
    pub warnings: Vec<String>,
}

/// Validate every action plus the run-level lints.
///
/// Structural violations are errors; the click-race lint only warns, since
/// plenty of pages are fine without an explicit wait.
pub fn validate_plan(plan: &[Action], allowed_domains: &[String]) -> Result<PlanReport, DslError> {
    let mut report = PlanReport::default();

    for (index, action) in plan.iter().enumerate() {
        validate_action(action, allowed_domains).map_err(|err| err.with_step(index))?;

        if matches!(action, Action::Click { .. }) {
            let followed_by_wait = plan
                .iter()
                .skip(index + 1)
                .take(2)
                .any(Action::is_explicit_wait);
            if !followed_by_wait {
                report.warnings.push(format!(
                    "action {index}: click is not followed by an explicit wait or assert within 2 actions; possible race"
                ));
            }
        }
    }

    Ok(report)
}

fn validate_action(action: &Action, allowed_domains: &[String]) -> Result<(), DslError> {
    if let Some(selector) = action.selector() {
        if !selector.has_discriminator() {
            return Err(DslError::Validation(format!(
                "{} selector needs at least one of css/xpath/text/role/aria_label/near_text/index/stable_id",
                action.name()
            )));
        }
    }

    match action {
        Action::Navigate { url, .. } => {
            if url.trim().is_empty() {
                return Err(DslError::Validation("navigate url is empty".into()));
            }
            check_domain(url, allowed_domains)?;
        }
        Action::Select { value_or_label, .. } => {
            if value_or_label.is_empty() {
                return Err(DslError::Validation(
                    "select requires value_or_label".into(),
                ));
            }
        }
        Action::PressKey { keys, .. } => {
            if keys.is_empty() {
                return Err(DslError::Validation(
                    "press_key requires at least one key".into(),
                ));
            }
        }
        Action::Scroll {
            to,
            direction,
            container,
        } => {
            if to.is_none() && direction.is_none() && container.is_none() {
                return Err(DslError::Validation(
                    "scroll requires one of to/direction/container".into(),
                ));
            }
        }
        Action::ScrollToText { text } => {
            if text.trim().is_empty() {
                return Err(DslError::Validation("scroll_to_text text is empty".into()));
            }
        }
        Action::EvalJs { script } => {
            if script.trim().is_empty() {
                return Err(DslError::Validation("eval_js script is empty".into()));
            }
        }
        Action::FocusIframe { target } => {
            let ok = match target.strategy {
                FrameStrategy::Index => {
                    matches!(target.value, Some(FrameValue::Number(_)) | None)
                }
                FrameStrategy::Name | FrameStrategy::Url => {
                    matches!(target.value, Some(FrameValue::Text(_)))
                }
                FrameStrategy::Element => matches!(target.value, Some(FrameValue::Selector(_))),
                FrameStrategy::Parent | FrameStrategy::Root => true,
            };
            if !ok {
                return Err(DslError::Validation(format!(
                    "focus_iframe strategy {:?} does not match its value",
                    target.strategy
                )));
            }
        }
        _ => {}
    }
    Ok(())
}

fn check_domain(raw_url: &str, allowed_domains: &[String]) -> Result<(), DslError> {
    if allowed_domains.is_empty() {
        return Ok(());
    }
    let host = Url::parse(raw_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()));
    let host = match host {
        Some(host) => host,
        // Relative and about: URLs are always allowed.
        None => return Ok(()),
    };
    if allowed_domains
        .iter()
        .any(|allowed| host.contains(&allowed.to_ascii_lowercase()))
    {
        Ok(())
    } else {
        Err(DslError::DomainNotAllowed(raw_url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use serde_json::json;

    fn plan(actions: serde_json::Value) -> Vec<Action> {
        Registry::new()
            .parse_run_request(&json!({ "actions": actions }))
            .unwrap()
            .plan
    }

    #[test]
    fn click_without_wait_warns() {
        let actions = plan(json!([
            {"type": "navigate", "url": "https://example.com"},
            {"type": "click", "selector": {"css": "#buy"}},
            {"type": "extract", "selector": {"css": "h1"}},
        ]));
        let report = validate_plan(&actions, &[]).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("possible race"));
    }

    #[test]
    fn click_followed_by_wait_is_quiet() {
        let actions = plan(json!([
            {"type": "click", "selector": {"css": "#buy"}},
            {"type": "wait", "for": {"selector": {"css": "#done"}}, "timeout_ms": 1000},
        ]));
        let report = validate_plan(&actions, &[]).unwrap();
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn click_followed_by_assert_two_later_is_quiet() {
        let actions = plan(json!([
            {"type": "click", "selector": {"css": "#buy"}},
            {"type": "screenshot"},
            {"type": "assert", "selector": {"css": "#done"}, "state": "visible"},
        ]));
        let report = validate_plan(&actions, &[]).unwrap();
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn scroll_without_any_destination_is_invalid() {
        let actions = vec![Action::Scroll {
            to: None,
            direction: None,
            container: None,
        }];
        let err = validate_plan(&actions, &[]).unwrap_err();
        assert_eq!(err.code(), "VALIDATION");
    }

    #[test]
    fn empty_selector_is_invalid() {
        let actions = vec![Action::Hover {
            selector: Default::default(),
        }];
        let err = validate_plan(&actions, &[]).unwrap_err();
        assert_eq!(err.code(), "VALIDATION");
    }

    #[test]
    fn domain_allowlist_blocks_navigation() {
        let actions = plan(json!([
            {"type": "navigate", "url": "https://evil.example.net/"},
        ]));
        let err = validate_plan(&actions, &["example.com".to_string()]).unwrap_err();
        assert_eq!(err.code(), "DOMAIN_NOT_ALLOWED");

        let actions = plan(json!([
            {"type": "navigate", "url": "https://shop.example.com/"},
        ]));
        assert!(validate_plan(&actions, &["example.com".to_string()]).is_ok());
    }
}
