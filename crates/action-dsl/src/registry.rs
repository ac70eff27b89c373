//! Central action registry: name → parser + version metadata, plus the
//! top-level run request parsing.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use webpilot_core_types::RunId;

use crate::actions::{
    Action, AssertState, ExtractAttr, FrameTarget, KeyScope, LoadState, MouseButton,
    ScreenshotMode, ScrollDirection, ScrollEdge, ScrollTarget, ScrollTo, TabStrategy, TabTarget,
    TabValue, WaitCondition,
};
use crate::selector::Selector;
use crate::validate::DslError;

/// Registry metadata for one action name.
#[derive(Clone, Debug)]
pub struct ActionSpec {
    pub name: &'static str,
    pub version: u32,
    pub deprecated: bool,
    pub description: &'static str,
}

impl ActionSpec {
    pub fn to_metadata(&self) -> Value {
        json!({
            "name": self.name,
            "version": self.version,
            "deprecated": self.deprecated,
            "description": self.description,
        })
    }
}

const ACTION_SPECS: &[ActionSpec] = &[
    ActionSpec { name: "navigate", version: 1, deprecated: false, description: "Load a URL" },
    ActionSpec { name: "click", version: 1, deprecated: false, description: "Click an element" },
    ActionSpec { name: "hover", version: 1, deprecated: false, description: "Hover an element" },
    ActionSpec { name: "type", version: 1, deprecated: false, description: "Fill text into an element" },
    ActionSpec { name: "search", version: 1, deprecated: false, description: "Fill a search box and submit" },
    ActionSpec { name: "select", version: 1, deprecated: false, description: "Choose a dropdown option" },
    ActionSpec { name: "press_key", version: 1, deprecated: false, description: "Press a key or combination" },
    ActionSpec { name: "wait", version: 1, deprecated: false, description: "Wait for a condition" },
    ActionSpec { name: "submit_form", version: 1, deprecated: false, description: "Submit the enclosing form" },
    ActionSpec { name: "scroll", version: 1, deprecated: false, description: "Scroll the page or a container" },
    ActionSpec { name: "scroll_to_text", version: 1, deprecated: false, description: "Scroll until a text is visible" },
    ActionSpec { name: "switch_tab", version: 1, deprecated: false, description: "Switch browser tab" },
    ActionSpec { name: "focus_iframe", version: 1, deprecated: false, description: "Move focus into a frame" },
    ActionSpec { name: "refresh_catalog", version: 1, deprecated: false, description: "Rebuild the element catalog" },
    ActionSpec { name: "eval_js", version: 1, deprecated: false, description: "Evaluate a script" },
    ActionSpec { name: "click_blank_area", version: 1, deprecated: false, description: "Click an empty page area" },
    ActionSpec { name: "close_popup", version: 1, deprecated: false, description: "Dismiss a popup overlay" },
    ActionSpec { name: "stop", version: 1, deprecated: false, description: "Stop the plan" },
    ActionSpec { name: "screenshot", version: 1, deprecated: false, description: "Capture a screenshot" },
    ActionSpec { name: "extract", version: 1, deprecated: false, description: "Extract text or attributes" },
    ActionSpec { name: "assert", version: 1, deprecated: false, description: "Assert an element state" },
];

/// Parsed top-level run request.
#[derive(Clone, Debug)]
pub struct RunRequest {
    pub run_id: RunId,
    pub plan: Vec<Action>,
    pub config: Map<String, Value>,
    pub metadata: Map<String, Value>,
    pub correlation_id: Option<String>,
}

/// Holds the action vocabulary and parses both wire forms.
pub struct Registry {
    specs: BTreeMap<&'static str, &'static ActionSpec>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let mut specs = BTreeMap::new();
        for spec in ACTION_SPECS {
            specs.insert(spec.name, spec);
        }
        Self { specs }
    }

    pub fn get(&self, name: &str) -> Option<&ActionSpec> {
        self.specs.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    /// Action metadata map served at the schema endpoint.
    pub fn schema(&self) -> Value {
        let mut out = Map::new();
        for (name, spec) in &self.specs {
            out.insert(name.to_string(), spec.to_metadata());
        }
        Value::Object(out)
    }

    /// Parse one action in either wire form.
    pub fn parse_action(&self, value: &Value) -> Result<Action, DslError> {
        let map = value
            .as_object()
            .ok_or_else(|| DslError::Validation(format!("action must be an object, got {value}")))?;

        let name = map
            .get("type")
            .or_else(|| map.get("action"))
            .and_then(Value::as_str)
            .ok_or_else(|| DslError::Validation("action object missing 'type'/'action' key".into()))?;

        if !self.contains(name) {
            return Err(DslError::UnsupportedAction(name.to_string()));
        }

        match name {
            "navigate" => parse_navigate(map),
            "click" => parse_click(map),
            "hover" => Ok(Action::Hover {
                selector: require_selector(map)?,
            }),
            "type" => parse_type(map),
            "search" => Ok(Action::Search {
                selector: require_selector(map)?,
                text: require_string(map, &["text", "value"], "type text")?,
            }),
            "select" => Ok(Action::Select {
                selector: require_selector(map)?,
                value_or_label: require_string(map, &["value_or_label", "value"], "option value or label")?,
            }),
            "press_key" => parse_press_key(map),
            "wait" => parse_wait(map),
            "submit_form" => Ok(Action::SubmitForm {
                selector: optional_selector(map)?,
            }),
            "scroll" => parse_scroll(map),
            "scroll_to_text" => Ok(Action::ScrollToText {
                text: require_string(map, &["text"], "scroll_to_text text")?,
            }),
            "switch_tab" => parse_switch_tab(map),
            "focus_iframe" => parse_focus_iframe(map),
            "refresh_catalog" => Ok(Action::RefreshCatalog),
            "eval_js" => Ok(Action::EvalJs {
                script: require_string(map, &["script"], "script")?,
            }),
            "click_blank_area" => Ok(Action::ClickBlankArea),
            "close_popup" => Ok(Action::ClosePopup),
            "stop" => Ok(Action::Stop {
                reason: get_string(map, &["reason"]),
                message: get_string(map, &["message"]),
            }),
            "screenshot" => parse_screenshot(map),
            "extract" => parse_extract(map),
            "assert" => parse_assert(map),
            _ => Err(DslError::UnsupportedAction(name.to_string())),
        }
    }

    /// Parse a full run request. Accepts `{actions: […]}`, `{plan: […]}` and
    /// `{plan: {actions: […]}}`; the run id is generated when absent.
    pub fn parse_run_request(&self, value: &Value) -> Result<RunRequest, DslError> {
        let map = value
            .as_object()
            .ok_or_else(|| DslError::Validation("run request must be an object".into()))?;

        let raw_actions: &Vec<Value> = if let Some(plan) = map.get("plan") {
            match plan {
                Value::Array(actions) => actions,
                Value::Object(plan_map) => plan_map
                    .get("actions")
                    .and_then(Value::as_array)
                    .ok_or_else(|| DslError::Validation("plan object missing 'actions'".into()))?,
                _ => return Err(DslError::Validation("plan must be a list or object".into())),
            }
        } else if let Some(actions) = map.get("actions").and_then(Value::as_array) {
            actions
        } else {
            return Err(DslError::Validation(
                "run request needs 'plan' or 'actions'".into(),
            ));
        };

        let mut plan = Vec::with_capacity(raw_actions.len());
        for (index, raw) in raw_actions.iter().enumerate() {
            let action = self
                .parse_action(raw)
                .map_err(|err| err.with_step(index))?;
            plan.push(action);
        }

        let run_id = map
            .get("run_id")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(|s| RunId(s.to_string()))
            .unwrap_or_else(RunId::generate);

        Ok(RunRequest {
            run_id,
            plan,
            config: map
                .get("config")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            metadata: map
                .get("metadata")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            correlation_id: get_string(map, &["correlation_id"]),
        })
    }
}

// ---------------------------------------------------------------------------
// field helpers

fn get_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(Value::String(text)) = map.get(*key) {
            return Some(text.clone());
        }
    }
    None
}

fn require_string(
    map: &Map<String, Value>,
    keys: &[&str],
    what: &str,
) -> Result<String, DslError> {
    get_string(map, keys).ok_or_else(|| DslError::Validation(format!("missing {what}")))
}

fn get_u64(map: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    for key in keys {
        if let Some(value) = map.get(*key).and_then(Value::as_u64) {
            return Some(value);
        }
    }
    None
}

fn get_bool(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn optional_selector(map: &Map<String, Value>) -> Result<Option<Selector>, DslError> {
    for key in ["selector", "target"] {
        if let Some(value) = map.get(key) {
            if value.is_null() {
                continue;
            }
            return Selector::parse_value(value).map(Some);
        }
    }
    Ok(None)
}

fn require_selector(map: &Map<String, Value>) -> Result<Selector, DslError> {
    optional_selector(map)?
        .ok_or_else(|| DslError::Validation("action requires a selector".into()))
}

fn parse_assert_state(raw: &str) -> Result<AssertState, DslError> {
    match raw {
        "attached" => Ok(AssertState::Attached),
        "detached" => Ok(AssertState::Detached),
        "visible" => Ok(AssertState::Visible),
        "hidden" => Ok(AssertState::Hidden),
        other => Err(DslError::Validation(format!(
            "state must be visible|hidden|attached|detached, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// per-action parsers

fn parse_navigate(map: &Map<String, Value>) -> Result<Action, DslError> {
    let url = require_string(map, &["url", "target"], "navigate url")?;
    if url.trim().is_empty() {
        return Err(DslError::Validation("navigate url is empty".into()));
    }

    let wait_for = if let Some(value) = map.get("wait_for") {
        Some(parse_wait_condition(value)?)
    } else {
        parse_flat_wait_condition(map, "wait_target")?
    };

    Ok(Action::Navigate { url, wait_for })
}

fn parse_click(map: &Map<String, Value>) -> Result<Action, DslError> {
    let button = match get_string(map, &["button"]).as_deref() {
        None | Some("left") => MouseButton::Left,
        Some("right") => MouseButton::Right,
        Some("middle") => MouseButton::Middle,
        Some(other) => {
            return Err(DslError::Validation(format!("unknown mouse button {other}")))
        }
    };
    let click_count = get_u64(map, &["click_count"]).unwrap_or(1);
    if click_count == 0 {
        return Err(DslError::Validation("click_count must be >= 1".into()));
    }

    Ok(Action::Click {
        selector: require_selector(map)?,
        button,
        click_count: click_count as u32,
        delay_ms: get_u64(map, &["delay_ms"]),
    })
}

fn parse_type(map: &Map<String, Value>) -> Result<Action, DslError> {
    // text is required but may be the empty string.
    let text = map
        .get("text")
        .or_else(|| map.get("value"))
        .and_then(Value::as_str)
        .ok_or_else(|| DslError::Validation("type action requires text".into()))?;

    Ok(Action::Type {
        selector: require_selector(map)?,
        text: text.to_string(),
        press_enter: get_bool(map, "press_enter"),
        clear: get_bool(map, "clear"),
    })
}

fn parse_press_key(map: &Map<String, Value>) -> Result<Action, DslError> {
    let mut keys: Vec<String> = Vec::new();
    for key_field in ["keys", "key", "hotkeys"] {
        match map.get(key_field) {
            Some(Value::Array(values)) => {
                for value in values {
                    if let Some(text) = value.as_str() {
                        keys.push(text.to_string());
                    }
                }
                break;
            }
            Some(Value::String(text)) => {
                // Legacy combinations arrive joined with '+'.
                keys.extend(text.split('+').filter(|p| !p.is_empty()).map(String::from));
                break;
            }
            _ => {}
        }
    }
    if keys.is_empty() {
        return Err(DslError::Validation(
            "press_key requires at least one key".into(),
        ));
    }

    let scope = match get_string(map, &["scope", "target_scope"]).as_deref() {
        None | Some("active_element") => KeyScope::ActiveElement,
        Some("page") => KeyScope::Page,
        Some(other) => {
            return Err(DslError::Validation(format!("unknown key scope {other}")))
        }
    };

    Ok(Action::PressKey { keys, scope })
}

fn parse_wait_condition(value: &Value) -> Result<WaitCondition, DslError> {
    let map = value
        .as_object()
        .ok_or_else(|| DslError::Validation("wait condition must be an object".into()))?;

    if let Some(selector_value) = map.get("selector").or_else(|| map.get("target")) {
        let state = match get_string(map, &["state"]) {
            Some(raw) => parse_assert_state(&raw)?,
            None => AssertState::Visible,
        };
        return Ok(WaitCondition::ForSelector {
            selector: Selector::parse_value(selector_value)?,
            state,
        });
    }
    if let Some(timeout_ms) = get_u64(map, &["timeout_ms", "ms"]) {
        return Ok(WaitCondition::ForTimeout { timeout_ms });
    }
    if let Some(state) = get_string(map, &["state"]) {
        let state = LoadState::parse(&state).ok_or_else(|| {
            DslError::Validation(format!(
                "wait state must be load|domcontentloaded|networkidle, got {state}"
            ))
        })?;
        return Ok(WaitCondition::ForState { state });
    }
    Err(DslError::Validation("unrecognized wait condition".into()))
}

/// Legacy flat form: `until` + (`target`/`state` | `value`).
fn parse_flat_wait_condition(
    map: &Map<String, Value>,
    selector_key: &str,
) -> Result<Option<WaitCondition>, DslError> {
    let until = match get_string(map, &["until"]) {
        Some(until) => until,
        None => return Ok(None),
    };

    if until == "selector" {
        let selector_value = map
            .get(selector_key)
            .ok_or_else(|| DslError::Validation("wait until=selector requires a target".into()))?;
        let state = match get_string(map, &["state"]) {
            Some(raw) => parse_assert_state(&raw)?,
            None => AssertState::Visible,
        };
        return Ok(Some(WaitCondition::ForSelector {
            selector: Selector::parse_value(selector_value)?,
            state,
        }));
    }
    if until == "timeout" {
        let timeout_ms = get_u64(map, &["value", "ms"]).unwrap_or(1000);
        return Ok(Some(WaitCondition::ForTimeout { timeout_ms }));
    }
    match LoadState::parse(&until) {
        Some(state) => Ok(Some(WaitCondition::ForState { state })),
        None => Err(DslError::Validation(format!(
            "unsupported wait condition: {until}"
        ))),
    }
}

fn parse_wait(map: &Map<String, Value>) -> Result<Action, DslError> {
    let condition = if let Some(value) = map.get("for").or_else(|| map.get("condition")) {
        Some(parse_wait_condition(value)?)
    } else {
        parse_flat_wait_condition(map, "target")?
    };

    let timeout_ms = get_u64(map, &["timeout_ms", "ms"]).unwrap_or(10_000);
    Ok(Action::Wait {
        condition,
        timeout_ms,
    })
}

fn parse_scroll_to(value: &Value) -> Result<ScrollTo, DslError> {
    match value {
        Value::Number(number) => {
            let amount = number
                .as_i64()
                .ok_or_else(|| DslError::Validation("scroll amount must be an integer".into()))?;
            Ok(ScrollTo::Amount(amount))
        }
        Value::String(text) => match text.as_str() {
            "top" => Ok(ScrollTo::Edge(ScrollEdge::Top)),
            "bottom" => Ok(ScrollTo::Edge(ScrollEdge::Bottom)),
            other => Ok(ScrollTo::Target(ScrollTarget {
                selector: Some(Selector::parse_legacy(other)?),
                ..ScrollTarget::default()
            })),
        },
        Value::Object(_) => {
            let target: ScrollTarget = serde_json::from_value(value.clone())
                .map_err(|err| DslError::Validation(format!("invalid scroll target: {err}")))?;
            Ok(ScrollTo::Target(target))
        }
        other => Err(DslError::Validation(format!(
            "invalid scroll destination: {other}"
        ))),
    }
}

fn parse_scroll(map: &Map<String, Value>) -> Result<Action, DslError> {
    let to = if let Some(value) = map.get("to") {
        Some(parse_scroll_to(value)?)
    } else if let Some(value) = map.get("amount") {
        Some(parse_scroll_to(value)?)
    } else if let Some(value) = map.get("target") {
        Some(parse_scroll_to(value)?)
    } else {
        None
    };

    let direction = match get_string(map, &["direction"]).as_deref() {
        Some("up") => Some(ScrollDirection::Up),
        Some("down") => Some(ScrollDirection::Down),
        Some(other) => {
            return Err(DslError::Validation(format!(
                "scroll direction must be up|down, got {other}"
            )))
        }
        None => None,
    };

    let container = match map.get("container") {
        Some(value) if !value.is_null() => Some(Selector::parse_value(value)?),
        _ => None,
    };

    Ok(Action::Scroll {
        to,
        direction,
        container,
    })
}

fn parse_switch_tab(map: &Map<String, Value>) -> Result<Action, DslError> {
    let value = map
        .get("target")
        .or_else(|| map.get("tab"))
        .ok_or_else(|| DslError::Validation("switch_tab requires a target".into()))?;
    let mut target: TabTarget = serde_json::from_value(value.clone())
        .map_err(|err| DslError::Validation(format!("invalid tab target: {err}")))?;
    if target.strategy == TabStrategy::Index && target.value.is_none() {
        target.value = Some(TabValue::Number(0));
    }
    Ok(Action::SwitchTab { target })
}

fn parse_focus_iframe(map: &Map<String, Value>) -> Result<Action, DslError> {
    let value = map
        .get("target")
        .or_else(|| map.get("frame"))
        .ok_or_else(|| DslError::Validation("focus_iframe requires a target".into()))?;
    let target: FrameTarget = serde_json::from_value(value.clone())
        .map_err(|err| DslError::Validation(format!("invalid frame target: {err}")))?;
    Ok(Action::FocusIframe { target })
}

fn parse_screenshot(map: &Map<String, Value>) -> Result<Action, DslError> {
    let mode = match get_string(map, &["mode"]).as_deref() {
        None | Some("viewport") => ScreenshotMode::Viewport,
        Some("full") => ScreenshotMode::Full,
        Some("element") => ScreenshotMode::Element,
        Some(other) => {
            return Err(DslError::Validation(format!(
                "screenshot mode must be viewport|full|element, got {other}"
            )))
        }
    };
    Ok(Action::Screenshot {
        mode,
        selector: optional_selector(map)?,
        file_name: get_string(map, &["file_name"]),
    })
}

fn parse_extract(map: &Map<String, Value>) -> Result<Action, DslError> {
    let attr = match get_string(map, &["attr"]).as_deref() {
        None | Some("text") => ExtractAttr::Text,
        Some("value") => ExtractAttr::Value,
        Some("href") => ExtractAttr::Href,
        Some("html") => ExtractAttr::Html,
        Some(other) => {
            return Err(DslError::Validation(format!(
                "extract attr must be text|value|href|html, got {other}"
            )))
        }
    };
    Ok(Action::Extract {
        selector: require_selector(map)?,
        attr,
    })
}

fn parse_assert(map: &Map<String, Value>) -> Result<Action, DslError> {
    let state = match get_string(map, &["state"]) {
        Some(raw) => parse_assert_state(&raw)?,
        None => AssertState::Visible,
    };
    Ok(Action::Assert {
        selector: require_selector(map)?,
        state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> Registry {
        Registry::new()
    }

    #[test]
    fn parses_new_and_legacy_click() {
        let new_form = registry()
            .parse_action(&json!({"type": "click", "selector": {"css": "#buy"}}))
            .unwrap();
        let legacy_form = registry()
            .parse_action(&json!({"action": "click", "target": "#buy"}))
            .unwrap();
        assert_eq!(new_form.name(), "click");
        assert_eq!(new_form, legacy_form);
    }

    #[test]
    fn unknown_action_is_typed() {
        let err = registry()
            .parse_action(&json!({"type": "teleport"}))
            .unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_ACTION");
    }

    #[test]
    fn press_key_legacy_combination_splits() {
        let action = registry()
            .parse_action(&json!({"action": "press_key", "key": "Control+S"}))
            .unwrap();
        match &action {
            Action::PressKey { keys, scope } => {
                assert_eq!(keys, &vec!["Control".to_string(), "S".to_string()]);
                assert_eq!(*scope, KeyScope::ActiveElement);
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert_eq!(
            action.legacy_payload(),
            json!({"action": "press_key", "key": "Control+S"})
        );
        assert_eq!(
            action.payload(),
            json!({"type": "press_key", "keys": ["Control", "S"], "scope": "active_element"})
        );
    }

    #[test]
    fn wait_legacy_flat_form() {
        let action = registry()
            .parse_action(&json!({
                "action": "wait", "until": "selector", "target": "#done",
                "state": "visible", "ms": 4000
            }))
            .unwrap();
        match &action {
            Action::Wait {
                condition: Some(WaitCondition::ForSelector { selector, state }),
                timeout_ms,
            } => {
                assert_eq!(selector.css.as_deref(), Some("#done"));
                assert_eq!(*state, AssertState::Visible);
                assert_eq!(*timeout_ms, 4000);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn run_request_accepts_all_three_shapes() {
        let reg = registry();
        let shapes = [
            json!({"actions": [{"type": "refresh_catalog"}]}),
            json!({"plan": [{"type": "refresh_catalog"}]}),
            json!({"plan": {"actions": [{"type": "refresh_catalog"}]}}),
        ];
        for shape in shapes {
            let request = reg.parse_run_request(&shape).unwrap();
            assert_eq!(request.plan.len(), 1);
            assert!(request.run_id.as_str().starts_with("run-"));
        }
    }

    #[test]
    fn run_request_keeps_caller_run_id_and_config() {
        let request = registry()
            .parse_run_request(&json!({
                "run_id": "run-fixed",
                "plan": {"actions": []},
                "config": {"max_retries": 5},
                "correlation_id": "abc123",
            }))
            .unwrap();
        assert_eq!(request.run_id.as_str(), "run-fixed");
        assert_eq!(request.config["max_retries"], 5);
        assert_eq!(request.correlation_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn parse_errors_carry_step_context() {
        let err = registry()
            .parse_run_request(&json!({"actions": [
                {"type": "refresh_catalog"},
                {"type": "navigate"},
            ]}))
            .unwrap_err();
        assert!(err.to_string().contains("action 1"), "got: {err}");
    }

    #[test]
    fn switch_tab_defaults_index_zero() {
        let action = registry()
            .parse_action(&json!({"type": "switch_tab", "target": {"strategy": "index"}}))
            .unwrap();
        match action {
            Action::SwitchTab { target } => {
                assert_eq!(target.value, Some(TabValue::Number(0)));
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn round_trip_all_action_shapes() {
        let reg = registry();
        let samples = vec![
            json!({"type": "navigate", "url": "https://example.com"}),
            json!({"type": "navigate", "url": "https://example.com",
                   "wait_for": {"state": "networkidle"}}),
            json!({"type": "click", "selector": {"css": "#buy"}}),
            json!({"type": "click", "selector": {"index": 5}, "button": "right",
                   "click_count": 2, "delay_ms": 10}),
            json!({"type": "hover", "selector": {"text": "メニュー"}}),
            json!({"type": "type", "selector": {"css": "#q"}, "text": "ノートPC",
                   "press_enter": true, "clear": true}),
            json!({"type": "search", "selector": {"css": "#q"}, "text": "箱根"}),
            json!({"type": "select", "selector": {"css": "#pref"}, "value_or_label": "神奈川"}),
            json!({"type": "press_key", "keys": ["Control", "S"]}),
            json!({"type": "wait", "timeout_ms": 500}),
            json!({"type": "wait", "for": {"selector": {"css": "#done"}, "state": "hidden"},
                   "timeout_ms": 2000}),
            json!({"type": "wait", "for": {"timeout_ms": 300}, "timeout_ms": 300}),
            json!({"type": "submit_form"}),
            json!({"type": "submit_form", "selector": {"css": "form#login"}}),
            json!({"type": "scroll", "to": 400}),
            json!({"type": "scroll", "to": "bottom"}),
            json!({"type": "scroll", "direction": "up"}),
            json!({"type": "scroll", "to": {"selector": {"css": "#footer"}}}),
            json!({"type": "scroll_to_text", "text": "利用規約"}),
            json!({"type": "switch_tab", "target": {"strategy": "latest"}}),
            json!({"type": "focus_iframe", "target": {"strategy": "name", "value": "content"}}),
            json!({"type": "refresh_catalog"}),
            json!({"type": "eval_js", "script": "1 + 1"}),
            json!({"type": "click_blank_area"}),
            json!({"type": "close_popup"}),
            json!({"type": "stop", "reason": "done", "message": "finished"}),
            json!({"type": "screenshot", "mode": "full"}),
            json!({"type": "extract", "selector": {"css": "h1"}, "attr": "text"}),
            json!({"type": "assert", "selector": {"css": "#done"}, "state": "visible"}),
        ];

        for sample in samples {
            let action = reg.parse_action(&sample).unwrap_or_else(|err| {
                panic!("failed to parse sample {sample}: {err}");
            });

            let via_payload = reg.parse_action(&action.payload()).unwrap();
            assert_eq!(via_payload, action, "payload round-trip for {sample}");

            let via_legacy = reg.parse_action(&action.legacy_payload()).unwrap();
            assert_eq!(via_legacy, action, "legacy round-trip for {sample}");
        }
    }
}
