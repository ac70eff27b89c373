//! The tagged action model.
//!
//! Variants mirror the wire vocabulary one to one. Every action serializes
//! into the canonical form (`payload`, keyed by `type`) and the legacy form
//! (`legacy_payload`, keyed by `action` with the old field names); the
//! registry parses both back into the same value.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::selector::Selector;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScope {
    #[default]
    ActiveElement,
    Page,
}

impl KeyScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActiveElement => "active_element",
            Self::Page => "page",
        }
    }
}

/// Lifecycle states awaited after navigation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Load,
    Domcontentloaded,
    Networkidle,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Domcontentloaded => "domcontentloaded",
            Self::Networkidle => "networkidle",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "load" => Some(Self::Load),
            "domcontentloaded" => Some(Self::Domcontentloaded),
            "networkidle" | "network_idle" => Some(Self::Networkidle),
            _ => None,
        }
    }
}

/// Element states used by waits and assertions.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertState {
    Attached,
    Detached,
    #[default]
    Visible,
    Hidden,
}

impl AssertState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        }
    }
}

/// What a `wait` action waits for.
#[derive(Clone, Debug, PartialEq)]
pub enum WaitCondition {
    ForState {
        state: LoadState,
    },
    ForSelector {
        selector: Selector,
        state: AssertState,
    },
    ForTimeout {
        timeout_ms: u64,
    },
}

impl WaitCondition {
    pub fn to_value(&self) -> Value {
        match self {
            Self::ForState { state } => json!({ "state": state.as_str() }),
            Self::ForSelector { selector, state } => json!({
                "selector": selector,
                "state": state.as_str(),
            }),
            Self::ForTimeout { timeout_ms } => json!({ "timeout_ms": timeout_ms }),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollAxis {
    #[default]
    Vertical,
    Horizontal,
    Both,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollAlign {
    Start,
    #[default]
    Center,
    End,
    Nearest,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBehavior {
    Auto,
    Instant,
    #[default]
    Smooth,
}

/// Structured scroll destination.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollTarget {
    #[serde(default, alias = "target", skip_serializing_if = "Option::is_none")]
    pub selector: Option<Selector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Selector>,
    #[serde(default)]
    pub axis: ScrollAxis,
    #[serde(default)]
    pub align: ScrollAlign,
    #[serde(default)]
    pub behavior: ScrollBehavior,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollEdge {
    Top,
    Bottom,
}

impl ScrollEdge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Destination of a `scroll` action.
#[derive(Clone, Debug, PartialEq)]
pub enum ScrollTo {
    Edge(ScrollEdge),
    Amount(i64),
    Target(ScrollTarget),
}

impl ScrollTo {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Edge(edge) => Value::String(edge.as_str().to_string()),
            Self::Amount(amount) => json!(amount),
            Self::Target(target) => serde_json::to_value(target).unwrap_or(Value::Null),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabStrategy {
    #[default]
    Index,
    Url,
    Title,
    Previous,
    Next,
    Latest,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TabValue {
    Number(i64),
    Text(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TabTarget {
    #[serde(default)]
    pub strategy: TabStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<TabValue>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStrategy {
    #[default]
    Index,
    Name,
    Url,
    Element,
    Parent,
    Root,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameValue {
    Number(i64),
    Text(String),
    Selector(Selector),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameTarget {
    #[serde(default)]
    pub strategy: FrameStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FrameValue>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotMode {
    #[default]
    Viewport,
    Full,
    Element,
}

impl ScreenshotMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewport => "viewport",
            Self::Full => "full",
            Self::Element => "element",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractAttr {
    #[default]
    Text,
    Value,
    Href,
    Html,
}

impl ExtractAttr {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Value => "value",
            Self::Href => "href",
            Self::Html => "html",
        }
    }
}

/// One step of a plan.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Navigate {
        url: String,
        wait_for: Option<WaitCondition>,
    },
    Click {
        selector: Selector,
        button: MouseButton,
        click_count: u32,
        delay_ms: Option<u64>,
    },
    Hover {
        selector: Selector,
    },
    Type {
        selector: Selector,
        text: String,
        press_enter: bool,
        clear: bool,
    },
    /// Type into a search box and submit with Enter.
    Search {
        selector: Selector,
        text: String,
    },
    Select {
        selector: Selector,
        value_or_label: String,
    },
    PressKey {
        keys: Vec<String>,
        scope: KeyScope,
    },
    Wait {
        condition: Option<WaitCondition>,
        timeout_ms: u64,
    },
    SubmitForm {
        selector: Option<Selector>,
    },
    Scroll {
        to: Option<ScrollTo>,
        direction: Option<ScrollDirection>,
        container: Option<Selector>,
    },
    ScrollToText {
        text: String,
    },
    SwitchTab {
        target: TabTarget,
    },
    FocusIframe {
        target: FrameTarget,
    },
    RefreshCatalog,
    EvalJs {
        script: String,
    },
    ClickBlankArea,
    ClosePopup,
    Stop {
        reason: Option<String>,
        message: Option<String>,
    },
    Screenshot {
        mode: ScreenshotMode,
        selector: Option<Selector>,
        file_name: Option<String>,
    },
    Extract {
        selector: Selector,
        attr: ExtractAttr,
    },
    Assert {
        selector: Selector,
        state: AssertState,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::Click { .. } => "click",
            Self::Hover { .. } => "hover",
            Self::Type { .. } => "type",
            Self::Search { .. } => "search",
            Self::Select { .. } => "select",
            Self::PressKey { .. } => "press_key",
            Self::Wait { .. } => "wait",
            Self::SubmitForm { .. } => "submit_form",
            Self::Scroll { .. } => "scroll",
            Self::ScrollToText { .. } => "scroll_to_text",
            Self::SwitchTab { .. } => "switch_tab",
            Self::FocusIframe { .. } => "focus_iframe",
            Self::RefreshCatalog => "refresh_catalog",
            Self::EvalJs { .. } => "eval_js",
            Self::ClickBlankArea => "click_blank_area",
            Self::ClosePopup => "close_popup",
            Self::Stop { .. } => "stop",
            Self::Screenshot { .. } => "screenshot",
            Self::Extract { .. } => "extract",
            Self::Assert { .. } => "assert",
        }
    }

    /// The selector this action resolves, when it has one.
    pub fn selector(&self) -> Option<&Selector> {
        match self {
            Self::Click { selector, .. }
            | Self::Hover { selector }
            | Self::Type { selector, .. }
            | Self::Search { selector, .. }
            | Self::Select { selector, .. }
            | Self::Extract { selector, .. }
            | Self::Assert { selector, .. } => Some(selector),
            Self::Screenshot { selector, .. } | Self::SubmitForm { selector } => selector.as_ref(),
            _ => None,
        }
    }

    pub fn selector_mut(&mut self) -> Option<&mut Selector> {
        match self {
            Self::Click { selector, .. }
            | Self::Hover { selector }
            | Self::Type { selector, .. }
            | Self::Search { selector, .. }
            | Self::Select { selector, .. }
            | Self::Extract { selector, .. }
            | Self::Assert { selector, .. } => Some(selector),
            Self::Screenshot { selector, .. } | Self::SubmitForm { selector } => selector.as_mut(),
            _ => None,
        }
    }

    /// Actions after which the element catalog can no longer be trusted.
    pub fn is_dom_mutating(&self) -> bool {
        matches!(
            self,
            Self::Navigate { .. }
                | Self::Click { .. }
                | Self::Type { .. }
                | Self::Search { .. }
                | Self::SubmitForm { .. }
                | Self::ScrollToText { .. }
        )
    }

    /// True when the action already waits for something, which quiets the
    /// click race warning.
    pub fn is_explicit_wait(&self) -> bool {
        match self {
            Self::Wait { .. } | Self::Assert { .. } => true,
            Self::Navigate { wait_for, .. } => wait_for.is_some(),
            _ => false,
        }
    }

    /// Canonical wire form keyed by `type`.
    pub fn payload(&self) -> Value {
        let mut data = Map::new();
        data.insert("type".to_string(), json!(self.name()));
        match self {
            Self::Navigate { url, wait_for } => {
                data.insert("url".to_string(), json!(url));
                if let Some(condition) = wait_for {
                    data.insert("wait_for".to_string(), condition.to_value());
                }
            }
            Self::Click {
                selector,
                button,
                click_count,
                delay_ms,
            } => {
                data.insert("selector".to_string(), json!(selector));
                data.insert("button".to_string(), json!(button.as_str()));
                data.insert("click_count".to_string(), json!(click_count));
                if let Some(delay) = delay_ms {
                    data.insert("delay_ms".to_string(), json!(delay));
                }
            }
            Self::Hover { selector } => {
                data.insert("selector".to_string(), json!(selector));
            }
            Self::Type {
                selector,
                text,
                press_enter,
                clear,
            } => {
                data.insert("selector".to_string(), json!(selector));
                data.insert("text".to_string(), json!(text));
                data.insert("press_enter".to_string(), json!(press_enter));
                data.insert("clear".to_string(), json!(clear));
            }
            Self::Search { selector, text } => {
                data.insert("selector".to_string(), json!(selector));
                data.insert("text".to_string(), json!(text));
            }
            Self::Select {
                selector,
                value_or_label,
            } => {
                data.insert("selector".to_string(), json!(selector));
                data.insert("value_or_label".to_string(), json!(value_or_label));
            }
            Self::PressKey { keys, scope } => {
                data.insert("keys".to_string(), json!(keys));
                data.insert("scope".to_string(), json!(scope.as_str()));
            }
            Self::Wait {
                condition,
                timeout_ms,
            } => {
                if let Some(condition) = condition {
                    data.insert("for".to_string(), condition.to_value());
                }
                data.insert("timeout_ms".to_string(), json!(timeout_ms));
            }
            Self::SubmitForm { selector } => {
                if let Some(selector) = selector {
                    data.insert("selector".to_string(), json!(selector));
                }
            }
            Self::Scroll {
                to,
                direction,
                container,
            } => {
                if let Some(to) = to {
                    data.insert("to".to_string(), to.to_value());
                }
                if let Some(direction) = direction {
                    data.insert("direction".to_string(), json!(direction.as_str()));
                }
                if let Some(container) = container {
                    data.insert("container".to_string(), json!(container));
                }
            }
            Self::ScrollToText { text } => {
                data.insert("text".to_string(), json!(text));
            }
            Self::SwitchTab { target } => {
                data.insert("target".to_string(), json!(target));
            }
            Self::FocusIframe { target } => {
                data.insert("target".to_string(), json!(target));
            }
            Self::RefreshCatalog | Self::ClickBlankArea | Self::ClosePopup => {}
            Self::EvalJs { script } => {
                data.insert("script".to_string(), json!(script));
            }
            Self::Stop { reason, message } => {
                if let Some(reason) = reason {
                    data.insert("reason".to_string(), json!(reason));
                }
                if let Some(message) = message {
                    data.insert("message".to_string(), json!(message));
                }
            }
            Self::Screenshot {
                mode,
                selector,
                file_name,
            } => {
                data.insert("mode".to_string(), json!(mode.as_str()));
                if let Some(selector) = selector {
                    data.insert("selector".to_string(), json!(selector));
                }
                if let Some(file_name) = file_name {
                    data.insert("file_name".to_string(), json!(file_name));
                }
            }
            Self::Extract { selector, attr } => {
                data.insert("selector".to_string(), json!(selector));
                data.insert("attr".to_string(), json!(attr.as_str()));
            }
            Self::Assert { selector, state } => {
                data.insert("selector".to_string(), json!(selector));
                data.insert("state".to_string(), json!(state.as_str()));
            }
        }
        Value::Object(data)
    }

    /// Legacy wire form keyed by `action`, with the old field names.
    pub fn legacy_payload(&self) -> Value {
        let mut data = Map::new();
        data.insert("action".to_string(), json!(self.name()));
        match self {
            Self::Navigate { url, wait_for } => {
                data.insert("url".to_string(), json!(url));
                data.insert("target".to_string(), json!(url));
                if let Some(condition) = wait_for {
                    match condition {
                        WaitCondition::ForState { state } => {
                            data.insert("until".to_string(), json!(state.as_str()));
                        }
                        WaitCondition::ForSelector { selector, state } => {
                            data.insert("until".to_string(), json!("selector"));
                            data.insert("wait_target".to_string(), selector.as_legacy());
                            data.insert("state".to_string(), json!(state.as_str()));
                        }
                        WaitCondition::ForTimeout { timeout_ms } => {
                            data.insert("until".to_string(), json!("timeout"));
                            data.insert("value".to_string(), json!(timeout_ms));
                        }
                    }
                }
            }
            Self::Click {
                selector,
                button,
                click_count,
                delay_ms,
            } => {
                data.insert("target".to_string(), selector.as_legacy());
                data.insert("button".to_string(), json!(button.as_str()));
                data.insert("click_count".to_string(), json!(click_count));
                if let Some(delay) = delay_ms {
                    data.insert("delay_ms".to_string(), json!(delay));
                }
            }
            Self::Hover { selector } => {
                data.insert("target".to_string(), selector.as_legacy());
            }
            Self::Type {
                selector,
                text,
                press_enter,
                clear,
            } => {
                data.insert("target".to_string(), selector.as_legacy());
                data.insert("value".to_string(), json!(text));
                data.insert("press_enter".to_string(), json!(press_enter));
                data.insert("clear".to_string(), json!(clear));
            }
            Self::Search { selector, text } => {
                data.insert("target".to_string(), selector.as_legacy());
                data.insert("value".to_string(), json!(text));
            }
            Self::Select {
                selector,
                value_or_label,
            } => {
                data.insert("target".to_string(), selector.as_legacy());
                data.insert("value".to_string(), json!(value_or_label));
            }
            Self::PressKey { keys, scope } => {
                data.insert("key".to_string(), json!(keys.join("+")));
                if *scope != KeyScope::ActiveElement {
                    data.insert("scope".to_string(), json!(scope.as_str()));
                }
            }
            Self::Wait {
                condition,
                timeout_ms,
            } => {
                data.insert("ms".to_string(), json!(timeout_ms));
                match condition {
                    Some(WaitCondition::ForState { state }) => {
                        data.insert("until".to_string(), json!(state.as_str()));
                    }
                    Some(WaitCondition::ForSelector { selector, state }) => {
                        data.insert("until".to_string(), json!("selector"));
                        data.insert("target".to_string(), selector.as_legacy());
                        data.insert("state".to_string(), json!(state.as_str()));
                    }
                    Some(WaitCondition::ForTimeout { timeout_ms }) => {
                        data.insert("until".to_string(), json!("timeout"));
                        data.insert("value".to_string(), json!(timeout_ms));
                    }
                    None => {}
                }
            }
            Self::SubmitForm { selector } => {
                if let Some(selector) = selector {
                    data.insert("target".to_string(), selector.as_legacy());
                }
            }
            Self::Scroll {
                to,
                direction,
                container,
            } => {
                match to {
                    Some(ScrollTo::Amount(amount)) => {
                        data.insert("amount".to_string(), json!(amount));
                    }
                    Some(other) => {
                        data.insert("target".to_string(), other.to_value());
                    }
                    None => {}
                }
                if let Some(direction) = direction {
                    data.insert("direction".to_string(), json!(direction.as_str()));
                }
                if let Some(container) = container {
                    data.insert("container".to_string(), container.as_legacy());
                }
            }
            Self::ScrollToText { text } => {
                data.insert("text".to_string(), json!(text));
            }
            Self::SwitchTab { target } => {
                data.insert("target".to_string(), json!(target));
            }
            Self::FocusIframe { target } => {
                data.insert("target".to_string(), json!(target));
            }
            Self::RefreshCatalog | Self::ClickBlankArea | Self::ClosePopup => {}
            Self::EvalJs { script } => {
                data.insert("script".to_string(), json!(script));
            }
            Self::Stop { reason, message } => {
                if let Some(reason) = reason {
                    data.insert("reason".to_string(), json!(reason));
                }
                if let Some(message) = message {
                    data.insert("message".to_string(), json!(message));
                }
            }
            Self::Screenshot {
                mode,
                selector,
                file_name,
            } => {
                data.insert("mode".to_string(), json!(mode.as_str()));
                if let Some(selector) = selector {
                    data.insert("target".to_string(), selector.as_legacy());
                }
                if let Some(file_name) = file_name {
                    data.insert("file_name".to_string(), json!(file_name));
                }
            }
            Self::Extract { selector, attr } => {
                data.insert("target".to_string(), selector.as_legacy());
                data.insert("attr".to_string(), json!(attr.as_str()));
            }
            Self::Assert { selector, state } => {
                data.insert("target".to_string(), selector.as_legacy());
                data.insert("state".to_string(), json!(state.as_str()));
            }
        }
        Value::Object(data)
    }
}
