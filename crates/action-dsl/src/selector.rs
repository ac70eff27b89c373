//! Composite target descriptors.
//!
//! A selector can name an element by CSS, XPath, visible text, ARIA role or
//! label, proximity to an anchor text, ordinal catalog index, or an opaque
//! stable id from a previous resolution. Legacy string forms (`"css=…"`,
//! `"xpath=…"`, `"index=N"`, bare CSS/XPath) parse into the same structure.

use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::validate::DslError;

/// Resolution strategies, in the order the resolver may try them.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    StableId,
    Css,
    Role,
    Text,
    AriaLabel,
    Xpath,
    NearText,
    #[serde(rename = "index")]
    OrdinalIndex,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::StableId => "stable_id",
            Strategy::Css => "css",
            Strategy::Role => "role",
            Strategy::Text => "text",
            Strategy::AriaLabel => "aria_label",
            Strategy::Xpath => "xpath",
            Strategy::NearText => "near_text",
            Strategy::OrdinalIndex => "index",
        }
    }
}

pub const DEFAULT_PRIORITY: [Strategy; 8] = [
    Strategy::StableId,
    Strategy::Css,
    Strategy::Role,
    Strategy::Text,
    Strategy::AriaLabel,
    Strategy::Xpath,
    Strategy::NearText,
    Strategy::OrdinalIndex,
];

/// Composite selector. At least one discriminator field must be set.
#[derive(Clone, Debug, Default)]
pub struct Selector {
    pub css: Option<String>,
    pub xpath: Option<String>,
    pub text: Option<String>,
    pub role: Option<String>,
    pub index: Option<u32>,
    pub near_text: Option<String>,
    pub aria_label: Option<String>,
    pub priority: Option<Vec<Strategy>>,
    pub stable_id: Option<String>,
    /// Raw legacy string this selector was parsed from, kept so the legacy
    /// payload can reproduce it byte for byte. Never serialized and never
    /// part of equality.
    pub legacy_value: Option<String>,
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.css == other.css
            && self.xpath == other.xpath
            && self.text == other.text
            && self.role == other.role
            && self.index == other.index
            && self.near_text == other.near_text
            && self.aria_label == other.aria_label
            && self.priority == other.priority
            && self.stable_id == other.stable_id
    }
}

impl Selector {
    pub fn css(value: impl Into<String>) -> Self {
        Self {
            css: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn ordinal(index: u32) -> Self {
        Self {
            index: Some(index),
            ..Self::default()
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self {
            text: Some(value.into()),
            ..Self::default()
        }
    }

    /// Parse a legacy string target.
    pub fn parse_legacy(raw: &str) -> Result<Self, DslError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DslError::Validation("selector string is empty".into()));
        }

        let legacy = Some(trimmed.to_string());
        if let Some(rest) = trimmed.strip_prefix("css=") {
            return Ok(Self {
                css: Some(rest.to_string()),
                legacy_value: legacy,
                ..Self::default()
            });
        }
        if let Some(rest) = trimmed.strip_prefix("xpath=") {
            return Ok(Self {
                xpath: Some(rest.to_string()),
                legacy_value: legacy,
                ..Self::default()
            });
        }
        if let Some(rest) = trimmed.strip_prefix("text=") {
            return Ok(Self {
                text: Some(rest.to_string()),
                legacy_value: legacy,
                ..Self::default()
            });
        }
        if let Some(rest) = trimmed.strip_prefix("index=") {
            let index: u32 = rest.trim().parse().map_err(|_| {
                DslError::InvalidIndex(format!(
                    "invalid index format: {trimmed}. Expected 'index=N' where N is a non-negative number"
                ))
            })?;
            return Ok(Self {
                index: Some(index),
                legacy_value: legacy,
                ..Self::default()
            });
        }
        // Bare XPath expressions start with a slash or parenthesis.
        if trimmed.starts_with('/') || trimmed.starts_with('(') {
            return Ok(Self {
                xpath: Some(trimmed.to_string()),
                legacy_value: legacy,
                ..Self::default()
            });
        }
        Ok(Self {
            css: Some(trimmed.to_string()),
            legacy_value: legacy,
            ..Self::default()
        })
    }

    /// Parse either a legacy string or a selector object.
    pub fn parse_value(value: &Value) -> Result<Self, DslError> {
        match value {
            Value::String(raw) => Self::parse_legacy(raw),
            Value::Object(_) => serde_json::from_value(value.clone())
                .map_err(|err| DslError::Validation(format!("invalid selector: {err}"))),
            other => Err(DslError::Validation(format!(
                "selector must be a string or object, got {other}"
            ))),
        }
    }

    /// Effective strategy order. A present `stable_id` is always tried
    /// first, whatever the caller-supplied priority says.
    pub fn effective_priority(&self) -> Vec<Strategy> {
        let base: Vec<Strategy> = match &self.priority {
            Some(priority) if !priority.is_empty() => {
                let mut seen = Vec::new();
                for strategy in priority {
                    if !seen.contains(strategy) {
                        seen.push(*strategy);
                    }
                }
                seen
            }
            _ => DEFAULT_PRIORITY.to_vec(),
        };

        if self.stable_id.is_some() && base.first() != Some(&Strategy::StableId) {
            let mut reordered = vec![Strategy::StableId];
            reordered.extend(base.into_iter().filter(|s| *s != Strategy::StableId));
            return reordered;
        }
        base
    }

    /// True when at least one discriminator field is set.
    pub fn has_discriminator(&self) -> bool {
        self.css.is_some()
            || self.xpath.is_some()
            || self.text.is_some()
            || self.role.is_some()
            || self.aria_label.is_some()
            || self.near_text.is_some()
            || self.index.is_some()
            || self.stable_id.is_some()
    }

    /// Legacy wire form: the original string when this selector came from
    /// one, otherwise the object form.
    pub fn as_legacy(&self) -> Value {
        if let Some(raw) = &self.legacy_value {
            return Value::String(raw.clone());
        }
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Short human description used in warnings and errors.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(css) = &self.css {
            parts.push(format!("css={css}"));
        }
        if let Some(xpath) = &self.xpath {
            parts.push(format!("xpath={xpath}"));
        }
        if let Some(text) = &self.text {
            parts.push(format!("text={text}"));
        }
        if let Some(role) = &self.role {
            parts.push(format!("role={role}"));
        }
        if let Some(aria) = &self.aria_label {
            parts.push(format!("aria_label={aria}"));
        }
        if let Some(near) = &self.near_text {
            parts.push(format!("near_text={near}"));
        }
        if let Some(index) = self.index {
            parts.push(format!("index={index}"));
        }
        if let Some(stable) = &self.stable_id {
            parts.push(format!("stable_id={stable}"));
        }
        if parts.is_empty() {
            "(empty selector)".to_string()
        } else {
            parts.join(" ")
        }
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(v) = &self.css {
            map.serialize_entry("css", v)?;
        }
        if let Some(v) = &self.xpath {
            map.serialize_entry("xpath", v)?;
        }
        if let Some(v) = &self.text {
            map.serialize_entry("text", v)?;
        }
        if let Some(v) = &self.role {
            map.serialize_entry("role", v)?;
        }
        if let Some(v) = self.index {
            map.serialize_entry("index", &v)?;
        }
        if let Some(v) = &self.near_text {
            map.serialize_entry("near_text", v)?;
        }
        if let Some(v) = &self.aria_label {
            map.serialize_entry("aria_label", v)?;
        }
        if let Some(v) = &self.priority {
            map.serialize_entry("priority", v)?;
        }
        if let Some(v) = &self.stable_id {
            map.serialize_entry("stable_id", v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(raw) => Selector::parse_legacy(&raw).map_err(DeError::custom),
            Value::Object(map) => {
                let mut selector = Selector::default();
                for (key, entry) in map {
                    match key.as_str() {
                        "css" => selector.css = as_opt_string(entry),
                        "xpath" => selector.xpath = as_opt_string(entry),
                        "text" => selector.text = as_opt_string(entry),
                        "role" => selector.role = as_opt_string(entry),
                        "index" | "ordinal_index" => {
                            if entry.is_null() {
                                continue;
                            }
                            let index = entry.as_u64().ok_or_else(|| {
                                DeError::custom(format!("index must be a non-negative integer, got {entry}"))
                            })?;
                            selector.index = Some(index as u32);
                        }
                        "near_text" => selector.near_text = as_opt_string(entry),
                        "aria_label" => selector.aria_label = as_opt_string(entry),
                        "stable_id" => selector.stable_id = as_opt_string(entry),
                        "priority" => {
                            if entry.is_null() {
                                continue;
                            }
                            let priority: Vec<Strategy> = serde_json::from_value(entry)
                                .map_err(DeError::custom)?;
                            selector.priority = Some(priority);
                        }
                        // Unknown keys are dropped, matching how legacy
                        // "target"-style dictionaries are accepted.
                        _ => {}
                    }
                }
                Ok(selector)
            }
            other => Err(DeError::custom(format!(
                "selector must be a string or object, got {other}"
            ))),
        }
    }
}

fn as_opt_string(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        _ => None,
    }
}
