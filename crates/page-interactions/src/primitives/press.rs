//! Key press primitive.

use std::sync::Arc;

use cdp_bridge::PageDriver;
use serde_json::Value;
use tracing::debug;

use crate::errors::ActionError;
use crate::primitives::quote;

/// Where a key press is aimed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyPressScope {
    /// The currently focused element.
    ActiveElement,
    /// Page-level keyboard dispatch.
    Page,
}

/// Press `keys` in order (each entry may itself be a `Mod+Key` combination).
///
/// The CDP dispatch reaches the focused element either way; the JS event
/// fallback differs by scope: `active_element` dispatches on
/// `document.activeElement`, `page` on `document`.
pub async fn press_key(
    driver: &Arc<dyn PageDriver>,
    keys: &[String],
    scope: KeyPressScope,
    warnings: &mut Vec<String>,
) -> Result<(), ActionError> {
    for key in keys {
        if driver.press_key(key).await.is_ok() {
            continue;
        }
        debug!(target: "page-interactions", key = %key, "CDP key dispatch failed");
        warnings.push(format!("press_key: CDP dispatch failed for '{key}'; using JS events"));

        let dispatched = js_key_fallback(driver, key, scope).await?;
        if dispatched != Value::Bool(true) {
            return Err(ActionError::PressKeyFailed(format!(
                "no dispatch path delivered '{key}'"
            )));
        }
    }
    Ok(())
}

async fn js_key_fallback(
    driver: &Arc<dyn PageDriver>,
    key: &str,
    scope: KeyPressScope,
) -> Result<Value, ActionError> {
    let parts: Vec<&str> = key.split('+').filter(|p| !p.is_empty()).collect();
    let main_key = parts.last().copied().unwrap_or(key);
    let ctrl = parts.iter().any(|p| matches!(*p, "Control" | "Ctrl"));
    let alt = parts.iter().any(|p| *p == "Alt");
    let shift = parts.iter().any(|p| *p == "Shift");
    let meta = parts.iter().any(|p| matches!(*p, "Meta" | "Command"));

    let quoted_key = quote(main_key);
    let target = match scope {
        KeyPressScope::ActiveElement => "document.activeElement || document",
        KeyPressScope::Page => "document",
    };

    let key_code = legacy_key_code(main_key);
    driver
        .evaluate(&format!(
            r#"(() => {{
                const target = {target};
                if (!target) return false;
                for (const kind of ["keydown", "keyup"]) {{
                    target.dispatchEvent(new KeyboardEvent(kind, {{
                        key: {quoted_key},
                        keyCode: {key_code},
                        which: {key_code},
                        ctrlKey: {ctrl},
                        altKey: {alt},
                        shiftKey: {shift},
                        metaKey: {meta},
                        bubbles: true,
                    }}));
                }}
                return true;
            }})()"#
        ))
        .await
        .map_err(ActionError::from)
}

/// Legacy `keyCode` values for the keys plans actually press.
fn legacy_key_code(key: &str) -> u32 {
    match key {
        "Enter" => 13,
        "Tab" => 9,
        "Escape" => 27,
        "Backspace" => 8,
        "Delete" => 46,
        "ArrowUp" => 38,
        "ArrowDown" => 40,
        "ArrowLeft" => 37,
        "ArrowRight" => 39,
        "Home" => 36,
        "End" => 35,
        "PageUp" => 33,
        "PageDown" => 34,
        " " | "Space" => 32,
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() => {
                    c.to_ascii_uppercase() as u32
                }
                _ => 0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_bridge::testing::FakePageDriver;
    use cdp_bridge::DriverError;
    use serde_json::json;

    #[tokio::test]
    async fn cdp_path_presses_each_key() {
        let fake = FakePageDriver::new();
        let driver: Arc<dyn PageDriver> = Arc::new(fake);
        let mut warnings = Vec::new();
        press_key(
            &driver,
            &["Control+S".to_string(), "Enter".to_string()],
            KeyPressScope::ActiveElement,
            &mut warnings,
        )
        .await
        .unwrap();
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn js_fallback_kicks_in_and_warns() {
        let fake = FakePageDriver::new();
        fake.fail_times("press", 1, DriverError::Io("no target".into()));
        fake.set_eval_handler(|script| {
            script.contains("KeyboardEvent").then(|| Ok(json!(true)))
        });
        let driver: Arc<dyn PageDriver> = Arc::new(fake);
        let mut warnings = Vec::new();
        press_key(
            &driver,
            &["Enter".to_string()],
            KeyPressScope::Page,
            &mut warnings,
        )
        .await
        .unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[tokio::test]
    async fn exhausted_paths_fail_with_press_key_code() {
        let fake = FakePageDriver::new();
        fake.fail_times("press", 1, DriverError::Io("no target".into()));
        fake.set_eval_handler(|script| {
            script.contains("KeyboardEvent").then(|| Ok(json!(false)))
        });
        let driver: Arc<dyn PageDriver> = Arc::new(fake);
        let mut warnings = Vec::new();
        let err = press_key(
            &driver,
            &["Enter".to_string()],
            KeyPressScope::ActiveElement,
            &mut warnings,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "PRESS_KEY_FAILED");
    }

    #[test]
    fn key_codes_cover_the_common_keys() {
        assert_eq!(legacy_key_code("Enter"), 13);
        assert_eq!(legacy_key_code("a"), 65);
        assert_eq!(legacy_key_code("F99"), 0);
    }
}
