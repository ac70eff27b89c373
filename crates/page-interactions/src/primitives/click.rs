//! Click primitive with the force / JS-dispatch fallback ladder.

use std::sync::Arc;
use std::time::Duration;

use cdp_bridge::driver::SelectorState;
use cdp_bridge::PageDriver;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::ActionError;
use crate::primitives::quote;

/// Click the element at `css`.
///
/// Ladder: wait attached → scroll into view → wait visible → assert enabled
/// → hover → native click; on failure a coordinate click at the bbox
/// center; on failure a JS `el.click()` dispatch. Fallbacks taken are
/// appended to `warnings`.
pub async fn click(
    driver: &Arc<dyn PageDriver>,
    css: &str,
    timeout: Duration,
    warnings: &mut Vec<String>,
) -> Result<(), ActionError> {
    driver
        .wait_for_selector_state(css, SelectorState::Attached, timeout)
        .await
        .map_err(|_| ActionError::ElementNotFound(format!("no element matches {css}")))?;

    let quoted = quote(css);
    let _ = driver
        .evaluate(&format!(
            r#"(() => {{ const el = document.querySelector({quoted});
                if (el) el.scrollIntoView({{block: "center", inline: "nearest"}}); }})()"#
        ))
        .await;

    driver
        .wait_for_selector_state(css, SelectorState::Visible, timeout)
        .await
        .map_err(|_| ActionError::NotInteractable(format!("{css} never became visible")))?;

    let enabled = driver
        .evaluate(&format!(
            r#"(() => {{ const el = document.querySelector({quoted});
                return el ? el.disabled !== true : false; }})()"#
        ))
        .await?;
    if enabled != Value::Bool(true) {
        return Err(ActionError::NotInteractable(format!("{css} is disabled")));
    }

    if let Err(err) = driver.hover_css(css).await {
        debug!(target: "page-interactions", %err, css, "pre-click hover failed");
    }

    match driver.click_css(css).await {
        Ok(()) => return Ok(()),
        Err(err) => {
            warn!(target: "page-interactions", %err, css, "native click failed");
            warnings.push(format!("click: native click failed on {css}; retrying with force"));
        }
    }

    // Force rung: click the bbox center regardless of hit testing.
    let center = driver
        .evaluate(&format!(
            r#"(() => {{ const el = document.querySelector({quoted});
                if (!el) return null;
                const rect = el.getBoundingClientRect();
                return [rect.x + rect.width / 2, rect.y + rect.height / 2]; }})()"#
        ))
        .await?;
    if let Some(coords) = center.as_array().filter(|c| c.len() == 2) {
        let x = coords[0].as_f64().unwrap_or(0.0);
        let y = coords[1].as_f64().unwrap_or(0.0);
        match driver.mouse_click(x, y).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                warn!(target: "page-interactions", %err, css, "force click failed");
                warnings.push(format!("click: force click failed on {css}; dispatching JS click"));
            }
        }
    } else {
        warnings.push(format!("click: no bounding box for {css}; dispatching JS click"));
    }

    // Last rung: in-page dispatch.
    let clicked = driver
        .evaluate(&format!(
            r#"(() => {{ const el = document.querySelector({quoted});
                if (!el) return false;
                el.click();
                return true; }})()"#
        ))
        .await?;
    if clicked == Value::Bool(true) {
        Ok(())
    } else {
        Err(ActionError::ElementNotFound(format!(
            "{css} disappeared before the JS click fallback"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_bridge::testing::FakePageDriver;
    use cdp_bridge::DriverError;
    use serde_json::json;

    fn responsive_page(fake: &FakePageDriver) {
        fake.set_eval_handler(|script| {
            if script.contains("getComputedStyle") {
                Some(Ok(json!("visible")))
            } else if script.contains("disabled !== true") {
                Some(Ok(json!(true)))
            } else if script.contains("getBoundingClientRect") {
                Some(Ok(json!([50.0, 20.0])))
            } else if script.contains("el.click()") {
                Some(Ok(json!(true)))
            } else {
                Some(Ok(json!(null)))
            }
        });
    }

    #[tokio::test]
    async fn native_click_is_the_happy_path() {
        let fake = FakePageDriver::new();
        responsive_page(&fake);
        let driver: Arc<dyn PageDriver> = Arc::new(fake);
        let mut warnings = Vec::new();
        click(&driver, "#buy", Duration::from_secs(1), &mut warnings)
            .await
            .unwrap();
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_force_then_js() {
        let fake = FakePageDriver::new();
        responsive_page(&fake);
        fake.fail_times("click", 1, DriverError::Io("obscured".into()));
        fake.fail_times("mouse_click", 1, DriverError::Io("still obscured".into()));
        let driver: Arc<dyn PageDriver> = Arc::new(fake);

        let mut warnings = Vec::new();
        click(&driver, "#buy", Duration::from_secs(1), &mut warnings)
            .await
            .unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("force"));
        assert!(warnings[1].contains("JS click"));
    }

    #[tokio::test]
    async fn disabled_element_is_not_interactable() {
        let fake = FakePageDriver::new();
        fake.set_eval_handler(|script| {
            if script.contains("getComputedStyle") {
                Some(Ok(json!("visible")))
            } else if script.contains("disabled !== true") {
                Some(Ok(json!(false)))
            } else {
                Some(Ok(json!(null)))
            }
        });
        let driver: Arc<dyn PageDriver> = Arc::new(fake);
        let mut warnings = Vec::new();
        let err = click(&driver, "#frozen", Duration::from_millis(300), &mut warnings)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ELEMENT_NOT_INTERACTABLE");
    }
}
