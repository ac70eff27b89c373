//! Scroll helpers: page, container, edge, amount and scroll-to-text.

use std::sync::Arc;

use cdp_bridge::PageDriver;
use serde_json::Value;

use crate::errors::ActionError;
use crate::primitives::quote;

/// Scroll the window by a pixel amount (negative scrolls up).
pub async fn scroll_by_amount(driver: &Arc<dyn PageDriver>, amount: i64) -> Result<(), ActionError> {
    driver.scroll_by(0.0, amount as f64).await?;
    Ok(())
}

/// Jump to the top or bottom of the document.
pub async fn scroll_to_edge(driver: &Arc<dyn PageDriver>, top: bool) -> Result<(), ActionError> {
    let script = if top {
        "window.scrollTo(0, 0)"
    } else {
        "window.scrollTo(0, document.body.scrollHeight)"
    };
    driver.evaluate(script).await?;
    Ok(())
}

/// Scroll a specific element into view.
pub async fn scroll_to_selector(
    driver: &Arc<dyn PageDriver>,
    css: &str,
) -> Result<(), ActionError> {
    let quoted = quote(css);
    let found = driver
        .evaluate(&format!(
            r#"(() => {{
                const el = document.querySelector({quoted});
                if (!el) return false;
                el.scrollIntoView({{ behavior: "smooth", block: "center" }});
                return true;
            }})()"#
        ))
        .await?;
    if found == Value::Bool(true) {
        Ok(())
    } else {
        Err(ActionError::ElementNotFound(format!(
            "scroll target {css} not found"
        )))
    }
}

/// Scroll inside a container element rather than the window.
pub async fn scroll_container(
    driver: &Arc<dyn PageDriver>,
    css: &str,
    amount: i64,
) -> Result<(), ActionError> {
    let quoted = quote(css);
    let found = driver
        .evaluate(&format!(
            r#"(() => {{
                const el = document.querySelector({quoted});
                if (!el) return false;
                el.scrollBy(0, {amount});
                return true;
            }})()"#
        ))
        .await?;
    if found == Value::Bool(true) {
        Ok(())
    } else {
        Err(ActionError::ElementNotFound(format!(
            "scroll container {css} not found"
        )))
    }
}

/// Walk the document's text nodes and scroll the first match into view.
/// Returns `false` (with no error) when the text does not exist yet.
pub async fn scroll_to_text(driver: &Arc<dyn PageDriver>, text: &str) -> Result<bool, ActionError> {
    let quoted = quote(text);
    let found = driver
        .evaluate(&format!(
            r#"(() => {{
                const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT);
                const target = {quoted}.toLowerCase();
                while (walker.nextNode()) {{
                    const value = walker.currentNode.textContent || "";
                    if (value.toLowerCase().includes(target)) {{
                        walker.currentNode.parentElement?.scrollIntoView(
                            {{ behavior: "smooth", block: "center" }});
                        return true;
                    }}
                }}
                return false;
            }})()"#
        ))
        .await?;
    Ok(found == Value::Bool(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_bridge::testing::FakePageDriver;
    use serde_json::json;

    #[tokio::test]
    async fn amount_scroll_goes_through_the_driver() {
        let fake = FakePageDriver::new();
        let driver: Arc<dyn PageDriver> = Arc::new(fake);
        scroll_by_amount(&driver, -400).await.unwrap();
    }

    #[tokio::test]
    async fn scroll_to_text_reports_absence_without_error() {
        let fake = FakePageDriver::new();
        fake.set_eval_handler(|script| {
            script.contains("createTreeWalker").then(|| Ok(json!(false)))
        });
        let driver: Arc<dyn PageDriver> = Arc::new(fake);
        let found = scroll_to_text(&driver, "利用規約").await.unwrap();
        assert!(!found);
    }

    #[tokio::test]
    async fn missing_scroll_target_is_an_error() {
        let fake = FakePageDriver::new();
        fake.set_eval_handler(|script| {
            script.contains("scrollIntoView").then(|| Ok(json!(false)))
        });
        let driver: Arc<dyn PageDriver> = Arc::new(fake);
        let err = scroll_to_selector(&driver, "#ghost").await.unwrap_err();
        assert_eq!(err.code(), "ELEMENT_NOT_FOUND");
    }
}
