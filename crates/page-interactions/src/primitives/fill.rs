//! Fill primitive: editability discovery, clear-then-verify, and the
//! character-by-character retype path that defeats autocomplete overwrites.

use std::sync::Arc;
use std::time::Duration;

use cdp_bridge::PageDriver;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::ActionError;
use crate::primitives::quote;

/// Editable targets accepted directly, and searched for during fallback
/// discovery.
pub const TEXT_INPUT_SELECTOR: &str = "input:not([type]), input[type='text'], \
input[type='search'], input[type='email'], input[type='password'], \
input[type='number'], input[type='tel'], input[type='url'], \
input[type='date'], input[type='datetime-local'], textarea, \
[contenteditable='true'], [role='textbox'], [role='searchbox'], [role='combobox']";

/// Delay between keystrokes on the retype path.
const RETYPE_DELAY: Duration = Duration::from_millis(50);

/// Fill `value` into the element at `css`, hunting for a nearby editable
/// when the target itself is not one.
///
/// On the found editable: click → clear → fill → verify; a mismatch (e.g.
/// autocomplete rewrote the value) selects-all and retypes character by
/// character; a still-unresponsive element gets a JS value set that
/// dispatches `input` and `change`.
pub async fn fill(
    driver: &Arc<dyn PageDriver>,
    css: &str,
    value: &str,
    warnings: &mut Vec<String>,
) -> Result<(), ActionError> {
    let target = match find_editable(driver, css).await? {
        Some((editable_css, rung)) => {
            if editable_css != css {
                warnings.push(format!(
                    "fill: {css} is not editable; using {editable_css} found via {rung}"
                ));
            }
            editable_css
        }
        None => {
            return Err(ActionError::NotEditable(format!(
                "no editable element at or near {css}"
            )))
        }
    };

    if let Err(err) = driver.click_css(&target).await {
        debug!(target: "page-interactions", %err, css = %target, "focus click failed");
    }

    driver.fill_css(&target, "").await?;
    driver.fill_css(&target, value).await?;

    if reads_back(driver, &target, value).await {
        return Ok(());
    }
    warnings.push(format!(
        "fill: value mismatch after fill on {target}; clearing and retyping per character"
    ));

    // Select-all then retype one character at a time. The per-keystroke
    // delay gives interfering listeners a chance to settle between events.
    if let Err(err) = driver.press_key("Control+a").await {
        debug!(target: "page-interactions", %err, "select-all failed before retype");
    }
    driver.fill_css(&target, "").await?;
    driver.type_chars(&target, value, RETYPE_DELAY).await?;

    if reads_back(driver, &target, value).await {
        return Ok(());
    }
    warnings.push(format!(
        "fill: element {target} unresponsive to typing; setting value via JS"
    ));

    let quoted_css = quote(&target);
    let quoted_value = quote(value);
    let set = driver
        .evaluate(&format!(
            r#"(() => {{
                const el = document.querySelector({quoted_css});
                if (!el) return false;
                if (el.isContentEditable) {{
                    el.innerText = {quoted_value};
                }} else {{
                    el.value = {quoted_value};
                }}
                el.dispatchEvent(new Event("input", {{ bubbles: true }}));
                el.dispatchEvent(new Event("change", {{ bubbles: true }}));
                return true;
            }})()"#
        ))
        .await?;

    if set == Value::Bool(true) {
        Ok(())
    } else {
        warn!(target: "page-interactions", css = %target, "all fill paths exhausted");
        Err(ActionError::NotEditable(format!(
            "element {target} rejected every fill path"
        )))
    }
}

async fn reads_back(driver: &Arc<dyn PageDriver>, css: &str, expected: &str) -> bool {
    matches!(driver.input_value(css).await, Ok(actual) if actual == expected)
}

/// Locate the editable to act on. Returns the CSS path plus the discovery
/// rung used, or `None` when nothing editable exists nearby.
///
/// Order: the element itself; a descendant text input; the element
/// referenced by `label[for]`; elements referenced by
/// `aria-controls`/`aria-labelledby`/`aria-describedby`; a following
/// sibling input; ancestors up to 3 levels with a descendant input.
async fn find_editable(
    driver: &Arc<dyn PageDriver>,
    css: &str,
) -> Result<Option<(String, &'static str)>, ActionError> {
    let quoted = quote(css);
    let input_selector = quote(TEXT_INPUT_SELECTOR);
    let script = format!(
        r#"(() => {{
            const INPUTS = {input_selector};
            const cssPath = (el) => {{
                const parts = [];
                let node = el;
                while (node && node.nodeType === Node.ELEMENT_NODE && node.tagName !== "HTML") {{
                    const tag = node.tagName.toLowerCase();
                    let nth = 1;
                    let sibling = node;
                    while ((sibling = sibling.previousElementSibling)) {{
                        if (sibling.tagName === node.tagName) nth += 1;
                    }}
                    parts.unshift(tag + ":nth-of-type(" + nth + ")");
                    node = node.parentElement;
                }}
                return parts.join(" > ");
            }};
            const isEditable = (el) => el && el.matches && el.matches(INPUTS);

            const el = document.querySelector({quoted});
            if (!el) return null;
            if (isEditable(el)) return {{ path: cssPath(el), rung: "self" }};

            const descendant = el.querySelector(INPUTS);
            if (descendant) return {{ path: cssPath(descendant), rung: "descendant" }};

            if (el.tagName.toLowerCase() === "label") {{
                const forId = el.getAttribute("for");
                if (forId) {{
                    const referenced = document.getElementById(forId);
                    if (isEditable(referenced)) return {{ path: cssPath(referenced), rung: "label-for" }};
                }}
            }}

            for (const attr of ["aria-controls", "aria-labelledby", "aria-describedby"]) {{
                const ids = (el.getAttribute(attr) || "").split(/\s+/).filter(Boolean);
                for (const id of ids) {{
                    const referenced = document.getElementById(id);
                    if (isEditable(referenced)) return {{ path: cssPath(referenced), rung: attr }};
                }}
            }}

            let sibling = el.nextElementSibling;
            while (sibling) {{
                if (isEditable(sibling)) return {{ path: cssPath(sibling), rung: "sibling" }};
                const inner = sibling.querySelector && sibling.querySelector(INPUTS);
                if (inner) return {{ path: cssPath(inner), rung: "sibling" }};
                sibling = sibling.nextElementSibling;
            }}

            let ancestor = el.parentElement;
            for (let depth = 0; depth < 3 && ancestor; depth++) {{
                const inner = ancestor.querySelector(INPUTS);
                if (inner) return {{ path: cssPath(inner), rung: "ancestor" }};
                ancestor = ancestor.parentElement;
            }}
            return null;
        }})()"#
    );

    let found = driver.evaluate(&script).await?;
    let object = match found.as_object() {
        Some(object) => object,
        None => return Ok(None),
    };
    let path = object.get("path").and_then(Value::as_str);
    let rung = object.get("rung").and_then(Value::as_str);
    match (path, rung) {
        (Some(path), Some(rung)) => {
            let rung: &'static str = match rung {
                "self" => "self",
                "descendant" => "descendant",
                "label-for" => "label-for",
                "aria-controls" => "aria-controls",
                "aria-labelledby" => "aria-labelledby",
                "aria-describedby" => "aria-describedby",
                "sibling" => "sibling",
                _ => "ancestor",
            };
            Ok(Some((path.to_string(), rung)))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_bridge::testing::FakePageDriver;
    use serde_json::json;
    use std::sync::Arc as StdArc;

    fn editable_self_handler(script: &str) -> Option<Result<Value, cdp_bridge::DriverError>> {
        if script.contains("isEditable") {
            Some(Ok(json!({ "path": "#q", "rung": "self" })))
        } else {
            Some(Ok(json!(true)))
        }
    }

    #[tokio::test]
    async fn straightforward_fill_verifies_and_stops() {
        let fake = FakePageDriver::new();
        fake.set_eval_handler(editable_self_handler);
        let driver: StdArc<dyn PageDriver> = StdArc::new(fake);
        let mut warnings = Vec::new();
        fill(&driver, "#q", "ノートPC", &mut warnings).await.unwrap();
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn autocomplete_interference_takes_the_retype_path() {
        let fake = FakePageDriver::new();
        fake.set_eval_handler(editable_self_handler);
        // Model autocomplete: the first two verification reads see a value
        // the page substituted ("長野"), so input_value never matches until
        // the per-character retype rewrites it.
        let driver_fake = StdArc::new(fake);
        driver_fake.set_input("#dest", "長野");
        // fill() will: fill("") → fill("箱根") → read back. The wrapper
        // below makes the first read-back report the autocomplete value.
        struct Poisoned {
            inner: StdArc<FakePageDriver>,
            lied: std::sync::atomic::AtomicBool,
        }
        #[async_trait::async_trait]
        impl PageDriver for Poisoned {
            async fn navigate(&self, url: &str, w: &str, t: Duration) -> Result<(), cdp_bridge::DriverError> {
                self.inner.navigate(url, w, t).await
            }
            async fn evaluate(&self, s: &str) -> Result<Value, cdp_bridge::DriverError> {
                self.inner.evaluate(s).await
            }
            async fn content(&self) -> Result<String, cdp_bridge::DriverError> {
                self.inner.content().await
            }
            async fn url(&self) -> Result<String, cdp_bridge::DriverError> {
                self.inner.url().await
            }
            async fn title(&self) -> Result<String, cdp_bridge::DriverError> {
                self.inner.title().await
            }
            async fn screenshot_png(&self) -> Result<Vec<u8>, cdp_bridge::DriverError> {
                self.inner.screenshot_png().await
            }
            async fn click_css(&self, css: &str) -> Result<(), cdp_bridge::DriverError> {
                self.inner.click_css(css).await
            }
            async fn fill_css(&self, css: &str, v: &str) -> Result<(), cdp_bridge::DriverError> {
                self.inner.fill_css(css, v).await
            }
            async fn type_chars(&self, css: &str, text: &str, d: Duration) -> Result<(), cdp_bridge::DriverError> {
                self.inner.type_chars(css, text, d).await
            }
            async fn input_value(&self, css: &str) -> Result<String, cdp_bridge::DriverError> {
                use std::sync::atomic::Ordering;
                if !self.lied.swap(true, Ordering::SeqCst) {
                    // Autocomplete replaced the typed value once.
                    return Ok("長野".to_string());
                }
                self.inner.input_value(css).await
            }
            async fn hover_css(&self, css: &str) -> Result<(), cdp_bridge::DriverError> {
                self.inner.hover_css(css).await
            }
            async fn press_key(&self, key: &str) -> Result<(), cdp_bridge::DriverError> {
                self.inner.press_key(key).await
            }
            async fn mouse_move(&self, x: f64, y: f64) -> Result<(), cdp_bridge::DriverError> {
                self.inner.mouse_move(x, y).await
            }
            async fn mouse_click(&self, x: f64, y: f64) -> Result<(), cdp_bridge::DriverError> {
                self.inner.mouse_click(x, y).await
            }
            async fn scroll_by(&self, dx: f64, dy: f64) -> Result<(), cdp_bridge::DriverError> {
                self.inner.scroll_by(dx, dy).await
            }
        }
        let inner = driver_fake.clone();
        let poisoned = Poisoned {
            inner: driver_fake,
            lied: std::sync::atomic::AtomicBool::new(false),
        };
        {
            let fake: &FakePageDriver = &inner;
            fake.set_eval_handler(|script| {
                if script.contains("isEditable") {
                    Some(Ok(json!({ "path": "#dest", "rung": "self" })))
                } else {
                    Some(Ok(json!(true)))
                }
            });
        }
        let driver: StdArc<dyn PageDriver> = StdArc::new(poisoned);

        let mut warnings = Vec::new();
        fill(&driver, "#dest", "箱根", &mut warnings).await.unwrap();

        assert_eq!(inner.input("#dest").as_deref(), Some("箱根"));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("retyping per character"));
    }

    #[tokio::test]
    async fn non_editable_with_no_fallback_is_typed_error() {
        let fake = FakePageDriver::new();
        fake.set_eval_handler(|script| {
            if script.contains("isEditable") {
                Some(Ok(json!(null)))
            } else {
                Some(Ok(json!(true)))
            }
        });
        let driver: StdArc<dyn PageDriver> = StdArc::new(fake);
        let mut warnings = Vec::new();
        let err = fill(&driver, "div#banner", "x", &mut warnings)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ELEMENT_NOT_INTERACTABLE");
    }

    #[tokio::test]
    async fn discovery_warning_names_the_rung() {
        let fake = FakePageDriver::new();
        fake.set_eval_handler(|script| {
            if script.contains("isEditable") {
                Some(Ok(
                    json!({ "path": "div:nth-of-type(1) > input:nth-of-type(1)", "rung": "descendant" }),
                ))
            } else {
                Some(Ok(json!(true)))
            }
        });
        let driver: StdArc<dyn PageDriver> = StdArc::new(fake);
        let mut warnings = Vec::new();
        fill(&driver, "div.search", "tokyo", &mut warnings).await.unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("descendant"));
    }
}
