//! Select primitive.

use std::sync::Arc;

use cdp_bridge::PageDriver;
use serde_json::Value;
use tracing::debug;

use crate::errors::ActionError;
use crate::primitives::quote;

/// Choose an option on the `<select>` (or listbox-like widget) at `css`.
///
/// Ladder: match by option value → by exact label → by substring of either
/// → open the widget and click the matching option.
pub async fn select_option(
    driver: &Arc<dyn PageDriver>,
    css: &str,
    value_or_label: &str,
    warnings: &mut Vec<String>,
) -> Result<(), ActionError> {
    let quoted = quote(css);
    let wanted = quote(value_or_label);

    // One in-page pass tries value, exact label, then substring. It reports
    // which rung matched so the fallback warning is precise.
    let matched = driver
        .evaluate(&format!(
            r#"(() => {{
                const el = document.querySelector({quoted});
                if (!el || !el.options) return null;
                const wanted = {wanted};
                const pick = (index) => {{
                    el.selectedIndex = index;
                    el.dispatchEvent(new Event("input", {{ bubbles: true }}));
                    el.dispatchEvent(new Event("change", {{ bubbles: true }}));
                }};
                const options = Array.from(el.options);
                let at = options.findIndex((o) => o.value === wanted);
                if (at >= 0) {{ pick(at); return "value"; }}
                at = options.findIndex((o) => (o.textContent || "").trim() === wanted);
                if (at >= 0) {{ pick(at); return "label"; }}
                at = options.findIndex((o) =>
                    o.value.includes(wanted) || (o.textContent || "").includes(wanted));
                if (at >= 0) {{ pick(at); return "substring"; }}
                return "none";
            }})()"#
        ))
        .await?;

    match matched.as_str() {
        Some("value") => return Ok(()),
        Some("label") => {
            warnings.push(format!(
                "select: no option with value '{value_or_label}' on {css}; matched by label"
            ));
            return Ok(());
        }
        Some("substring") => {
            warnings.push(format!(
                "select: matched '{value_or_label}' by substring on {css}"
            ));
            return Ok(());
        }
        Some("none") => {
            return Err(ActionError::OptionNotFound(format!(
                "'{value_or_label}' not among the options of {css}"
            )))
        }
        _ => {
            debug!(target: "page-interactions", css, "not a native select; trying open-and-click");
            warnings.push(format!(
                "select: {css} is not a native select; opening and clicking the option"
            ));
        }
    }

    // Custom widget rung: open it, then click the option whose text matches.
    driver.click_css(css).await?;
    let clicked = driver
        .evaluate(&format!(
            r#"(() => {{
                const wanted = {wanted};
                const options = document.querySelectorAll(
                    "[role='option'], li, .option, .dropdown-item");
                for (const option of options) {{
                    const text = ((option.innerText || "") + "").trim();
                    if (text === wanted || text.includes(wanted)) {{
                        option.click();
                        return true;
                    }}
                }}
                return false;
            }})()"#
        ))
        .await?;

    if clicked == Value::Bool(true) {
        Ok(())
    } else {
        Err(ActionError::OptionNotFound(format!(
            "'{value_or_label}' not found after opening {css}"
        )))
    }
}
