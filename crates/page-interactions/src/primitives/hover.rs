//! Hover primitive.

use std::sync::Arc;

use cdp_bridge::PageDriver;
use serde_json::Value;
use tracing::debug;

use crate::errors::ActionError;
use crate::primitives::quote;

/// Hover the element at `css`.
///
/// Ladder: native hover → JS `mouseover`/`mouseenter` dispatch → raw mouse
/// move to the bbox center.
pub async fn hover(
    driver: &Arc<dyn PageDriver>,
    css: &str,
    warnings: &mut Vec<String>,
) -> Result<(), ActionError> {
    match driver.hover_css(css).await {
        Ok(()) => return Ok(()),
        Err(err) => {
            debug!(target: "page-interactions", %err, css, "native hover failed");
            warnings.push(format!("hover: native hover failed on {css}; dispatching JS events"));
        }
    }

    let quoted = quote(css);
    let dispatched = driver
        .evaluate(&format!(
            r#"(() => {{
                const el = document.querySelector({quoted});
                if (!el) return false;
                for (const kind of ["mouseover", "mouseenter"]) {{
                    el.dispatchEvent(new MouseEvent(kind, {{ bubbles: kind === "mouseover" }}));
                }}
                return true;
            }})()"#
        ))
        .await?;
    if dispatched == Value::Bool(true) {
        return Ok(());
    }
    warnings.push(format!("hover: JS dispatch found nothing at {css}; moving mouse to center"));

    let center = driver
        .evaluate(&format!(
            r#"(() => {{
                const el = document.querySelector({quoted});
                if (!el) return null;
                const rect = el.getBoundingClientRect();
                return [rect.x + rect.width / 2, rect.y + rect.height / 2];
            }})()"#
        ))
        .await?;
    match center.as_array().filter(|c| c.len() == 2) {
        Some(coords) => {
            let x = coords[0].as_f64().unwrap_or(0.0);
            let y = coords[1].as_f64().unwrap_or(0.0);
            driver.mouse_move(x, y).await?;
            Ok(())
        }
        None => Err(ActionError::ElementNotFound(format!(
            "nothing to hover at {css}"
        ))),
    }
}
