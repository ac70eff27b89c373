//! Page quiescence helpers.
//!
//! These never raise: a page that refuses to settle is still a page the
//! executor can try to act on, so timeouts are absorbed and logged.

use std::sync::Arc;
use std::time::Duration;

use cdp_bridge::PageDriver;
use serde_json::Value;
use tracing::debug;

/// Loading indicators commonly left in the DOM while content streams in.
const LOADING_INDICATOR_SELECTOR: &str =
    ".spinner, .loading, .loader, [role='progressbar'], [aria-busy='true']";

/// How long the DOM must stay mutation-free to count as idle.
const MUTATION_QUIET_MS: u64 = 300;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug)]
pub struct StabilityBudget {
    pub timeout: Duration,
}

impl Default for StabilityBudget {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
        }
    }
}

impl StabilityBudget {
    pub fn from_millis(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

/// Await network idle, then DOM-mutation idle, then the disappearance of
/// common loading indicators. Absorbs every failure.
pub async fn stabilize_page(driver: &Arc<dyn PageDriver>, budget: StabilityBudget) {
    let deadline = tokio::time::Instant::now() + budget.timeout;

    wait_ready_state(driver, deadline).await;
    wait_mutation_idle(driver, deadline).await;
    wait_indicators_gone(driver, deadline).await;
}

/// After navigation: wait for the first structural landmark to become
/// visible, then stabilize.
pub async fn wait_page_ready(driver: &Arc<dyn PageDriver>, budget: StabilityBudget) {
    let deadline = tokio::time::Instant::now() + budget.timeout;
    let script = r#"(() => {
        for (const tag of ["body", "main", "nav", "header", "footer"]) {
            const el = document.querySelector(tag);
            if (!el) continue;
            const style = window.getComputedStyle(el);
            if (style.display !== "none" && style.visibility !== "hidden") return true;
        }
        return false;
    })()"#;

    loop {
        match driver.evaluate(script).await {
            Ok(Value::Bool(true)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(target: "page-interactions", %err, "ready probe failed");
            }
        }
        if tokio::time::Instant::now() >= deadline {
            debug!(target: "page-interactions", "page ready wait expired");
            break;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    stabilize_page(driver, budget).await;
}

/// `page.content()` with up to 3 retries on navigation races; empty string
/// when every attempt fails.
pub async fn safe_page_content(driver: &Arc<dyn PageDriver>) -> String {
    for attempt in 1..=3u32 {
        match driver.content().await {
            Ok(html) => return html,
            Err(err) => {
                debug!(
                    target: "page-interactions",
                    attempt, %err,
                    "page content read failed"
                );
                tokio::time::sleep(Duration::from_millis(150)).await;
            }
        }
    }
    String::new()
}

async fn wait_ready_state(driver: &Arc<dyn PageDriver>, deadline: tokio::time::Instant) {
    loop {
        match driver.evaluate("document.readyState").await {
            Ok(value) if value.as_str() == Some("complete") => return,
            Ok(_) => {}
            Err(err) => {
                debug!(target: "page-interactions", %err, "readyState probe failed");
                return;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn wait_mutation_idle(driver: &Arc<dyn PageDriver>, deadline: tokio::time::Instant) {
    // The observer is installed once per page and keeps a timestamp of the
    // last DOM mutation; the poll just reads the quiet interval.
    let script = format!(
        r#"(() => {{
            if (!window.__wpMutationObserver) {{
                window.__wpLastMutation = Date.now();
                window.__wpMutationObserver = new MutationObserver(() => {{
                    window.__wpLastMutation = Date.now();
                }});
                window.__wpMutationObserver.observe(document.documentElement, {{
                    childList: true, subtree: true, attributes: true, characterData: true,
                }});
            }}
            return Date.now() - (window.__wpLastMutation || 0) >= {MUTATION_QUIET_MS};
        }})()"#
    );

    loop {
        match driver.evaluate(&script).await {
            Ok(Value::Bool(true)) => return,
            Ok(_) => {}
            Err(err) => {
                debug!(target: "page-interactions", %err, "mutation probe failed");
                return;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn wait_indicators_gone(driver: &Arc<dyn PageDriver>, deadline: tokio::time::Instant) {
    let script = format!(
        r#"(() => {{
            for (const el of document.querySelectorAll("{LOADING_INDICATOR_SELECTOR}")) {{
                const style = window.getComputedStyle(el);
                if (style.display !== "none" && style.visibility !== "hidden") return false;
            }}
            return true;
        }})()"#
    );

    loop {
        match driver.evaluate(&script).await {
            Ok(Value::Bool(true)) => return,
            Ok(_) => {}
            Err(err) => {
                debug!(target: "page-interactions", %err, "loading indicator probe failed");
                return;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_bridge::testing::FakePageDriver;
    use cdp_bridge::DriverError;
    use serde_json::json;

    fn arc(fake: FakePageDriver) -> Arc<dyn PageDriver> {
        Arc::new(fake)
    }

    #[tokio::test]
    async fn stabilize_absorbs_probe_failures() {
        let fake = FakePageDriver::new();
        fake.set_eval_handler(|_| Some(Err(DriverError::Io("boom".into()))));
        // Must return, not panic or error.
        stabilize_page(&arc(fake), StabilityBudget::from_millis(200)).await;
    }

    #[tokio::test]
    async fn stabilize_finishes_fast_on_a_quiet_page() {
        let fake = FakePageDriver::new();
        fake.set_eval_handler(|script| {
            if script.contains("readyState") {
                Some(Ok(json!("complete")))
            } else {
                Some(Ok(json!(true)))
            }
        });
        let started = tokio::time::Instant::now();
        stabilize_page(&arc(fake), StabilityBudget::from_millis(2000)).await;
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn safe_content_retries_then_gives_up_empty() {
        let fake = FakePageDriver::new();
        fake.fail_times(
            "content",
            5,
            DriverError::NavigationRace("navigating".into()),
        );
        let html = safe_page_content(&arc(fake)).await;
        assert_eq!(html, "");
    }

    #[tokio::test]
    async fn safe_content_recovers_within_retries() {
        let fake = FakePageDriver::new();
        fake.set_content("<html><body>ok</body></html>");
        fake.fail_times(
            "content",
            2,
            DriverError::NavigationRace("navigating".into()),
        );
        let html = safe_page_content(&arc(fake)).await;
        assert!(html.contains("ok"));
    }
}
