//! The page driver seam.
//!
//! Everything above the connector (selector resolution, catalog collection,
//! interaction primitives, the run executor) talks to the browser through
//! this trait, so the whole pipeline can be exercised against
//! [`crate::testing::FakePageDriver`] without a Chromium.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DriverError;

/// Desired element state for [`PageDriver::wait_for_selector_state`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SelectorState {
    Attached,
    Detached,
    Visible,
    Hidden,
}

impl SelectorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        }
    }
}

/// Async facade over one browser page.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for the given lifecycle event
    /// (`load` | `domcontentloaded` | `networkidle`).
    async fn navigate(&self, url: &str, wait_until: &str, timeout: Duration)
        -> Result<(), DriverError>;

    /// Evaluate a script in the page and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<Value, DriverError>;

    async fn content(&self) -> Result<String, DriverError>;
    async fn url(&self) -> Result<String, DriverError>;
    async fn title(&self) -> Result<String, DriverError>;
    async fn screenshot_png(&self) -> Result<Vec<u8>, DriverError>;

    /// Native click on the first match of `css`.
    async fn click_css(&self, css: &str) -> Result<(), DriverError>;

    /// Replace the value of the first match of `css`.
    async fn fill_css(&self, css: &str, value: &str) -> Result<(), DriverError>;

    /// Type `text` character by character with `delay` between keystrokes.
    async fn type_chars(&self, css: &str, text: &str, delay: Duration) -> Result<(), DriverError>;

    /// Current value of the first match of `css`.
    async fn input_value(&self, css: &str) -> Result<String, DriverError>;

    async fn hover_css(&self, css: &str) -> Result<(), DriverError>;

    /// Press a key (or `Modifier+Key` combination) at page scope.
    async fn press_key(&self, key: &str) -> Result<(), DriverError>;

    async fn mouse_move(&self, x: f64, y: f64) -> Result<(), DriverError>;

    /// Raw click at viewport coordinates, bypassing actionability checks.
    async fn mouse_click(&self, x: f64, y: f64) -> Result<(), DriverError>;

    async fn scroll_by(&self, dx: f64, dy: f64) -> Result<(), DriverError>;

    /// Poll until the first match of `css` reaches `state`, or time out.
    async fn wait_for_selector_state(
        &self,
        css: &str,
        state: SelectorState,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let quoted = serde_json::to_string(css)
            .map_err(|err| DriverError::Script(err.to_string()))?;
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({quoted});
                if (!el) return "detached";
                const style = window.getComputedStyle(el);
                const hidden = style.display === "none" || style.visibility === "hidden";
                return hidden ? "hidden" : "visible";
            }})()"#
        );

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let observed = self.evaluate(&script).await?;
            let observed = observed.as_str().unwrap_or("detached");
            let satisfied = match state {
                SelectorState::Attached => observed != "detached",
                SelectorState::Detached => observed == "detached",
                SelectorState::Visible => observed == "visible",
                SelectorState::Hidden => observed == "hidden" || observed == "detached",
            };
            if satisfied {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriverError::Timeout(format!(
                    "selector {css} did not reach state {}",
                    state.as_str()
                )));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
