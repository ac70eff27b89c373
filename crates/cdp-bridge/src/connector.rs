//! The shared Chromium connection.
//!
//! One [`SharedBrowser`] is held for the process lifetime. It attaches to an
//! already-running Chromium over the probed websocket endpoint, keeps the
//! connection loop on a background task, and reconnects on demand when the
//! link dies. It never launches a browser of its own; a missing endpoint is
//! surfaced as [`BridgeError::SharedBrowserUnavailable`].

use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams, DispatchMouseEventType,
    MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::{Page, ScreenshotParams};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::driver::PageDriver;
use crate::endpoints::candidate_endpoints;
use crate::error::{BridgeError, DriverError};
use crate::probe::{probe_candidates, probe_once, ProbeOutcome};

/// Result of a warmup request from an external viewer.
#[derive(Clone, Debug, Serialize)]
pub struct WarmupReport {
    pub ready: bool,
    pub cdp_ready: bool,
    pub active_endpoint: Option<String>,
    pub public_endpoint: Option<String>,
    pub public_websocket: Option<String>,
    pub candidates: Vec<String>,
}

struct Connection {
    _browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    endpoint: String,
    websocket_url: String,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

pub struct SharedBrowser {
    config: BridgeConfig,
    connection: Mutex<Option<Arc<Connection>>>,
    last_url: parking_lot::Mutex<Option<String>>,
}

impl SharedBrowser {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
            last_url: parking_lot::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Probe the candidate list and attach. Fails with
    /// `SharedBrowserUnavailable` when nothing answers within budget.
    pub async fn connect(&self) -> Result<(), BridgeError> {
        let mut guard = self.connection.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        let conn = self.establish().await?;
        *guard = Some(conn);
        Ok(())
    }

    async fn establish(&self) -> Result<Arc<Connection>, BridgeError> {
        let candidates = candidate_endpoints(&self.config, &[]);
        let outcome = match probe_candidates(&self.config, &candidates).await {
            Ok(outcome) => outcome,
            Err(err) => {
                // Even with strict mode off, a missing shared browser is a
                // refusal: this connector never launches a local Chromium
                // behind the caller's back.
                if !self.config.require_shared_browser {
                    warn!(
                        target: "cdp-bridge",
                        "REQUIRE_SHARED_BROWSER is off, but local browser launch is not supported; refusing"
                    );
                }
                return Err(err);
            }
        };
        self.attach(outcome).await
    }

    async fn attach(&self, outcome: ProbeOutcome) -> Result<Arc<Connection>, BridgeError> {
        let (browser, mut handler) = Browser::connect(&outcome.websocket_url)
            .await
            .map_err(|err| BridgeError::Connection(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp-bridge", %err, "connection handler event error");
                }
            }
        });

        let existing = browser
            .pages()
            .await
            .map_err(|err| BridgeError::NoPage(err.to_string()))?
            .into_iter()
            .next();
        let page = match existing {
            Some(page) => page,
            None => browser
                .new_page("about:blank")
                .await
                .map_err(|err| BridgeError::NoPage(err.to_string()))?,
        };

        info!(
            target: "cdp-bridge",
            endpoint = %outcome.endpoint,
            websocket = %outcome.websocket_url,
            "attached to shared browser"
        );

        Ok(Arc::new(Connection {
            _browser: browser,
            page,
            handler_task,
            endpoint: outcome.endpoint,
            websocket_url: outcome.websocket_url,
        }))
    }

    async fn page(&self) -> Result<Page, DriverError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            if !conn.handler_task.is_finished() {
                return Ok(conn.page.clone());
            }
            warn!(target: "cdp-bridge", "connection loop terminated; reconnecting");
            *guard = None;
        }

        let conn = self
            .establish()
            .await
            .map_err(|err| DriverError::Io(err.to_string()))?;
        let page = conn.page.clone();
        *guard = Some(conn);
        Ok(page)
    }

    /// Read-only liveness check: fetch the page title, swallow the value.
    pub async fn is_healthy(&self) -> bool {
        let page = {
            let guard = self.connection.lock().await;
            match guard.as_ref() {
                Some(conn) if !conn.handler_task.is_finished() => conn.page.clone(),
                _ => return false,
            }
        };
        page.get_title().await.is_ok()
    }

    /// Tear the connection down and attach again, then restore the page to
    /// the last non-default URL. Restore failures are logged, not fatal.
    pub async fn recreate(&self) -> Result<(), BridgeError> {
        {
            let mut guard = self.connection.lock().await;
            *guard = None;
        }
        self.connect().await?;

        let restore = self.last_url.lock().clone();
        let restore = match restore {
            Some(url)
                if !url.starts_with("about:") && url != self.config.default_url =>
            {
                url
            }
            _ => return Ok(()),
        };

        for attempt in 1..=3u32 {
            match self
                .navigate(&restore, "load", self.config.navigation_timeout)
                .await
            {
                Ok(()) => {
                    info!(target: "cdp-bridge", url = %restore, attempt, "restored page after reconnect");
                    return Ok(());
                }
                Err(err) => {
                    warn!(target: "cdp-bridge", url = %restore, attempt, %err, "failed to restore page url");
                }
            }
        }
        Ok(())
    }

    /// Warmup entry point for external viewers: probe quickly, attach if
    /// needed, and describe the public endpoints.
    pub async fn ensure(&self, extra_candidates: &[String]) -> Result<WarmupReport, BridgeError> {
        let candidates = candidate_endpoints(&self.config, extra_candidates);
        let outcome = probe_once(&self.config, &candidates).await?;

        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(self.attach(outcome.clone()).await?);
        }
        let conn = match guard.as_ref() {
            Some(conn) => conn,
            None => return Err(BridgeError::Connection("connection lost during warmup".into())),
        };
        Ok(WarmupReport {
            ready: true,
            cdp_ready: true,
            active_endpoint: Some(conn.endpoint.clone()),
            public_endpoint: Some(outcome.endpoint),
            public_websocket: Some(conn.websocket_url.clone()),
            candidates,
        })
    }

    fn remember_url(&self, url: &str) {
        let mut guard = self.last_url.lock();
        *guard = Some(url.to_string());
    }

    fn quote(text: &str) -> String {
        serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
    }
}

fn map_cdp_err(err: CdpError) -> DriverError {
    let text = err.to_string();
    match err {
        CdpError::Timeout => DriverError::Timeout(text),
        CdpError::NotFound => DriverError::TargetNotFound(text),
        CdpError::JavascriptException(_) => DriverError::Script(text),
        _ if text.contains("navigat") => DriverError::NavigationRace(text),
        _ => DriverError::Io(text),
    }
}

fn key_modifier_bit(key: &str) -> Option<i64> {
    match key {
        "Alt" => Some(1),
        "Control" | "Ctrl" => Some(2),
        "Meta" | "Command" => Some(4),
        "Shift" => Some(8),
        _ => None,
    }
}

#[async_trait]
impl PageDriver for SharedBrowser {
    async fn navigate(
        &self,
        url: &str,
        wait_until: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let page = self.page().await?;
        tokio::time::timeout(timeout, page.goto(url))
            .await
            .map_err(|_| DriverError::Timeout(format!("navigation to {url} timed out")))?
            .map_err(map_cdp_err)?;

        // Lifecycle settle: poll readyState rather than trusting the CDP
        // load event, which fires before late redirects on some pages.
        let accept_interactive = wait_until == "domcontentloaded";
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let state = page
                .evaluate("document.readyState")
                .await
                .map_err(map_cdp_err)?;
            let state = state.value().and_then(Value::as_str).unwrap_or("loading");
            if state == "complete" || (accept_interactive && state == "interactive") {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriverError::Timeout(format!(
                    "page did not reach readyState for {url}"
                )));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if wait_until == "networkidle" {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        self.remember_url(url);
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        let page = self.page().await?;
        let result = page.evaluate(script).await.map_err(map_cdp_err)?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn content(&self) -> Result<String, DriverError> {
        let page = self.page().await?;
        page.content().await.map_err(map_cdp_err)
    }

    async fn url(&self) -> Result<String, DriverError> {
        let page = self.page().await?;
        let url = page.url().await.map_err(map_cdp_err)?;
        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn title(&self) -> Result<String, DriverError> {
        let page = self.page().await?;
        let title = page.get_title().await.map_err(map_cdp_err)?;
        Ok(title.unwrap_or_default())
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>, DriverError> {
        let page = self.page().await?;
        page.screenshot(
            ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build(),
        )
        .await
        .map_err(map_cdp_err)
    }

    async fn click_css(&self, css: &str) -> Result<(), DriverError> {
        let page = self.page().await?;
        let element = page.find_element(css).await.map_err(map_cdp_err)?;
        element.scroll_into_view().await.map_err(map_cdp_err)?;
        element.click().await.map_err(map_cdp_err)?;
        Ok(())
    }

    async fn fill_css(&self, css: &str, value: &str) -> Result<(), DriverError> {
        let page = self.page().await?;
        let element = page.find_element(css).await.map_err(map_cdp_err)?;
        element.focus().await.map_err(map_cdp_err)?;

        let quoted = Self::quote(css);
        page.evaluate(format!(
            r#"(() => {{ const el = document.querySelector({quoted}); if (el) el.value = ""; }})()"#
        ))
        .await
        .map_err(map_cdp_err)?;

        element.type_str(value).await.map_err(map_cdp_err)?;
        Ok(())
    }

    async fn type_chars(&self, css: &str, text: &str, delay: Duration) -> Result<(), DriverError> {
        let page = self.page().await?;
        let element = page.find_element(css).await.map_err(map_cdp_err)?;
        element.focus().await.map_err(map_cdp_err)?;
        let mut buffer = [0u8; 4];
        for ch in text.chars() {
            element
                .type_str(ch.encode_utf8(&mut buffer))
                .await
                .map_err(map_cdp_err)?;
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn input_value(&self, css: &str) -> Result<String, DriverError> {
        let quoted = Self::quote(css);
        let value = self
            .evaluate(&format!(
                r#"(() => {{
                    const el = document.querySelector({quoted});
                    if (!el) return null;
                    if (el.isContentEditable) return el.innerText;
                    return el.value ?? "";
                }})()"#
            ))
            .await?;
        match value {
            Value::Null => Err(DriverError::TargetNotFound(css.to_string())),
            Value::String(text) => Ok(text),
            other => Ok(other.to_string()),
        }
    }

    async fn hover_css(&self, css: &str) -> Result<(), DriverError> {
        let page = self.page().await?;
        let element = page.find_element(css).await.map_err(map_cdp_err)?;
        element.scroll_into_view().await.map_err(map_cdp_err)?;
        let point = element.clickable_point().await.map_err(map_cdp_err)?;
        self.mouse_move(point.x, point.y).await
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        let page = self.page().await?;
        let parts: Vec<&str> = key.split('+').filter(|p| !p.is_empty()).collect();
        let mut modifiers = 0i64;
        let mut main_key = key;
        for part in &parts {
            match key_modifier_bit(part) {
                Some(bit) => modifiers |= bit,
                None => main_key = part,
            }
        }

        let down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(main_key.to_string())
            .modifiers(modifiers)
            .build()
            .map_err(DriverError::Script)?;
        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(main_key.to_string())
            .modifiers(modifiers)
            .build()
            .map_err(DriverError::Script)?;

        page.execute(down).await.map_err(map_cdp_err)?;
        page.execute(up).await.map_err(map_cdp_err)?;
        Ok(())
    }

    async fn mouse_move(&self, x: f64, y: f64) -> Result<(), DriverError> {
        let page = self.page().await?;
        let event = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseMoved)
            .x(x)
            .y(y)
            .build()
            .map_err(DriverError::Script)?;
        page.execute(event).await.map_err(map_cdp_err)?;
        Ok(())
    }

    async fn mouse_click(&self, x: f64, y: f64) -> Result<(), DriverError> {
        let page = self.page().await?;
        for kind in [
            DispatchMouseEventType::MousePressed,
            DispatchMouseEventType::MouseReleased,
        ] {
            let event = DispatchMouseEventParams::builder()
                .r#type(kind)
                .x(x)
                .y(y)
                .button(MouseButton::Left)
                .click_count(1)
                .build()
                .map_err(DriverError::Script)?;
            page.execute(event).await.map_err(map_cdp_err)?;
        }
        Ok(())
    }

    async fn scroll_by(&self, dx: f64, dy: f64) -> Result<(), DriverError> {
        self.evaluate(&format!("window.scrollBy({dx}, {dy})"))
            .await
            .map(|_| ())
    }
}
