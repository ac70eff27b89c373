//! Connector configuration.

use std::time::Duration;

/// Recognized environment variables naming CDP endpoints, highest
/// precedence first.
pub const ENDPOINT_ENV_VARS: [&str; 3] = ["VNC_CDP_URL", "BROWSER_USE_CDP_URL", "CDP_URL"];

/// Hardcoded fallbacks appended after any configured endpoints.
pub const DEFAULT_CANDIDATES: [&str; 3] = ["127.0.0.1:9222", "localhost:9222", "vnc:9222"];

#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Explicit endpoint candidates, tried before the defaults.
    pub configured_endpoints: Vec<String>,
    /// When true (the default) a missing shared browser is a hard failure.
    /// The connector never launches a local Chromium either way.
    pub require_shared_browser: bool,
    /// URL the page is parked on between sessions; never restored after a
    /// reconnect.
    pub default_url: String,
    /// Per-probe HTTP timeout against `/json/version`.
    pub probe_timeout: Duration,
    /// Interval between probe attempts.
    pub probe_interval: Duration,
    /// Total budget for one pass over the candidate list.
    pub probe_budget: Duration,
    /// Navigation timeout used when restoring the last URL after recreate.
    pub navigation_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            configured_endpoints: Vec::new(),
            require_shared_browser: true,
            default_url: "about:blank".to_string(),
            probe_timeout: Duration::from_secs(2),
            probe_interval: Duration::from_millis(250),
            probe_budget: Duration::from_secs(6),
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

impl BridgeConfig {
    /// Read configured endpoints from the recognized environment variables
    /// in precedence order. Empty values are skipped.
    pub fn from_env() -> Self {
        let mut configured = Vec::new();
        for name in ENDPOINT_ENV_VARS {
            if let Ok(value) = std::env::var(name) {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    configured.push(trimmed.to_string());
                }
            }
        }

        let require_shared_browser = std::env::var("REQUIRE_SHARED_BROWSER")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);

        let default_url = std::env::var("DEFAULT_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "about:blank".to_string());

        let navigation_timeout = std::env::var("NAVIGATION_TIMEOUT")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(30));

        Self {
            configured_endpoints: configured,
            require_shared_browser,
            default_url,
            navigation_timeout,
            ..Self::default()
        }
    }
}
