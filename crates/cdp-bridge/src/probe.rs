//! Candidate probing against the DevTools `/json/version` endpoint.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::endpoints::rewrite_websocket;
use crate::error::BridgeError;

/// A candidate that answered the version probe.
#[derive(Clone, Debug)]
pub struct ProbeOutcome {
    /// The normalized HTTP endpoint that responded.
    pub endpoint: String,
    /// Websocket debugger URL, already rewritten against the endpoint.
    pub websocket_url: String,
    /// Browser build string, when the endpoint reported one.
    pub browser: Option<String>,
}

#[derive(Deserialize)]
struct VersionPayload {
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: Option<String>,
    #[serde(rename = "Browser")]
    browser: Option<String>,
}

/// Poll the candidates in order until one answers `/json/version` with 200.
///
/// Each attempt has `probe_timeout`; attempts are spaced `probe_interval`
/// apart and the whole pass gives up after `probe_budget`. The returned
/// websocket URL has loopback hosts rewritten to the winning candidate.
pub async fn probe_candidates(
    config: &BridgeConfig,
    candidates: &[String],
) -> Result<ProbeOutcome, BridgeError> {
    let client = reqwest::Client::builder()
        .timeout(config.probe_timeout)
        .build()
        .map_err(|err| BridgeError::Connection(err.to_string()))?;

    let deadline = tokio::time::Instant::now() + config.probe_budget;

    loop {
        for candidate in candidates {
            match probe_one(&client, candidate).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) => {
                    debug!(target: "cdp-bridge", candidate = %candidate, %err, "probe attempt failed");
                }
            }
        }

        if tokio::time::Instant::now() + config.probe_interval >= deadline {
            warn!(
                target: "cdp-bridge",
                candidates = ?candidates,
                "no CDP candidate became reachable within budget"
            );
            return Err(BridgeError::unavailable(candidates.to_vec()));
        }
        tokio::time::sleep(config.probe_interval).await;
    }
}

async fn probe_one(client: &reqwest::Client, candidate: &str) -> Result<ProbeOutcome, String> {
    // ws:// candidates cannot be probed over HTTP; accept them as-is.
    if candidate.starts_with("ws://") || candidate.starts_with("wss://") {
        return Ok(ProbeOutcome {
            endpoint: candidate.to_string(),
            websocket_url: candidate.to_string(),
            browser: None,
        });
    }

    let version_url = format!("{candidate}/json/version");
    let response = client
        .get(&version_url)
        .send()
        .await
        .map_err(|err| err.to_string())?;

    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }

    let payload: VersionPayload = response.json().await.map_err(|err| err.to_string())?;
    let raw_ws = payload
        .web_socket_debugger_url
        .unwrap_or_else(|| candidate.to_string());

    Ok(ProbeOutcome {
        endpoint: candidate.to_string(),
        websocket_url: rewrite_websocket(candidate, &raw_ws),
        browser: payload.browser,
    })
}

/// Probe with a one-shot budget, used by warmup requests that must answer
/// quickly instead of blocking a viewer for the full budget.
pub async fn probe_once(
    config: &BridgeConfig,
    candidates: &[String],
) -> Result<ProbeOutcome, BridgeError> {
    let short = BridgeConfig {
        probe_budget: config.probe_timeout + Duration::from_millis(50),
        ..config.clone()
    };
    probe_candidates(&short, candidates).await
}
