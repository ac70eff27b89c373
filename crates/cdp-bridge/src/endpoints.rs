//! CDP endpoint candidate assembly and websocket URL rewriting.
//!
//! Chromium reports DevTools websocket URLs that point at `127.0.0.1` even
//! when the browser is exposed under a different hostname. When the broker
//! runs in a sibling container that loopback address is unreachable, so the
//! host portion is rewritten to match the candidate that answered the probe.

use url::Url;

use crate::config::{BridgeConfig, DEFAULT_CANDIDATES};

const LOOPBACK_HOSTS: [&str; 4] = ["127.0.0.1", "localhost", "::1", "0.0.0.0"];

/// Build the ordered candidate list: configured endpoints first, then the
/// loopback/container defaults. Duplicates (after normalization) are kept
/// only once, preserving first position.
pub fn candidate_endpoints(config: &BridgeConfig, extra: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |raw: &str| {
        if let Some(normalized) = normalize_endpoint(raw) {
            if !out.contains(&normalized) {
                out.push(normalized);
            }
        }
    };

    for candidate in extra {
        push(candidate);
    }
    for candidate in &config.configured_endpoints {
        push(candidate);
    }
    for candidate in DEFAULT_CANDIDATES {
        push(candidate);
    }
    out
}

/// Normalize a raw endpoint into `scheme://host:port` form.
///
/// Bare `host:port` gains an `http://` scheme, protocol-relative `//host`
/// likewise, and `ws://`/`wss://` values are kept as-is. Trailing slashes
/// are trimmed so candidates compare equal regardless of how they were
/// written.
pub fn normalize_endpoint(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let with_scheme = if let Some(rest) = trimmed.strip_prefix("//") {
        format!("http://{rest}")
    } else if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let parsed = Url::parse(&with_scheme).ok()?;
    match parsed.scheme() {
        "http" | "https" | "ws" | "wss" => {}
        _ => return None,
    }
    parsed.host_str()?;

    Some(with_scheme.trim_end_matches('/').to_string())
}

/// Rewrite the websocket URL Chromium reported against the candidate that
/// answered the probe.
///
/// Loopback and empty hosts are replaced by the candidate's authority while
/// scheme (`http`→`ws`, `https`→`wss`), port, path, query and fragment are
/// preserved. Relative or path-only values are resolved against the
/// candidate. Applying the rewrite twice is a no-op.
pub fn rewrite_websocket(candidate: &str, websocket_url: &str) -> String {
    let base = candidate.trim();
    let ws = websocket_url.trim();
    if ws.is_empty() {
        return ws_from_http(base);
    }

    // Path-only values ("/devtools/browser/abc") hang off the candidate.
    if ws.starts_with('/') && !ws.starts_with("//") {
        let authority = candidate_authority(base);
        if authority.is_empty() {
            return ws.to_string();
        }
        return format!("ws://{authority}{ws}");
    }

    let parsed = match Url::parse(ws) {
        Ok(parsed) => parsed,
        Err(_) => return ws_from_http(base),
    };

    let scheme = match parsed.scheme() {
        "http" => "ws",
        "https" => "wss",
        "ws" => "ws",
        "wss" => "wss",
        _ => return ws.to_string(),
    };

    let host_is_loopback = parsed
        .host_str()
        .map(|h| LOOPBACK_HOSTS.contains(&h))
        .unwrap_or(true);

    let authority = if host_is_loopback {
        let replacement = candidate_authority(base);
        if replacement.is_empty() {
            original_authority(&parsed)
        } else {
            replacement
        }
    } else {
        original_authority(&parsed)
    };

    let mut rebuilt = format!("{scheme}://{authority}{}", parsed.path());
    if let Some(query) = parsed.query() {
        rebuilt.push('?');
        rebuilt.push_str(query);
    }
    if let Some(fragment) = parsed.fragment() {
        rebuilt.push('#');
        rebuilt.push_str(fragment);
    }
    rebuilt
}

fn candidate_authority(candidate: &str) -> String {
    let normalized = match normalize_endpoint(candidate) {
        Some(normalized) => normalized,
        None => return String::new(),
    };
    match Url::parse(&normalized) {
        Ok(parsed) => original_authority(&parsed),
        Err(_) => String::new(),
    }
}

fn original_authority(parsed: &Url) -> String {
    let host = parsed.host_str().unwrap_or_default();
    match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn ws_from_http(candidate: &str) -> String {
    let authority = candidate_authority(candidate);
    if authority.is_empty() {
        return candidate.to_string();
    }
    format!("ws://{authority}")
}
