//! Service configuration, read from the environment.

use std::path::PathBuf;

use cdp_bridge::BridgeConfig;

#[derive(Clone, Debug)]
pub struct Config {
    /// Port of the session service (session lifecycle + shared browser).
    pub session_port: u16,
    /// Port of the automation service (page introspection + execute-dsl).
    pub automation_port: u16,
    /// Model name handed to the planner when the caller names none.
    pub default_model: String,
    /// Ceiling on planner rounds per session.
    pub max_steps: u32,
    /// Root directory for per-run artifacts.
    pub runs_root: PathBuf,
    /// Optional navigation allowlist (comma-separated domains).
    pub allowed_domains: Vec<String>,
    /// Shared browser connector settings.
    pub bridge: BridgeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_port: 7000,
            automation_port: 7001,
            default_model: "gemini-2.0-flash".to_string(),
            max_steps: 30,
            runs_root: PathBuf::from("runs"),
            allowed_domains: Vec::new(),
            bridge: BridgeConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self {
            bridge: BridgeConfig::from_env(),
            ..Self::default()
        };

        if let Some(port) = env_parse::<u16>("SESSION_PORT") {
            config.session_port = port;
        }
        if let Some(port) = env_parse::<u16>("AUTOMATION_PORT") {
            config.automation_port = port;
        }
        if let Ok(model) = std::env::var("DEFAULT_MODEL") {
            if !model.trim().is_empty() {
                config.default_model = model.trim().to_string();
            }
        }
        if let Some(max_steps) = env_parse::<u32>("MAX_STEPS") {
            config.max_steps = max_steps;
        }
        if let Ok(dir) = std::env::var("WEBPILOT_RUNS_DIR") {
            if !dir.trim().is_empty() {
                config.runs_root = PathBuf::from(dir.trim());
            }
        }
        if let Ok(domains) = std::env::var("ALLOWED_DOMAINS") {
            config.allowed_domains = domains
                .split(',')
                .map(str::trim)
                .filter(|domain| !domain.is_empty())
                .map(str::to_string)
                .collect();
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.session_port, 7000);
        assert_eq!(config.automation_port, 7001);
        assert_eq!(config.max_steps, 30);
        assert!(config.allowed_domains.is_empty());
    }
}
