//! Per-run configuration, read from the request's `config` map.

use serde_json::{Map, Value};

#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Budget per interaction.
    pub action_timeout_ms: u64,
    /// Budget per navigation.
    pub navigation_timeout_ms: u64,
    /// Budget per explicit wait.
    pub wait_timeout_ms: u64,
    /// Budget per stabilization pass.
    pub stabilize_timeout_ms: u64,
    /// Ceiling for implicit waits inserted after index-addressed clicks.
    pub post_interaction_wait_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub retry_backoff_max_ms: u64,
    pub retry_jitter_ms: u64,
    /// Stop the run at the first failed step (the default) or keep going.
    pub stop_on_failure: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            action_timeout_ms: 10_000,
            navigation_timeout_ms: 30_000,
            wait_timeout_ms: 10_000,
            stabilize_timeout_ms: 2_000,
            post_interaction_wait_ms: 3_000,
            max_retries: 3,
            retry_backoff_base_ms: 500,
            retry_backoff_max_ms: 5_000,
            retry_jitter_ms: 1_000,
            stop_on_failure: true,
        }
    }
}

impl RunConfig {
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let mut config = Self::default();
        let read_u64 = |key: &str, slot: &mut u64| {
            if let Some(value) = map.get(key).and_then(Value::as_u64) {
                *slot = value;
            }
        };
        read_u64("action_timeout_ms", &mut config.action_timeout_ms);
        read_u64("navigation_timeout_ms", &mut config.navigation_timeout_ms);
        read_u64("wait_timeout_ms", &mut config.wait_timeout_ms);
        read_u64("stabilize_timeout_ms", &mut config.stabilize_timeout_ms);
        read_u64("post_interaction_wait_ms", &mut config.post_interaction_wait_ms);
        read_u64("retry_backoff_base_ms", &mut config.retry_backoff_base_ms);
        read_u64("retry_backoff_max_ms", &mut config.retry_backoff_max_ms);
        read_u64("retry_jitter_ms", &mut config.retry_jitter_ms);
        if let Some(value) = map.get("max_retries").and_then(Value::as_u64) {
            config.max_retries = value as u32;
        }
        if let Some(value) = map.get("stop_on_failure").and_then(Value::as_bool) {
            config.stop_on_failure = value;
        }
        config
    }

    /// Timeout for implicit waits inserted by plan augmentation.
    pub fn implicit_wait_ms(&self) -> u64 {
        self.wait_timeout_ms.min(self.post_interaction_wait_ms)
    }
}
