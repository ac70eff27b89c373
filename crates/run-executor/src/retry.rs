//! Retry backoff policy.

use std::time::Duration;

use rand::Rng;

use crate::config::RunConfig;

/// Delay before retry attempt `n` (1-based): exponential from the base,
/// capped, plus additive jitter in `[0, jitter]`.
pub fn backoff_delay(attempt: u32, config: &RunConfig) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let exponential = config
        .retry_backoff_base_ms
        .saturating_mul(1u64 << exponent)
        .min(config.retry_backoff_max_ms);
    let jitter = if config.retry_jitter_ms > 0 {
        rand::thread_rng().gen_range(0..=config.retry_jitter_ms)
    } else {
        0
    };
    Duration::from_millis(exponential + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_stay_inside_the_documented_window() {
        let config = RunConfig::default();
        for attempt in 1..=5u32 {
            for _ in 0..50 {
                let delay = backoff_delay(attempt, &config).as_millis() as u64;
                let floor = (config.retry_backoff_base_ms * (1 << (attempt - 1)))
                    .min(config.retry_backoff_max_ms);
                assert!(delay >= floor, "attempt {attempt}: {delay} < {floor}");
                assert!(
                    delay <= floor + config.retry_jitter_ms,
                    "attempt {attempt}: {delay} > {}",
                    floor + config.retry_jitter_ms
                );
            }
        }
    }

    #[test]
    fn exponential_growth_is_capped() {
        let config = RunConfig {
            retry_jitter_ms: 0,
            ..RunConfig::default()
        };
        assert_eq!(backoff_delay(1, &config), Duration::from_millis(500));
        assert_eq!(backoff_delay(2, &config), Duration::from_millis(1000));
        assert_eq!(backoff_delay(3, &config), Duration::from_millis(2000));
        assert_eq!(backoff_delay(4, &config), Duration::from_millis(4000));
        // Capped at retry_backoff_max_ms from here on.
        assert_eq!(backoff_delay(5, &config), Duration::from_millis(5000));
        assert_eq!(backoff_delay(12, &config), Duration::from_millis(5000));
    }
}
