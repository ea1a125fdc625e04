// ── Reconnect policy ──
//
// Opt-in only: with no `ReconnectConfig` the supervisor never retries.

use std::time::Duration;

/// Exponential backoff configuration for push reconnection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum consecutive reconnection attempts before giving up.
    /// `None` means retry until the session ends.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: Some(5),
        }
    }
}

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 +- 0.25)`
///
/// The jitter is deterministic in the attempt number so tests can reason
/// about bounds without a random source.
pub(crate) fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config_is_bounded() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert_eq!(config.max_retries, Some(5));
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        // Jitter factor tops out at 1.25
        assert!(
            d10 <= Duration::from_millis(12_500),
            "delay at attempt 10 ({d10:?}) should be capped near max_delay"
        );
    }

    #[test]
    fn huge_attempt_counts_do_not_overflow() {
        let config = ReconnectConfig::default();
        let d = calculate_backoff(u32::MAX, &config);
        assert!(d <= Duration::from_millis(37_500));
    }
}
