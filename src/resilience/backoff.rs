//! Probe delay policies.

use std::time::Duration;

use rand::Rng;

use crate::config::{BackoffPolicy, HealthConfig};

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Delay before the next health probe, given the current run of failures.
///
/// A success (zero failures) always waits the plain interval. Retries are
/// never bounded in count under either policy.
pub fn probe_delay(config: &HealthConfig, consecutive_failures: u32) -> Duration {
    match config.backoff {
        BackoffPolicy::Constant => Duration::from_millis(config.interval_ms),
        BackoffPolicy::Exponential if consecutive_failures == 0 => {
            Duration::from_millis(config.interval_ms)
        }
        BackoffPolicy::Exponential => {
            calculate_backoff(consecutive_failures, config.interval_ms, config.max_delay_ms)
        }
    }
}
