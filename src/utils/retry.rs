//! Retry utilities: backoff builders.
//!
//! Uses `backon` for exponential backoff with jitter.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::config::ReadSideConfig;

/// Backoff for restarting a failed read-side shard consumer.
///
/// Defaults: 100ms doubling up to 10s over 10 attempts, with jitter.
pub fn read_side_backoff(config: &ReadSideConfig) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(config.min_backoff_ms))
        .with_max_delay(Duration::from_millis(config.max_backoff_ms))
        .with_max_times(config.max_backoff_retries)
        .with_jitter()
}
