//! Retry strategies and backoff policies shared by every network-facing
//! component of nsyte (relay publication, blob upload, server probing).
//!
//! This crate is deliberately protocol-agnostic: it knows nothing about
//! relays, servers, or events. Callers classify their own errors into
//! [`ErrorClass`] and ask this crate for a delay; async callers drive the
//! sleep themselves (`tokio::time::sleep(calculate_delay(..))`) since this
//! crate has no opinion on runtime.
//!
//! # Example
//!
//! ```
//! use nsyte_retry::{RetryPolicy, calculate_delay};
//!
//! let config = RetryPolicy::Default.to_config();
//! let delay = calculate_delay(&config, 2);
//! println!("retry after: {:?}", delay);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Strategy type for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategyType {
    /// No delay between retries - retry immediately.
    Immediate,
    /// Exponential backoff: delay doubles each attempt (default).
    #[default]
    Exponential,
    /// Linear backoff: delay increases linearly each attempt.
    Linear,
    /// Constant delay: same delay every attempt.
    Constant,
}

/// Predefined retry policies with sensible defaults for different call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Balanced behavior, used by the blob uploader and availability prober
    /// (spec: base 1s, factor 2, capped at 2 retries).
    #[default]
    Default,
    /// Fewer attempts, used for relay publication (one retry budget).
    Conservative,
    /// Fully custom configuration.
    Custom,
}

impl RetryPolicy {
    /// Get the default retry configuration for this policy.
    pub fn to_config(&self) -> RetryStrategyConfig {
        match self {
            RetryPolicy::Default => RetryStrategyConfig {
                strategy: RetryStrategyType::Exponential,
                max_attempts: 3, // 1 initial try + 2 retries, per spec 4.E/4.G
                base_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(30),
                jitter: 0.5,
            },
            RetryPolicy::Conservative => RetryStrategyConfig {
                strategy: RetryStrategyType::Exponential,
                max_attempts: 2, // one retry budget, per spec 4.F
                base_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(5),
                jitter: 0.3,
            },
            RetryPolicy::Custom => RetryStrategyConfig::default(),
        }
    }
}

/// Configuration for a retry strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryStrategyConfig {
    /// Strategy type for calculating delay between retries.
    #[serde(default)]
    pub strategy: RetryStrategyType,
    /// Maximum number of attempts (including the first, non-retry, attempt).
    #[serde(default)]
    pub max_attempts: u32,
    /// Base delay for backoff calculations.
    #[serde(default = "default_base_delay")]
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Maximum delay cap for backoff.
    #[serde(default = "default_max_delay")]
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Jitter factor for randomized delays (0.0 = no jitter, 1.0 = full jitter).
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_jitter() -> f64 {
    0.5
}

impl Default for RetryStrategyConfig {
    fn default() -> Self {
        Self {
            strategy: RetryStrategyType::Exponential,
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: 0.5,
        }
    }
}

/// Error classification for retry decisions. Deliberately coarser than the
/// protocol-level `NsyteError` taxonomy in `nsyte-types` — callers map their
/// richer error types down to one of these three buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Error is transient and should be retried (network error, 5xx).
    #[default]
    Retryable,
    /// Outcome is unknown; treated like retryable but callers may re-check
    /// authoritative state before giving up.
    Ambiguous,
    /// Error is permanent and should not be retried (4xx other than a
    /// recognized authoritative response, auth failure).
    Permanent,
}

/// Calculate the delay for the next retry attempt based on the strategy
/// configuration.
///
/// `attempt` is 1-indexed: `attempt = 1` is the delay before the *first*
/// retry (i.e. after the initial attempt has already failed once).
pub fn calculate_delay(config: &RetryStrategyConfig, attempt: u32) -> Duration {
    let delay = match config.strategy {
        RetryStrategyType::Immediate => Duration::ZERO,
        RetryStrategyType::Exponential => {
            let pow = attempt.saturating_sub(1).min(16);
            config.base_delay.saturating_mul(2_u32.saturating_pow(pow))
        }
        RetryStrategyType::Linear => config.base_delay.saturating_mul(attempt),
        RetryStrategyType::Constant => config.base_delay,
    };

    let capped = delay.min(config.max_delay);

    if config.jitter > 0.0 {
        apply_jitter(capped, config.jitter)
    } else {
        capped
    }
}

/// Apply jitter to a delay value. Jitter factor of 0.5 means delay * (0.5 to 1.5).
fn apply_jitter(delay: Duration, jitter: f64) -> Duration {
    use rand::Rng;

    let jitter_range = 2.0 * jitter;
    let mut rng = rand::thread_rng();
    let random_value: f64 = rng.r#gen();
    let random_factor = 1.0 - jitter + (random_value * jitter_range);
    let millis = (delay.as_millis() as f64 * random_factor).round() as u64;
    Duration::from_millis(millis)
}

/// A retry executor that runs a fallible, synchronous operation with
/// configured retry behavior. Async callers (the uploader, the prober, the
/// publisher) drive their own loop with [`calculate_delay`] instead, since
/// this crate does not depend on any particular async runtime.
pub struct RetryExecutor {
    config: RetryStrategyConfig,
}

impl RetryExecutor {
    /// Create a new retry executor with the given configuration.
    pub fn new(config: RetryStrategyConfig) -> Self {
        Self { config }
    }

    /// Create a retry executor from a predefined policy.
    pub fn from_policy(policy: RetryPolicy) -> Self {
        Self::new(policy.to_config())
    }

    /// Execute a fallible operation with retry behavior.
    ///
    /// The operation receives the current attempt number (starting at 1).
    pub fn run<T, E, F>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Result<T, E>,
    {
        let mut attempt = 1;

        loop {
            match operation(attempt) {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if attempt >= self.config.max_attempts {
                        return Err(e);
                    }

                    let delay = calculate_delay(&self.config, attempt);
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_spec_4e_4g() {
        let config = RetryPolicy::Default.to_config();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay, Duration::from_secs(1));
    }

    #[test]
    fn conservative_policy_matches_spec_4f() {
        let config = RetryPolicy::Conservative.to_config();
        assert_eq!(config.max_attempts, 2);
    }

    #[test]
    fn calculate_delay_exponential() {
        let config = RetryStrategyConfig {
            strategy: RetryStrategyType::Exponential,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: 0.0,
            max_attempts: 10,
        };

        assert_eq!(calculate_delay(&config, 1), Duration::from_secs(1));
        assert_eq!(calculate_delay(&config, 2), Duration::from_secs(2));
        assert_eq!(calculate_delay(&config, 3), Duration::from_secs(4));
        assert_eq!(calculate_delay(&config, 10), Duration::from_secs(60));
    }

    #[test]
    fn calculate_delay_capped_at_max() {
        let config = RetryStrategyConfig {
            strategy: RetryStrategyType::Exponential,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(30),
            jitter: 0.0,
            max_attempts: 10,
        };

        assert_eq!(calculate_delay(&config, 1), Duration::from_secs(10));
        assert_eq!(calculate_delay(&config, 2), Duration::from_secs(20));
        assert_eq!(calculate_delay(&config, 3), Duration::from_secs(30));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let config = RetryStrategyConfig {
            strategy: RetryStrategyType::Constant,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(60),
            jitter: 0.5,
            max_attempts: 10,
        };

        for _ in 0..200 {
            let delay = calculate_delay(&config, 1);
            assert!(delay >= Duration::from_millis(5000));
            assert!(delay <= Duration::from_millis(15000));
        }
    }

    #[test]
    fn backoff_is_monotonically_non_decreasing_without_jitter() {
        let config = RetryStrategyConfig {
            strategy: RetryStrategyType::Exponential,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            jitter: 0.0,
            max_attempts: 8,
        };

        let mut last = Duration::ZERO;
        for attempt in 1..=8 {
            let delay = calculate_delay(&config, attempt);
            assert!(delay >= last, "attempt {attempt} regressed: {delay:?} < {last:?}");
            last = delay;
        }
    }

    #[test]
    fn concurrent_retries_do_not_align_exactly() {
        let config = RetryStrategyConfig {
            strategy: RetryStrategyType::Exponential,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: 0.5,
            max_attempts: 3,
        };

        let samples: Vec<Duration> = (0..16).map(|_| calculate_delay(&config, 2)).collect();
        assert!(samples.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn retry_executor_succeeds_after_retries() {
        let executor = RetryExecutor::new(RetryStrategyConfig {
            strategy: RetryStrategyType::Immediate,
            max_attempts: 5,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: 0.0,
        });

        let mut attempts = 0;
        let result = executor.run(|attempt| {
            attempts = attempt;
            if attempt < 3 { Err("transient") } else { Ok("ok") }
        });

        assert_eq!(result, Ok("ok"));
        assert_eq!(attempts, 3);
    }

    #[test]
    fn retry_executor_gives_up_after_max_attempts() {
        let executor = RetryExecutor::new(RetryStrategyConfig {
            strategy: RetryStrategyType::Immediate,
            max_attempts: 2,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: 0.0,
        });

        let result = executor.run(|_| Err::<&str, _>("permanent"));
        assert_eq!(result, Err("permanent"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn delay_never_exceeds_max(base_ms in 1u64..10_000, max_ms in 100u64..300_000, attempt in 1u32..64) {
            let config = RetryStrategyConfig {
                strategy: RetryStrategyType::Exponential,
                base_delay: Duration::from_millis(base_ms),
                max_delay: Duration::from_millis(max_ms),
                jitter: 0.0,
                max_attempts: 64,
            };
            let delay = calculate_delay(&config, attempt);
            prop_assert!(delay <= config.max_delay);
        }

        #[test]
        fn immediate_strategy_always_zero(attempt in 1u32..64, jitter in 0.0f64..1.0) {
            let config = RetryStrategyConfig {
                strategy: RetryStrategyType::Immediate,
                base_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(60),
                jitter,
                max_attempts: 64,
            };
            prop_assert_eq!(calculate_delay(&config, attempt), Duration::ZERO);
        }
    }
}
