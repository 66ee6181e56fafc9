//! Retry with bounded exponential backoff for provider I/O.
//!
//! Retries live at the provider boundary only: a provider either eventually
//! returns success or surfaces a terminal error. The pipeline engine itself
//! never retries.

use std::time::Duration;

use tracing::debug;

/// Backoff policy for transient provider failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Base delay; attempt `n` sleeps `base * 2^(n-1)`, capped at `max_delay`.
    pub base_delay: Duration,
    /// Upper bound on any single sleep.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Retry a fallible operation with exponential backoff.
///
/// `is_retryable` decides whether a given failure is transient. Returns the
/// first success, or the final error once retries are exhausted or the error
/// is terminal.
pub fn retry_with_backoff<T, E: std::fmt::Display>(
    label: &str,
    policy: RetryPolicy,
    mut is_retryable: impl FnMut(&E) -> bool,
    mut attempt_fn: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(value) => return Ok(value),
            Err(error) if attempt < policy.max_retries && is_retryable(&error) => {
                attempt += 1;
                let delay = policy.backoff(attempt);
                debug!(
                    "{label}: attempt {attempt}/{max} failed: {error}, retrying in {delay:?}",
                    max = policy.max_retries
                );
                std::thread::sleep(delay);
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn returns_first_success() {
        let calls = Cell::new(0u32);
        let result: Result<u32, String> = retry_with_backoff("test", fast_policy(), |_| true, || {
            calls.set(calls.get() + 1);
            Ok(7)
        });
        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retries_transient_then_succeeds() {
        let calls = Cell::new(0u32);
        let result: Result<u32, String> = retry_with_backoff("test", fast_policy(), |_| true, || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err("transient".to_string())
            } else {
                Ok(1)
            }
        });
        assert_eq!(result, Ok(1));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn terminal_errors_do_not_retry() {
        let calls = Cell::new(0u32);
        let result: Result<u32, String> =
            retry_with_backoff("test", fast_policy(), |_| false, || {
                calls.set(calls.get() + 1);
                Err("terminal".to_string())
            });
        assert_eq!(result, Err("terminal".to_string()));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn exhausts_bounded_retries() {
        let calls = Cell::new(0u32);
        let result: Result<u32, String> = retry_with_backoff("test", fast_policy(), |_| true, || {
            calls.set(calls.get() + 1);
            Err("transient".to_string())
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(300));
        assert_eq!(policy.backoff(8), Duration::from_millis(300));
    }
}
