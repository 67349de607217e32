//! Centralized retry policy applied around every collaborator invocation.

use std::time::Duration;

use rand::Rng;

use crate::error::NodeError;

/// How the wait between attempts grows.
#[derive(Debug, Clone)]
pub enum Backoff {
    Fixed,
    Exponential { multiplier: f64 },
}

/// Bounded retry with backoff for transient collaborator failures.
///
/// Only errors whose `is_retryable()` holds are retried; a `retry_after`
/// hint from a rate-limit response overrides the computed interval.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, counting the first.
    pub max_attempts: u32,
    pub base_interval_ms: u64,
    pub backoff: Backoff,
    pub max_interval_ms: u64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_interval_ms: 500,
            backoff: Backoff::Exponential { multiplier: 2.0 },
            max_interval_ms: 30_000,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            base_interval_ms: 0,
            backoff: Backoff::Fixed,
            max_interval_ms: 0,
            jitter: false,
        }
    }

    /// Delay before the next attempt after failure number `attempt`
    /// (1-based), or `None` when the error is not retryable or attempts are
    /// exhausted.
    pub fn next_delay(&self, attempt: u32, error: &NodeError) -> Option<Duration> {
        if attempt >= self.max_attempts || !error.is_retryable() {
            return None;
        }

        if let Some(secs) = error.retry_after_secs() {
            return Some(Duration::from_secs(secs));
        }

        let interval = match self.backoff {
            Backoff::Fixed => self.base_interval_ms,
            Backoff::Exponential { multiplier } => {
                let factor = multiplier.powi(attempt.saturating_sub(1) as i32);
                (self.base_interval_ms as f64 * factor) as u64
            }
        };
        let mut interval = interval.min(self.max_interval_ms);

        if self.jitter && interval > 1 {
            // Half fixed, half random: spreads simultaneous retries apart.
            let half = interval / 2;
            interval = half + rand::thread_rng().gen_range(0..=half);
        }

        Some(Duration::from_millis(interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::CollaboratorError;

    fn retryable() -> NodeError {
        NodeError::Collaborator(CollaboratorError::Timeout)
    }

    fn plain_policy(backoff: Backoff) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            base_interval_ms: 100,
            backoff,
            max_interval_ms: 10_000,
            jitter: false,
        }
    }

    #[test]
    fn test_fixed_backoff() {
        let policy = plain_policy(Backoff::Fixed);
        assert_eq!(
            policy.next_delay(1, &retryable()),
            Some(Duration::from_millis(100))
        );
        assert_eq!(
            policy.next_delay(3, &retryable()),
            Some(Duration::from_millis(100))
        );
    }

    #[test]
    fn test_exponential_backoff() {
        let policy = plain_policy(Backoff::Exponential { multiplier: 2.0 });
        assert_eq!(
            policy.next_delay(1, &retryable()),
            Some(Duration::from_millis(100))
        );
        assert_eq!(
            policy.next_delay(2, &retryable()),
            Some(Duration::from_millis(200))
        );
        assert_eq!(
            policy.next_delay(3, &retryable()),
            Some(Duration::from_millis(400))
        );
    }

    #[test]
    fn test_backoff_capped_at_max_interval() {
        let mut policy = plain_policy(Backoff::Exponential { multiplier: 10.0 });
        policy.max_interval_ms = 500;
        assert_eq!(
            policy.next_delay(3, &retryable()),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_attempts_exhausted() {
        let policy = plain_policy(Backoff::Fixed);
        assert_eq!(policy.next_delay(4, &retryable()), None);
        assert_eq!(policy.next_delay(5, &retryable()), None);
    }

    #[test]
    fn test_non_retryable_error_not_retried() {
        let policy = plain_policy(Backoff::Fixed);
        let err = NodeError::Collaborator(CollaboratorError::InvalidResponse("bad".into()));
        assert_eq!(policy.next_delay(1, &err), None);

        let err = NodeError::ExecutionError("deterministic".into());
        assert_eq!(policy.next_delay(1, &err), None);
    }

    #[test]
    fn test_retry_after_overrides_interval() {
        let policy = plain_policy(Backoff::Fixed);
        let err = NodeError::Collaborator(CollaboratorError::RateLimited {
            retry_after: Some(7),
        });
        assert_eq!(policy.next_delay(1, &err), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_jitter_stays_within_interval() {
        let policy = RetryPolicy {
            max_attempts: 2,
            base_interval_ms: 1000,
            backoff: Backoff::Fixed,
            max_interval_ms: 10_000,
            jitter: true,
        };
        for _ in 0..50 {
            let delay = policy.next_delay(1, &retryable()).unwrap();
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_none_policy_never_retries() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.next_delay(1, &retryable()), None);
    }
}
