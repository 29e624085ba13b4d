use std::{fmt, sync::Arc, time::Duration};

use reqwest::StatusCode;

/// Status code some gateways use for "overloaded", outside the IANA registry.
pub const SITE_OVERLOADED: u16 = 529;

/// Decides which responses are retried and how long to wait in between.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Total physical attempts, including the first one. Values below 1 act as 1.
    pub max_attempts: usize,
    /// Status codes treated as rate limiting.
    pub retryable_statuses: Vec<u16>,
    /// Lower bound for computed backoff, in milliseconds.
    pub backoff_floor_ms: u64,
    /// Unit multiplied by `2^(attempt + 1)`, in milliseconds.
    pub backoff_unit_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retryable_statuses: vec![StatusCode::TOO_MANY_REQUESTS.as_u16(), SITE_OVERLOADED],
            backoff_floor_ms: 3_000,
            backoff_unit_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes a single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Whether `status` is in the retryable set.
    pub fn is_retryable(&self, status: StatusCode) -> bool {
        self.retryable_statuses.contains(&status.as_u16())
    }

    pub(crate) fn attempts(&self) -> usize {
        self.max_attempts.max(1)
    }

    /// Exponential backoff after the failed attempt with 0-based index `attempt`.
    ///
    /// `max(floor, 2^(attempt + 1) * unit)`.
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        let exp = (attempt.min(30) + 1) as u32;
        let computed = self.backoff_unit_ms.saturating_mul(1u64 << exp);
        Duration::from_millis(computed.max(self.backoff_floor_ms))
    }

    /// Delay after a retryable status, preferring the server's `retry-after` hint.
    pub fn delay_for_status(&self, attempt: usize, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| self.backoff_delay(attempt))
    }
}

/// Why the dispatcher is about to wait and try again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryCause {
    /// The server answered with a retryable status.
    Status(u16),
    /// No response was received.
    Transport(String),
}

impl fmt::Display for RetryCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "status {status}"),
            Self::Transport(message) => write!(f, "transport error: {message}"),
        }
    }
}

/// Notification emitted before each retry wait.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryEvent {
    /// 1-based number of the attempt that just failed.
    pub attempt: usize,
    pub max_attempts: usize,
    pub delay: Duration,
    pub cause: RetryCause,
}

/// Hook called synchronously with every [`RetryEvent`]; it must not block.
pub type RetryObserver = Arc<dyn Fn(&RetryEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;

    use super::{RetryCause, RetryPolicy};

    #[test]
    fn backoff_is_floored_then_doubles() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (0..5)
            .map(|n| policy.backoff_delay(n).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![3_000, 4_000, 8_000, 16_000, 32_000]);
    }

    #[test]
    fn backoff_saturates_on_huge_attempts() {
        let policy = RetryPolicy::default();
        assert!(policy.backoff_delay(usize::MAX) >= policy.backoff_delay(30));
    }

    #[test]
    fn retry_after_hint_wins_over_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for_status(3, Some(Duration::from_secs(2))),
            Duration::from_millis(2_000)
        );
        assert_eq!(policy.delay_for_status(1, None), Duration::from_millis(4_000));
    }

    #[test]
    fn default_retryable_set_is_rate_limiting_only() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(policy.is_retryable(StatusCode::from_u16(529).expect("valid status")));
        assert!(!policy.is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!policy.is_retryable(StatusCode::OK));
    }

    #[test]
    fn zero_attempts_still_makes_one() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.attempts(), 1);
        assert_eq!(RetryPolicy::no_retry().attempts(), 1);
    }

    #[test]
    fn cause_display() {
        assert_eq!(RetryCause::Status(429).to_string(), "status 429");
        assert_eq!(
            RetryCause::Transport("reset".to_owned()).to_string(),
            "transport error: reset"
        );
    }
}
