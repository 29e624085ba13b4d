use crate::RetryPolicy;

/// Configures HTTP timeout, retry, cooldown and polling behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DispatcherOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Retry policy used when a call does not supply its own.
    pub retry: RetryPolicy,
    /// Minimum spacing between operations of one logical client.
    pub cooldown: CooldownOptions,
    /// Long-running job polling behavior.
    pub poll: PollOptions,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retry: RetryPolicy::default(),
            cooldown: CooldownOptions::default(),
            poll: PollOptions::default(),
        }
    }
}

/// Spacing enforced between successive operations of one logical client.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CooldownOptions {
    /// Interval in milliseconds before any rate limit has been observed.
    pub min_interval_ms: u64,
    /// Interval in milliseconds once the client has been rate limited.
    pub escalated_interval_ms: u64,
}

impl Default for CooldownOptions {
    fn default() -> Self {
        Self {
            min_interval_ms: 5_000,
            escalated_interval_ms: 10_000,
        }
    }
}

impl CooldownOptions {
    /// No spacing at all; useful for clients that are not rate limited.
    pub fn disabled() -> Self {
        Self {
            min_interval_ms: 0,
            escalated_interval_ms: 0,
        }
    }
}

/// Polling behavior for asynchronous "submit, then poll" APIs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollOptions {
    /// Wait between two status queries, in milliseconds.
    pub interval_ms: u64,
    /// Maximum number of status queries; `None` polls until a terminal state.
    /// `Some(0)` is invalid and makes polling fail with a config error.
    pub max_polls: Option<usize>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            max_polls: Some(150),
        }
    }
}
