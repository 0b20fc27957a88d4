//! Backoff policy for transport-level retries.

use std::time::Duration;

use crate::config::RetryConfig;

/// Why an attempt failed, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connect or whole-request timeout.
    Timeout,
    /// 429 or 503: the server wants us to back off.
    Throttled,
    /// Connection refused/reset, DNS failure, empty reply.
    Connection,
    /// Any other 5xx.
    ServerError(u32),
    /// 4xx, bad options, cancellation: trying again cannot help.
    Permanent,
}

impl FailureKind {
    pub fn is_transient(self) -> bool {
        !matches!(self, FailureKind::Permanent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    GiveUp,
    RetryAfter(Duration),
}

/// Exponential backoff (`base * 2^(attempt-1)`, capped at `max_delay`) with
/// an attempt budget.
///
/// Backoff timing comes from the `[retry]` config section; the budget is set
/// per request from the descriptor's `retry` count via [`for_retries`](Self::for_retries).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

const FALLBACK_BASE_DELAY: Duration = Duration::from_millis(250);

/// Negative values mean no delay; values that do not fit a `Duration`
/// (infinite, NaN, huge) fall back to 250ms.
fn base_delay(secs: f64) -> Duration {
    if secs.is_nan() {
        tracing::warn!("retry base_delay_secs is NaN, using {:?}", FALLBACK_BASE_DELAY);
        return FALLBACK_BASE_DELAY;
    }
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or_else(|_| {
        tracing::warn!(
            "retry base_delay_secs {} out of range, using {:?}",
            secs,
            FALLBACK_BASE_DELAY
        );
        FALLBACK_BASE_DELAY
    })
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: base_delay(cfg.base_delay_secs),
            max_delay: Duration::from_secs(cfg.max_delay_secs),
        }
    }
}

impl RetryPolicy {
    /// Same backoff, with `retries` extra attempts after the first one.
    pub fn for_retries(&self, retries: u32) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            ..*self
        }
    }

    /// Delay before attempt `attempt + 1`. `attempt` is 1-based.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    /// Whether to try again after attempt `attempt` failed with `kind`.
    pub fn decide(&self, attempt: u32, kind: FailureKind) -> RetryDecision {
        if attempt >= self.max_attempts || !kind.is_transient() {
            RetryDecision::GiveUp
        } else {
            RetryDecision::RetryAfter(self.backoff(attempt))
        }
    }
}
