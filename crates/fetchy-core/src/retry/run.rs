//! Retry loop: run an attempt until success, cancellation, or the policy says stop.

use std::time::{Duration, Instant};

use super::classify;
use super::error::TransferError;
use super::policy::{RetryDecision, RetryPolicy};

const CANCEL_POLL: Duration = Duration::from_millis(25);

/// Runs `attempt` until it succeeds or the retry policy says to stop.
///
/// On a retryable failure, sleeps for the backoff duration (waking early and
/// returning `Cancelled` if `cancelled` turns true) and tries again. Blocking;
/// call from a blocking task.
pub fn run_with_retry<T, F, C>(
    policy: &RetryPolicy,
    cancelled: C,
    mut attempt: F,
) -> Result<T, TransferError>
where
    F: FnMut(u32) -> Result<T, TransferError>,
    C: Fn() -> bool,
{
    let mut n = 1u32;
    loop {
        if cancelled() {
            return Err(TransferError::Cancelled);
        }
        match attempt(n) {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(n, kind) {
                    RetryDecision::GiveUp => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(attempt = n, delay_ms = d.as_millis() as u64, "retrying after {}", e);
                        if !sleep_unless_cancelled(d, &cancelled) {
                            return Err(TransferError::Cancelled);
                        }
                        n += 1;
                    }
                }
            }
        }
    }
}

/// Sleeps for `d` in short slices. Returns false if cancelled meanwhile.
fn sleep_unless_cancelled<C: Fn() -> bool>(d: Duration, cancelled: &C) -> bool {
    let deadline = Instant::now() + d;
    loop {
        if cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(CANCEL_POLL));
    }
}
