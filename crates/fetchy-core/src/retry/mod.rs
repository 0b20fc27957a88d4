//! Retry and backoff policy for single transfers.
//!
//! A descriptor's `retry` count becomes the number of extra attempts; this
//! module classifies failures (timeouts, throttling, connection errors, 5xx)
//! and computes exponential backoff so every transport shares one policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::TransferError;
pub use policy::{FailureKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
