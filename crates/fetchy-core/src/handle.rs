//! Cancellation handles for in-flight requests.
//!
//! Each admitted request gets an abort token shared between the scheduler's
//! registry and the transport's [`Reporter`](crate::transport::Reporter). The
//! transport polls the token (curl checks it from its progress callback) and
//! stops; the reporter refuses to deliver anything once it is set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared abort flag for one admitted request.
#[derive(Debug, Clone, Default)]
pub struct AbortToken(Arc<AtomicBool>);

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Cancellable handle returned by a transport for one in-flight request.
///
/// `cancel` is idempotent: calling it twice, or after the request already
/// finished, does nothing further.
#[derive(Debug)]
pub struct RequestHandle {
    token: AbortToken,
    task: Option<tokio::task::AbortHandle>,
}

impl RequestHandle {
    pub fn new(token: AbortToken) -> Self {
        Self { token, task: None }
    }

    /// Also abort `task` on cancel (effective while the task has not started
    /// or is parked at an await point).
    pub fn with_task(mut self, task: tokio::task::AbortHandle) -> Self {
        self.task = Some(task);
        self
    }

    pub fn cancel(&self) {
        self.token.cancel();
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &AbortToken {
        &self.token
    }
}
