//! Error type shared by the scheduler, the registry and transports.
//!
//! Fast-fail errors (`MissingUrl`, `InvalidMethod`, `InvalidUrl`) are raised
//! while preparing a descriptor, before any call is issued. `RequestFailure`
//! and `Aborted` never leave the scheduler as `Err`; they are stored in the
//! request's state. `RetryTargetNotFound` and `DuplicateId` are returned from
//! the control surface.

/// Errors produced while scheduling or performing requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Descriptor has no target endpoint.
    #[error("request {id}: parameter `url` is required")]
    MissingUrl { id: String },

    /// Method string is not a recognized HTTP method.
    #[error("request {id}: invalid method {method}")]
    InvalidMethod { id: String, method: String },

    /// URL could not be parsed or the query could not be merged into it.
    #[error("request {id}: invalid url {url}: {reason}")]
    InvalidUrl {
        id: String,
        url: String,
        reason: String,
    },

    /// Network or HTTP-level failure reported by the transport.
    #[error("{}", failure_message(.status, .message))]
    RequestFailure { status: Option<u32>, message: String },

    /// Request was cancelled by `abort`, reconciliation or unmount.
    #[error("Request has been aborted")]
    Aborted,

    /// `retry` was called with an id that is not in the declared list.
    #[error("Could not find request for id: {id}")]
    RetryTargetNotFound { id: String },

    /// The declared list contains the same id twice.
    #[error("duplicate request id: {id}")]
    DuplicateId { id: String },
}

fn failure_message(status: &Option<u32>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {}: {}", code, message),
        None => message.to_string(),
    }
}

impl FetchError {
    /// True for errors detected before a request is issued.
    pub fn is_fast_fail(&self) -> bool {
        matches!(
            self,
            FetchError::MissingUrl { .. }
                | FetchError::InvalidMethod { .. }
                | FetchError::InvalidUrl { .. }
        )
    }

    /// True if this is the synthetic error attached on cancellation.
    pub fn is_abort(&self) -> bool {
        matches!(self, FetchError::Aborted)
    }

    /// HTTP status carried by a `RequestFailure`, if any.
    pub fn status(&self) -> Option<u32> {
        match self {
            FetchError::RequestFailure { status, .. } => *status,
            _ => None,
        }
    }
}
