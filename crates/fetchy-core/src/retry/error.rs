//! Transfer error type for retry classification.

use std::fmt;

use crate::error::FetchError;
use crate::state::Response;

/// Error from a single transfer attempt, before retry classification and
/// before conversion into a [`FetchError`].
#[derive(Debug)]
pub enum TransferError {
    /// Curl reported an error (timeout, connection, bad option, etc.).
    Curl(curl::Error),
    /// Response arrived with a non-2xx status.
    Http(Response),
    /// The request's abort token was set; the transfer was stopped.
    Cancelled,
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Curl(e) => write!(f, "{}", e),
            TransferError::Http(resp) => write!(f, "HTTP {}", resp.status),
            TransferError::Cancelled => write!(f, "transfer cancelled"),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransferError::Curl(e) => Some(e),
            TransferError::Http(_) | TransferError::Cancelled => None,
        }
    }
}

impl TransferError {
    /// Converts into the error stored in request state, plus the raw response if any.
    /// Returns None for `Cancelled`, which is never reported.
    pub fn into_failure(self) -> Option<(FetchError, Option<Response>)> {
        match self {
            TransferError::Curl(e) => Some((
                FetchError::RequestFailure {
                    status: None,
                    message: e.to_string(),
                },
                None,
            )),
            TransferError::Http(resp) => {
                let message = resp
                    .reason
                    .clone()
                    .unwrap_or_else(|| "request failed".to_string());
                Some((
                    FetchError::RequestFailure {
                        status: Some(resp.status),
                        message,
                    },
                    Some(resp),
                ))
            }
            TransferError::Cancelled => None,
        }
    }
}
