//! Maps transfer errors onto [`FailureKind`]s.

use super::error::TransferError;
use super::policy::FailureKind;

pub fn classify_http_status(code: u32) -> FailureKind {
    match code {
        429 | 503 => FailureKind::Throttled,
        500..=599 => FailureKind::ServerError(code),
        _ => FailureKind::Permanent,
    }
}

pub fn classify_curl_error(e: &curl::Error) -> FailureKind {
    if e.is_operation_timedout() {
        FailureKind::Timeout
    } else if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_send_error()
        || e.is_recv_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        FailureKind::Connection
    } else {
        FailureKind::Permanent
    }
}

/// Cancellation is never retried.
pub fn classify(e: &TransferError) -> FailureKind {
    match e {
        TransferError::Curl(ce) => classify_curl_error(ce),
        TransferError::Http(resp) => classify_http_status(resp.status),
        TransferError::Cancelled => FailureKind::Permanent,
    }
}
