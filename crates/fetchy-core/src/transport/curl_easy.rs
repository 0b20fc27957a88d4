//! libcurl-backed transport: one `Easy` handle per request, run in a blocking task.
//!
//! Cancellation is cooperative: curl's progress callback polls the abort
//! token and returns false, which makes `perform` stop with
//! "aborted by callback". A cancelled request never reports.

use std::str;
use std::time::Duration;

use crate::descriptor::{Method, PreparedRequest};
use crate::handle::RequestHandle;
use crate::retry::{run_with_retry, RetryPolicy, TransferError};
use crate::state::{Direction, Progress, Response};

use super::parse::parse_headers;
use super::{Reporter, Transport};

/// Per-transport curl settings (from config).
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Applied when the request has no timeout of its own.
    pub default_timeout: Option<Duration>,
    pub max_redirections: u32,
    pub user_agent: Option<String>,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            default_timeout: None,
            max_redirections: 10,
            user_agent: None,
        }
    }
}

/// Transport that performs requests with libcurl on tokio's blocking pool.
///
/// `start` must be called from within a tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    options: CurlOptions,
    retry_policy: RetryPolicy,
}

impl CurlTransport {
    pub fn new(options: CurlOptions, retry_policy: RetryPolicy) -> Self {
        Self {
            options,
            retry_policy,
        }
    }
}

impl Transport for CurlTransport {
    fn start(&self, request: PreparedRequest, reporter: Reporter) -> RequestHandle {
        let handle = reporter.handle();
        let options = self.options.clone();
        let policy = self.retry_policy.for_retries(request.retry);
        let task = tokio::task::spawn_blocking(move || {
            let outcome = run_with_retry(
                &policy,
                || reporter.is_cancelled(),
                |attempt| {
                    if attempt > 1 {
                        tracing::debug!(id = %request.id, attempt, "retrying request");
                    }
                    perform_once(&request, &options, &reporter)
                },
            );
            match outcome {
                Ok(response) => reporter.succeed(response),
                Err(e) => match e.into_failure() {
                    Some((error, response)) => reporter.fail(error, response),
                    None => tracing::debug!(id = %reporter.id(), "transfer cancelled"),
                },
            }
        });
        handle.with_task(task.abort_handle())
    }
}

/// Performs one attempt of `request`. Non-2xx statuses are returned as `TransferError::Http`.
fn perform_once(
    request: &PreparedRequest,
    options: &CurlOptions,
    reporter: &Reporter,
) -> Result<Response, TransferError> {
    let mut header_lines: Vec<String> = Vec::new();
    let mut body: Vec<u8> = Vec::new();
    let mut last_down = 0u64;
    let mut last_up = 0u64;

    let mut easy = curl::easy::Easy::new();
    easy.url(&request.url).map_err(TransferError::Curl)?;
    easy.follow_location(true).map_err(TransferError::Curl)?;
    easy.max_redirections(options.max_redirections)
        .map_err(TransferError::Curl)?;
    easy.connect_timeout(options.connect_timeout)
        .map_err(TransferError::Curl)?;
    if let Some(timeout) = request.timeout.or(options.default_timeout) {
        easy.timeout(timeout).map_err(TransferError::Curl)?;
    }
    if let Some(ua) = &options.user_agent {
        easy.useragent(ua).map_err(TransferError::Curl)?;
    }
    easy.progress(true).map_err(TransferError::Curl)?;

    let encoded = match request.method {
        Method::Get | Method::Head => None,
        _ => request.encoded_body(),
    };
    match request.method {
        Method::Get => easy.get(true).map_err(TransferError::Curl)?,
        Method::Head => easy.nobody(true).map_err(TransferError::Curl)?,
        Method::Post => easy.post(true).map_err(TransferError::Curl)?,
        _ => {}
    }
    if let Some((bytes, _)) = &encoded {
        easy.post_fields_copy(bytes).map_err(TransferError::Curl)?;
    }
    if !matches!(request.method, Method::Get | Method::Head | Method::Post) {
        easy.custom_request(request.method.as_str())
            .map_err(TransferError::Curl)?;
    }

    let content_type = encoded.as_ref().and_then(|(_, ct)| *ct);
    if !request.headers.is_empty() || content_type.is_some() {
        let mut list = curl::easy::List::new();
        for (k, v) in &request.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))
                .map_err(TransferError::Curl)?;
        }
        if let Some(ct) = content_type {
            list.append(&format!("Content-Type: {}", ct))
                .map_err(TransferError::Curl)?;
        }
        easy.http_headers(list).map_err(TransferError::Curl)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    header_lines.push(s.trim_end().to_string());
                }
                true
            })
            .map_err(TransferError::Curl)?;
        transfer
            .write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(TransferError::Curl)?;
        transfer
            .progress_function(|dltotal, dlnow, ultotal, ulnow| {
                if reporter.is_cancelled() {
                    return false;
                }
                let (up, down) = (ulnow as u64, dlnow as u64);
                if up > last_up {
                    last_up = up;
                    reporter.progress(Progress {
                        direction: Direction::Upload,
                        loaded: up,
                        total: (ultotal > 0.0).then(|| ultotal as u64),
                    });
                }
                if down > last_down {
                    last_down = down;
                    reporter.progress(Progress {
                        direction: Direction::Download,
                        loaded: down,
                        total: (dltotal > 0.0).then(|| dltotal as u64),
                    });
                }
                true
            })
            .map_err(TransferError::Curl)?;
        if let Err(e) = transfer.perform() {
            if reporter.is_cancelled() || e.is_aborted_by_callback() {
                return Err(TransferError::Cancelled);
            }
            return Err(TransferError::Curl(e));
        }
    }

    let status = easy.response_code().map_err(TransferError::Curl)?;
    let (reason, headers) = parse_headers(&header_lines);
    let response = Response {
        status,
        reason,
        headers,
        body,
    };
    if !response.is_success() {
        return Err(TransferError::Http(response));
    }
    Ok(response)
}
