//! Per-request state as observed by callers.

use std::fmt;

use crate::error::FetchError;

/// Which side of the transfer a progress event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

/// Transfer progress for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub direction: Direction,
    /// Bytes transferred so far in `direction`.
    pub loaded: u64,
    /// Total bytes expected, when the peer announced it.
    pub total: Option<u64>,
}

impl Progress {
    /// Percentage complete in [0.0, 100.0], or None when the total is unknown.
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(100.0),
            Some(total) => Some((self.loaded as f64 / total as f64 * 100.0).min(100.0)),
            None => None,
        }
    }
}

/// Raw HTTP response as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    pub status: u32,
    /// Reason phrase from the status line, if the server sent one.
    pub reason: Option<String>,
    /// Header lines of the final response, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// Case-insensitive header lookup (first match).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn is_json(&self) -> bool {
        self.header("content-type")
            .map(|ct| {
                let ct = ct.to_ascii_lowercase();
                ct.starts_with("application/json") || ct.contains("+json")
            })
            .unwrap_or(false)
    }

    /// Decodes the body: JSON for JSON content types, otherwise the body as text.
    pub fn decode_value(&self) -> Result<serde_json::Value, FetchError> {
        if self.is_json() {
            if self.body.is_empty() {
                return Ok(serde_json::Value::Null);
            }
            return serde_json::from_slice(&self.body).map_err(|e| FetchError::RequestFailure {
                status: Some(self.status),
                message: format!("invalid JSON body: {}", e),
            });
        }
        Ok(serde_json::Value::String(
            String::from_utf8_lossy(&self.body).into_owned(),
        ))
    }
}

/// State of one logical request.
///
/// At most one of `pending`, `fulfilled`, `rejected` is true. The idle state
/// (all false) is reported for declared ids that have not been admitted yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestState {
    pub pending: bool,
    pub fulfilled: bool,
    pub rejected: bool,
    pub error: Option<FetchError>,
    pub progress: Option<Progress>,
    pub result: Option<Response>,
    pub value: Option<serde_json::Value>,
}

impl RequestState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn pending() -> Self {
        Self {
            pending: true,
            ..Self::default()
        }
    }

    pub fn fulfilled(response: Response, value: serde_json::Value) -> Self {
        Self {
            fulfilled: true,
            result: Some(response),
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn rejected(error: FetchError, response: Option<Response>) -> Self {
        Self {
            rejected: true,
            error: Some(error),
            result: response,
            ..Self::default()
        }
    }

    pub fn aborted() -> Self {
        Self::rejected(FetchError::Aborted, None)
    }

    pub fn is_idle(&self) -> bool {
        !self.pending && !self.fulfilled && !self.rejected
    }

    pub fn is_terminal(&self) -> bool {
        self.fulfilled || self.rejected
    }

    /// Short label used in logs and status tables.
    pub fn label(&self) -> &'static str {
        if self.pending {
            "pending"
        } else if self.fulfilled {
            "fulfilled"
        } else if self.rejected {
            "rejected"
        } else {
            "idle"
        }
    }
}

/// Read-only view of the states of the declared requests, in declared order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatesSnapshot {
    entries: Vec<(String, RequestState)>,
}

impl StatesSnapshot {
    pub(crate) fn new(entries: Vec<(String, RequestState)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&RequestState> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, state)| state)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RequestState)> {
        self.entries.iter().map(|(id, state)| (id.as_str(), state))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries currently pending.
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|(_, s)| s.pending).count()
    }

    /// True when no declared request is pending or idle.
    pub fn all_settled(&self) -> bool {
        self.entries.iter().all(|(_, s)| s.is_terminal())
    }
}

impl fmt::Display for StatesSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, state) in &self.entries {
            writeln!(f, "{}: {}", id, state.label())?;
        }
        Ok(())
    }
}
