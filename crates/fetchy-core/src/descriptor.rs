//! Request descriptors: what the caller declares, and the validated form
//! handed to a transport.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::state::RequestState;

/// HTTP method accepted by descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    /// Parses a method name case-insensitively. `del` is accepted for DELETE.
    pub fn parse(s: &str) -> Option<Method> {
        match s.trim().to_ascii_lowercase().as_str() {
            "get" => Some(Method::Get),
            "head" => Some(Method::Head),
            "post" => Some(Method::Post),
            "put" => Some(Method::Put),
            "patch" => Some(Method::Patch),
            "delete" | "del" => Some(Method::Delete),
            "options" => Some(Method::Options),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters: either a raw query string (`"a=1&b"`) or a table of pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Query {
    Raw(String),
    Pairs(BTreeMap<String, String>),
}

/// Completion transform applied to a fulfilled state before it is stored.
#[derive(Clone)]
pub struct Then(Arc<dyn Fn(RequestState) -> RequestState + Send + Sync>);

impl Then {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(RequestState) -> RequestState + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn apply(&self, state: RequestState) -> RequestState {
        (self.0)(state)
    }
}

impl fmt::Debug for Then {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Then(..)")
    }
}

fn default_method() -> String {
    "get".to_string()
}

/// One logical request declared by the caller, keyed by `id`.
///
/// Identity is by `id` only: two descriptors with the same id are the same
/// logical request even if their other fields differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Whole-request timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Extra attempts the transport may make on retryable failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    #[serde(skip)]
    pub then: Option<Then>,
}

impl RequestDescriptor {
    /// GET descriptor for `url`.
    pub fn get(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: Some(url.into()),
            method: default_method(),
            body: None,
            query: None,
            headers: BTreeMap::new(),
            timeout_ms: None,
            retry: None,
            then: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_then<F>(mut self, f: F) -> Self
    where
        F: Fn(RequestState) -> RequestState + Send + Sync + 'static,
    {
        self.then = Some(Then::new(f));
        self
    }

    /// Validates the descriptor and resolves the final URL.
    ///
    /// Fails fast with `MissingUrl`, `InvalidMethod` or `InvalidUrl`; no call
    /// is issued for a descriptor that does not prepare.
    pub fn prepare(&self) -> Result<PreparedRequest, FetchError> {
        let raw_url = match self.url.as_deref().map(str::trim) {
            Some(u) if !u.is_empty() => u,
            _ => {
                return Err(FetchError::MissingUrl {
                    id: self.id.clone(),
                })
            }
        };
        let method = Method::parse(&self.method).ok_or_else(|| FetchError::InvalidMethod {
            id: self.id.clone(),
            method: self.method.clone(),
        })?;

        let invalid = |reason: String| FetchError::InvalidUrl {
            id: self.id.clone(),
            url: raw_url.to_string(),
            reason,
        };
        let mut url = url::Url::parse(raw_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        match &self.query {
            None => {}
            Some(Query::Raw(q)) => {
                let q = q.trim_start_matches('?');
                if !q.is_empty() {
                    let merged = match url.query() {
                        Some(existing) if !existing.is_empty() => format!("{}&{}", existing, q),
                        _ => q.to_string(),
                    };
                    url.set_query(Some(&merged));
                }
            }
            Some(Query::Pairs(pairs)) => {
                if !pairs.is_empty() {
                    let mut qp = url.query_pairs_mut();
                    for (k, v) in pairs {
                        qp.append_pair(k, v);
                    }
                }
            }
        }

        Ok(PreparedRequest {
            id: self.id.clone(),
            method,
            url: url.to_string(),
            headers: self
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            body: self.body.clone(),
            timeout: self.timeout_ms.map(Duration::from_millis),
            retry: self.retry.unwrap_or(0),
        })
    }
}

/// Returns `DuplicateId` for the first id declared twice.
pub fn ensure_unique_ids(requests: &[RequestDescriptor]) -> Result<(), FetchError> {
    let mut seen = HashSet::with_capacity(requests.len());
    for r in requests {
        if !seen.insert(r.id.as_str()) {
            return Err(FetchError::DuplicateId { id: r.id.clone() });
        }
    }
    Ok(())
}

/// Validated request handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub id: String,
    pub method: Method,
    /// Absolute URL with the descriptor's query merged in.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub timeout: Option<Duration>,
    /// Extra attempts allowed on retryable failures (0 = single attempt).
    pub retry: u32,
}

impl PreparedRequest {
    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Encoded request body and the content type to send when the caller set none.
    ///
    /// Strings are sent verbatim; any other JSON value is serialized as JSON.
    pub fn encoded_body(&self) -> Option<(Vec<u8>, Option<&'static str>)> {
        let body = self.body.as_ref()?;
        let content_type = |ct: &'static str| {
            if self.has_header("content-type") {
                None
            } else {
                Some(ct)
            }
        };
        match body {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some((
                s.as_bytes().to_vec(),
                content_type("application/x-www-form-urlencoded"),
            )),
            other => Some((other.to_string().into_bytes(), content_type("application/json"))),
        }
    }
}
