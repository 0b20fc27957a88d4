//! Request manifests: a TOML file declaring the requests to schedule.
//!
//! ```toml
//! concurrency = 3
//!
//! [[requests]]
//! id = "users"
//! url = "https://api.example.com/users"
//!
//! [[requests]]
//! id = "create"
//! url = "https://api.example.com/users"
//! method = "post"
//! body = { name = "ada" }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::descriptor::{ensure_unique_ids, PreparedRequest, RequestDescriptor};
use crate::error::FetchError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Overrides the configured concurrency when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub requests: Vec<RequestDescriptor>,
}

impl Manifest {
    /// Parses manifest TOML and rejects duplicate ids.
    pub fn parse(data: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(data)?;
        ensure_unique_ids(&manifest.requests)?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("read manifest: {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("parse manifest: {}", path.display()))
    }

    /// Prepares every descriptor without issuing anything, in declared order.
    pub fn check(&self) -> Vec<(&str, Result<PreparedRequest, FetchError>)> {
        self.requests
            .iter()
            .map(|d| (d.id.as_str(), d.prepare()))
            .collect()
    }

    pub fn into_requests(self) -> Arc<[RequestDescriptor]> {
        self.requests.into()
    }
}
