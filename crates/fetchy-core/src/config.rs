use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::transport::CurlOptions;

/// Retry backoff parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts used when a caller asks for a policy without a per-request count.
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

fn default_concurrency() -> usize {
    crate::scheduler::DEFAULT_CONCURRENCY
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_max_redirections() -> u32 {
    10
}

/// Global configuration loaded from `~/.config/fetchy/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchyConfig {
    /// Maximum number of requests in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Connect timeout for every request, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Whole-request timeout applied when a descriptor sets none (None = no limit).
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
    /// Maximum redirects followed per request.
    #[serde(default = "default_max_redirections")]
    pub max_redirections: u32,
    /// User-Agent header sent when the descriptor does not set one.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Optional retry backoff; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for FetchyConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            connect_timeout_secs: default_connect_timeout_secs(),
            default_timeout_secs: None,
            max_redirections: default_max_redirections(),
            user_agent: None,
            retry: None,
        }
    }
}

impl FetchyConfig {
    /// Backoff policy from the `[retry]` section, or the built-in default.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryPolicy::from)
            .unwrap_or_default()
    }

    /// Options for the curl transport.
    pub fn curl_options(&self) -> CurlOptions {
        CurlOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            default_timeout: self.default_timeout_secs.map(Duration::from_secs),
            max_redirections: self.max_redirections,
            user_agent: self.user_agent.clone(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("fetchy")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchyConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetchyConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: FetchyConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
