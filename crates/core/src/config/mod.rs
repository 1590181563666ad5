//! Runtime configuration with layered loading.
//!
//! Configuration is assembled from three sources, highest wins:
//!
//! 1. Environment variables (STRATUS_*)
//! 2. TOML config file (if STRATUS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache;

mod validation;

pub use validation::ConfigError;

/// Runtime configuration for the caching toolkit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Registration scope this runtime serves.
    ///
    /// The default cache name is derived from it, so two runtimes on one
    /// origin with different scopes never share a cache.
    /// Set via STRATUS_SCOPE.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Directory holding the response store and expiration databases.
    ///
    /// Set via STRATUS_DATA_DIR.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// User-Agent string for outbound requests.
    ///
    /// Set via STRATUS_USER_AGENT.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network timeout in milliseconds.
    ///
    /// Set via STRATUS_TIMEOUT_MS.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects to follow.
    ///
    /// Set via STRATUS_MAX_REDIRECTS.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Maximum bytes to read per response body.
    ///
    /// Set via STRATUS_MAX_BYTES.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_scope() -> String {
    "/".into()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./stratus-data")
}

fn default_user_agent() -> String {
    "stratus/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            scope: default_scope(),
            data_dir: default_data_dir(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl RuntimeConfig {
    /// Timeout as a Duration for use with the HTTP client.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The cache name used when a wrapper is built without one.
    pub fn default_cache_name(&self) -> String {
        cache::default_cache_name(&self.scope)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or validation
    /// fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STRATUS_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(Env::prefixed("STRATUS_").map(|key| key.as_str().to_lowercase().into()));

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
