//! Runtime assembly.
//!
//! A [`Runtime`] is created once at startup and lives for the worker's
//! lifetime. It owns the response store and the shared HTTP client;
//! wrappers and plugins take cheap clones of both.

use std::path::PathBuf;
use std::sync::Arc;

use stratus_core::{Error, ResponseStore, RuntimeConfig, TimestampIndex};

use crate::fetch::{FetchClient, FetchConfig};

/// Where per-cache-name expiration indexes live.
#[derive(Clone, Debug)]
pub(crate) enum IndexLocation {
    Dir(PathBuf),
    InMemory,
}

impl IndexLocation {
    pub(crate) async fn open(&self, cache_name: &str) -> Result<TimestampIndex, Error> {
        match self {
            IndexLocation::Dir(dir) => TimestampIndex::open(dir, cache_name).await,
            IndexLocation::InMemory => TimestampIndex::open_in_memory(cache_name).await,
        }
    }
}

/// Shared state for one caching runtime.
#[derive(Clone)]
pub struct Runtime {
    config: Arc<RuntimeConfig>,
    store: ResponseStore,
    fetch: FetchClient,
    index_location: IndexLocation,
}

impl Runtime {
    /// Open the runtime's stores under `data_dir` and build the shared
    /// HTTP client.
    pub async fn new(config: RuntimeConfig) -> Result<Self, Error> {
        std::fs::create_dir_all(&config.data_dir)?;

        let store = ResponseStore::open(config.data_dir.join("responses.sqlite")).await?;
        let fetch = FetchClient::new(FetchConfig::from(&config))?;
        let index_location = IndexLocation::Dir(config.data_dir.clone());

        tracing::info!(
            scope = %config.scope,
            data_dir = %config.data_dir.display(),
            timeout_ms = config.timeout_ms,
            "runtime ready"
        );

        Ok(Self { config: Arc::new(config), store, fetch, index_location })
    }

    /// Build a runtime whose stores live in memory. Used by tests.
    pub async fn in_memory(config: RuntimeConfig) -> Result<Self, Error> {
        let store = ResponseStore::open_in_memory().await?;
        let fetch = FetchClient::new(FetchConfig::from(&config))?;
        Ok(Self { config: Arc::new(config), store, fetch, index_location: IndexLocation::InMemory })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn store(&self) -> &ResponseStore {
        &self.store
    }

    pub fn fetch(&self) -> &FetchClient {
        &self.fetch
    }

    pub(crate) fn index_location(&self) -> &IndexLocation {
        &self.index_location
    }
}
