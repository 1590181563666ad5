//! The request wrapper.
//!
//! Every strategy delegates its network and cache operations here. The
//! wrapper owns one cache partition (opened lazily, memoised for the
//! wrapper's lifetime), drives the plugin hooks in order, and keeps the
//! single-writer discipline on cached responses: the response written to
//! the cache is always a clone distinct from the one handed back to the
//! caller, and neither is consumed by the wrapper.

use std::sync::Arc;

use tokio::sync::OnceCell;

use stratus_core::{CacheHandle, Error, MatchOptions, Request, Response, ResponseKind, ResponseStore};

use crate::fetch::{FetchClient, FetchOptions};
use crate::plugins::{Hook, Plugin, PluginRegistry};
use crate::runtime::Runtime;

/// Construction options shared by the wrapper and every strategy.
#[derive(Default)]
pub struct WrapperOptions {
    /// Cache partition to use. Defaults to the name derived from the
    /// runtime's scope.
    pub cache_name: Option<String>,
    /// Lifecycle plugins, in registration order.
    pub plugins: Vec<Arc<dyn Plugin>>,
    /// Options merged into every network call.
    pub fetch_options: Option<FetchOptions>,
    /// Options applied to every cache lookup.
    pub match_options: Option<MatchOptions>,
}

/// Mediates fetch and cache operations for one strategy.
///
/// Cloning is cheap; clones share the memoised cache handle and the
/// plugin registry.
#[derive(Clone)]
pub struct RequestWrapper {
    cache_name: String,
    registry: Arc<PluginRegistry>,
    fetch: FetchClient,
    fetch_options: FetchOptions,
    match_options: MatchOptions,
    store: ResponseStore,
    cache: Arc<OnceCell<CacheHandle>>,
}

impl RequestWrapper {
    /// Build a wrapper.
    ///
    /// Fails with `multiple-cache-will-update-plugins` or
    /// `multiple-cache-will-match-plugins` when two plugins claim the
    /// same transform hook.
    pub fn new(runtime: &Runtime, options: WrapperOptions) -> Result<Self, Error> {
        let registry = PluginRegistry::new(options.plugins)?;
        Ok(Self {
            cache_name: options.cache_name.unwrap_or_else(|| runtime.config().default_cache_name()),
            registry: Arc::new(registry),
            fetch: runtime.fetch().clone(),
            fetch_options: options.fetch_options.unwrap_or_default(),
            match_options: options.match_options.unwrap_or_default(),
            store: runtime.store().clone(),
            cache: Arc::new(OnceCell::new()),
        })
    }

    /// The cache partition this wrapper is bound to.
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// The lazily opened cache handle. Subsequent calls return the same
    /// handle.
    pub async fn cache(&self) -> Result<&CacheHandle, Error> {
        self.cache.get_or_try_init(|| self.store.open_cache(&self.cache_name)).await
    }

    /// Look up the request in the cache and run the result through the
    /// `cache_will_match` transform, when one is registered.
    ///
    /// Returns `None` on miss or when the transform suppresses the hit.
    pub async fn match_cached(&self, request: &Request) -> Result<Option<Response>, Error> {
        let cache = self.cache().await?;
        let cached = cache.match_request(request, &self.match_options).await?;
        match self.registry.transform(Hook::CacheWillMatch) {
            Some(plugin) => plugin.cache_will_match(cached).await,
            None => Ok(cached),
        }
    }

    /// Send the request to the network.
    ///
    /// Each `request_will_fetch` callback runs in registration order,
    /// each receiving the previous one's output; the final request goes
    /// to the network. On network failure every `fetch_did_fail`
    /// observer is notified with that final request, then the network
    /// error is rethrown.
    pub async fn fetch(&self, request: Request) -> Result<Response, Error> {
        let mut current = request;
        for plugin in self.registry.listeners(Hook::RequestWillFetch) {
            current = plugin.request_will_fetch(current).await?;
        }

        match self.fetch.fetch(&current, &self.fetch_options).await {
            Ok(response) => Ok(response),
            Err(err) => {
                for plugin in self.registry.listeners(Hook::FetchDidFail) {
                    plugin.fetch_did_fail(&current).await;
                }
                Err(err)
            }
        }
    }

    /// Fetch the request and, when the response is cacheable, write a
    /// clone of it to the cache.
    ///
    /// Cacheability is decided by the `cache_will_update` transform when
    /// registered, otherwise by `Response::is_ok`. With `wait_on_cache`
    /// the cache write (and the `cache_did_update` fan-out) completes
    /// before this returns, and an uncacheable response is an
    /// `invalid-response-for-caching` error; without it the write runs on
    /// a detached task and failures are logged.
    ///
    /// `cache_key` substitutes the request stored under, the original
    /// request still being the one sent to the network.
    pub async fn fetch_and_cache(
        &self, request: Request, wait_on_cache: bool, cache_key: Option<Request>,
    ) -> Result<Response, Error> {
        let response = self.fetch(request.clone()).await?;

        let cacheable = match self.registry.transform(Hook::CacheWillUpdate) {
            Some(plugin) => plugin.cache_will_update(&request, &response).await?,
            None => response.is_ok(),
        };

        if cacheable {
            let stored = response.clone();
            if wait_on_cache {
                self.write_to_cache(request, cache_key, stored).await?;
            } else {
                let wrapper = self.clone();
                tokio::spawn(async move {
                    if let Err(err) = wrapper.write_to_cache(request, cache_key, stored).await {
                        tracing::warn!(cache = %wrapper.cache_name, error = %err, "background cache write failed");
                    }
                });
            }
        } else if wait_on_cache {
            return Err(Error::InvalidResponseForCaching(response.status.as_u16()));
        }

        Ok(response)
    }

    /// The write half of [`fetch_and_cache`](Self::fetch_and_cache):
    /// snapshot the entry being replaced when an observer wants it, put,
    /// then fan out `cache_did_update`.
    async fn write_to_cache(
        &self, request: Request, cache_key: Option<Request>, stored: Response,
    ) -> Result<(), Error> {
        let old_response = if self.registry.has(Hook::CacheDidUpdate) && stored.kind != ResponseKind::Opaque {
            self.match_cached(&request).await?
        } else {
            None
        };

        let cache = self.cache().await?;
        cache.put(cache_key.as_ref().unwrap_or(&request), &stored).await?;

        for plugin in self.registry.listeners(Hook::CacheDidUpdate) {
            if let Err(err) = plugin.cache_did_update(cache.name(), old_response.as_ref(), &stored).await {
                tracing::warn!(cache = cache.name(), error = %err, "cache-did-update listener failed");
            }
        }
        Ok(())
    }
}
