//! Plugin lifecycle protocol.
//!
//! A plugin is a bag of lifecycle callbacks drawn from five hooks. Each
//! plugin declares which hooks it registers via [`Plugin::hooks`];
//! undeclared hooks are never invoked, so the default implementations
//! only matter for the hooks a plugin opts into.
//!
//! Two of the hooks are transforms with at most one registrant per
//! wrapper, enforced when the registry is built:
//!
//! - `cache_will_update` decides whether a response is cacheable
//! - `cache_will_match` rewrites (or suppresses) a cache read
//!
//! The rest are observers/mutators invoked in registration order.

pub mod expiration;

pub use expiration::{CacheExpiration, ExpirationOptions};

use async_trait::async_trait;
use std::sync::Arc;

use stratus_core::{Error, Request, Response};

/// The five lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// Before the network call; may rewrite the request.
    RequestWillFetch,
    /// After the network call rejects; observer only.
    FetchDidFail,
    /// Before a cache write; decides cacheability. Transform, single.
    CacheWillUpdate,
    /// After a successful cache write; observer.
    CacheDidUpdate,
    /// After a cache read; may replace or suppress the result. Transform, single.
    CacheWillMatch,
}

/// A bag of lifecycle callbacks.
///
/// Implementations override the hooks they declare in [`Plugin::hooks`]
/// and leave the rest alone.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// The hooks this plugin registers.
    fn hooks(&self) -> &[Hook];

    /// Receive the current request and resolve to the request used from
    /// here on. Errors abort the fetch and surface to the caller.
    async fn request_will_fetch(&self, request: Request) -> Result<Request, Error> {
        Ok(request)
    }

    /// Observe a failed network call. The request passed is the final
    /// rewritten one that went to the network.
    async fn fetch_did_fail(&self, request: &Request) {
        let _ = request;
    }

    /// Decide whether the response may be written to the cache.
    async fn cache_will_update(&self, request: &Request, response: &Response) -> Result<bool, Error> {
        let _ = request;
        Ok(response.is_ok())
    }

    /// Observe a completed cache write. `old_response` is the entry the
    /// write replaced, when one existed and was snapshotted. Errors are
    /// logged by the wrapper, never surfaced.
    async fn cache_did_update(
        &self, cache_name: &str, old_response: Option<&Response>, new_response: &Response,
    ) -> Result<(), Error> {
        let _ = (cache_name, old_response, new_response);
        Ok(())
    }

    /// Transform a raw cache read. Returning `None` makes the wrapper
    /// behave as if the cache missed.
    async fn cache_will_match(&self, cached_response: Option<Response>) -> Result<Option<Response>, Error> {
        Ok(cached_response)
    }
}

/// Ordered plugin registry for one wrapper.
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    /// Build a registry, validating the single-transform invariants.
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Result<Self, Error> {
        let registry = Self { plugins };
        if registry.listeners(Hook::CacheWillUpdate).count() > 1 {
            return Err(Error::MultipleCacheWillUpdatePlugins);
        }
        if registry.listeners(Hook::CacheWillMatch).count() > 1 {
            return Err(Error::MultipleCacheWillMatchPlugins);
        }
        Ok(registry)
    }

    /// Plugins registered for a hook, in registration order.
    pub fn listeners(&self, hook: Hook) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.plugins.iter().filter(move |p| p.hooks().contains(&hook))
    }

    /// The single registrant of a transform hook, if any.
    pub fn transform(&self, hook: Hook) -> Option<&Arc<dyn Plugin>> {
        self.listeners(hook).next()
    }

    /// Whether any plugin registered the hook.
    pub fn has(&self, hook: Hook) -> bool {
        self.listeners(hook).next().is_some()
    }
}
