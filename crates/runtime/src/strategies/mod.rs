//! Caching strategies.
//!
//! Each strategy is a handler bound to one cache partition for its
//! lifetime, turning an intercepted request into a response via its
//! request wrapper:
//!
//! - [`CacheFirst`] - serve the cache, fall through to the network
//! - [`CacheOnly`] - cache or `no-response-received`
//! - [`NetworkOnly`] - straight to the network
//! - [`NetworkFirst`] - network raced against an optional timeout that
//!   falls back to the cache
//! - [`StaleWhileRevalidate`] - cache immediately, refresh in the
//!   background

pub mod cache_first;
pub mod cache_only;
pub mod network_first;
pub mod network_only;
pub mod stale_while_revalidate;

pub use cache_first::CacheFirst;
pub use cache_only::CacheOnly;
pub use network_first::NetworkFirst;
pub use network_only::NetworkOnly;
pub use stale_while_revalidate::StaleWhileRevalidate;

use async_trait::async_trait;

use stratus_core::{Error, Request, Response};

/// An intercepted fetch event carrying the request to serve.
#[derive(Debug, Clone)]
pub struct FetchEvent {
    pub request: Request,
}

impl FetchEvent {
    pub fn new(request: Request) -> Self {
        Self { request }
    }
}

/// A bound policy object that turns fetch events into responses.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, event: &FetchEvent) -> Result<Response, Error>;
}
