//! Cache-first strategy.

use async_trait::async_trait;

use stratus_core::{Error, Response};

use crate::runtime::Runtime;
use crate::strategies::{FetchEvent, Handler};
use crate::wrapper::{RequestWrapper, WrapperOptions};

/// Serve from the cache; on miss, fetch and cache the network response.
pub struct CacheFirst {
    wrapper: RequestWrapper,
}

impl CacheFirst {
    pub fn new(runtime: &Runtime, options: WrapperOptions) -> Result<Self, Error> {
        Ok(Self { wrapper: RequestWrapper::new(runtime, options)? })
    }

    pub fn wrapper(&self) -> &RequestWrapper {
        &self.wrapper
    }
}

#[async_trait]
impl Handler for CacheFirst {
    async fn handle(&self, event: &FetchEvent) -> Result<Response, Error> {
        if let Some(cached) = self.wrapper.match_cached(&event.request).await? {
            return Ok(cached);
        }
        self.wrapper.fetch_and_cache(event.request.clone(), false, None).await
    }
}
