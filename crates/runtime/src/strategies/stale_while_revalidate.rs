//! Stale-while-revalidate strategy.

use async_trait::async_trait;

use stratus_core::{Error, Response};

use crate::runtime::Runtime;
use crate::strategies::{FetchEvent, Handler};
use crate::wrapper::{RequestWrapper, WrapperOptions};

/// Serve the cache immediately and refresh it concurrently.
///
/// The revalidating fetch is spawned before the cache is read, so it
/// keeps running after a cache hit returns. On a cache miss the caller
/// waits for it instead.
pub struct StaleWhileRevalidate {
    wrapper: RequestWrapper,
}

impl StaleWhileRevalidate {
    pub fn new(runtime: &Runtime, options: WrapperOptions) -> Result<Self, Error> {
        Ok(Self { wrapper: RequestWrapper::new(runtime, options)? })
    }

    pub fn wrapper(&self) -> &RequestWrapper {
        &self.wrapper
    }
}

#[async_trait]
impl Handler for StaleWhileRevalidate {
    async fn handle(&self, event: &FetchEvent) -> Result<Response, Error> {
        let request = event.request.clone();

        let wrapper = self.wrapper.clone();
        let revalidation_request = request.clone();
        let revalidation =
            tokio::spawn(async move { wrapper.fetch_and_cache(revalidation_request, false, None).await });

        if let Some(cached) = self.wrapper.match_cached(&request).await? {
            return Ok(cached);
        }

        revalidation.await.map_err(|err| Error::Background(err.to_string()))?
    }
}
