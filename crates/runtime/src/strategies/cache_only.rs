//! Cache-only strategy.

use async_trait::async_trait;

use stratus_core::{Error, Response};

use crate::runtime::Runtime;
use crate::strategies::{FetchEvent, Handler};
use crate::wrapper::{RequestWrapper, WrapperOptions};

/// Serve from the cache; a miss is `no-response-received`. The network
/// is never consulted.
pub struct CacheOnly {
    wrapper: RequestWrapper,
}

impl CacheOnly {
    pub fn new(runtime: &Runtime, options: WrapperOptions) -> Result<Self, Error> {
        Ok(Self { wrapper: RequestWrapper::new(runtime, options)? })
    }

    pub fn wrapper(&self) -> &RequestWrapper {
        &self.wrapper
    }
}

#[async_trait]
impl Handler for CacheOnly {
    async fn handle(&self, event: &FetchEvent) -> Result<Response, Error> {
        self.wrapper
            .match_cached(&event.request)
            .await?
            .ok_or_else(|| Error::NoResponseReceived(event.request.url.to_string()))
    }
}
