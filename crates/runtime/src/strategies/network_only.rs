//! Network-only strategy.

use async_trait::async_trait;

use stratus_core::{Error, Response};

use crate::runtime::Runtime;
use crate::strategies::{FetchEvent, Handler};
use crate::wrapper::{RequestWrapper, WrapperOptions};

/// Straight to the network, through the wrapper's fetch pipeline so the
/// request-rewrite and failure hooks still run. Nothing is cached.
pub struct NetworkOnly {
    wrapper: RequestWrapper,
}

impl NetworkOnly {
    pub fn new(runtime: &Runtime, options: WrapperOptions) -> Result<Self, Error> {
        Ok(Self { wrapper: RequestWrapper::new(runtime, options)? })
    }

    pub fn wrapper(&self) -> &RequestWrapper {
        &self.wrapper
    }
}

#[async_trait]
impl Handler for NetworkOnly {
    async fn handle(&self, event: &FetchEvent) -> Result<Response, Error> {
        self.wrapper.fetch(event.request.clone()).await
    }
}
