//! Network-first strategy with an optional timeout race.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time;

use stratus_core::{Error, Response};

use crate::runtime::Runtime;
use crate::strategies::{FetchEvent, Handler};
use crate::wrapper::{RequestWrapper, WrapperOptions};

/// Prefer the network, fall back to the cache.
///
/// With a network timeout configured, the fetch races a timer. A timer
/// that fires re-polls the cache and wins only when something is there;
/// an empty cache keeps the caller waiting on the network. When the
/// network itself fails, the cache is consulted once more before the
/// network error surfaces.
pub struct NetworkFirst {
    wrapper: RequestWrapper,
    network_timeout: Option<Duration>,
}

impl NetworkFirst {
    pub fn new(runtime: &Runtime, options: WrapperOptions) -> Result<Self, Error> {
        Ok(Self { wrapper: RequestWrapper::new(runtime, options)?, network_timeout: None })
    }

    /// Set how long the network gets before the cache is offered the
    /// race.
    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = Some(timeout);
        self
    }

    pub fn wrapper(&self) -> &RequestWrapper {
        &self.wrapper
    }
}

#[async_trait]
impl Handler for NetworkFirst {
    async fn handle(&self, event: &FetchEvent) -> Result<Response, Error> {
        let request = event.request.clone();
        let network = self.wrapper.fetch_and_cache(request.clone(), false, None);
        tokio::pin!(network);

        let network_result = match self.network_timeout {
            Some(timeout) => {
                tokio::select! {
                    result = &mut network => result,
                    _ = time::sleep(timeout) => {
                        if let Some(cached) = self.wrapper.match_cached(&request).await? {
                            return Ok(cached);
                        }
                        network.await
                    }
                }
            }
            None => network.await,
        };

        match network_result {
            Ok(response) => Ok(response),
            Err(err) => match self.wrapper.match_cached(&request).await? {
                Some(cached) => Ok(cached),
                None => Err(err),
            },
        }
    }
}
