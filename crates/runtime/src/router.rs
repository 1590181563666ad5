//! Minimal URL-pattern routing.
//!
//! Binds URL patterns to handler instances and dispatches fetch events
//! to the first matching one. Anything richer than exact/prefix matching
//! belongs to the embedder.

use std::sync::Arc;

use stratus_core::{Error, Response};
use url::Url;

use crate::strategies::{FetchEvent, Handler};

/// A pattern matched against the full request URL.
#[derive(Debug, Clone)]
pub enum RoutePattern {
    Exact(String),
    Prefix(String),
}

impl RoutePattern {
    fn matches(&self, url: &Url) -> bool {
        match self {
            RoutePattern::Exact(pattern) => url.as_str() == pattern,
            RoutePattern::Prefix(pattern) => url.as_str().starts_with(pattern.as_str()),
        }
    }
}

/// Dispatches fetch events to handlers. First registered match wins.
#[derive(Default)]
pub struct Router {
    routes: Vec<(RoutePattern, Arc<dyn Handler>)>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a pattern to a handler.
    pub fn register(&mut self, pattern: RoutePattern, handler: Arc<dyn Handler>) {
        self.routes.push((pattern, handler));
    }

    /// The handler that would serve a URL, if any.
    pub fn handler_for(&self, url: &Url) -> Option<&Arc<dyn Handler>> {
        self.routes.iter().find(|(pattern, _)| pattern.matches(url)).map(|(_, handler)| handler)
    }

    /// Dispatch an event to its handler. `None` when no route matches.
    pub async fn handle(&self, event: &FetchEvent) -> Option<Result<Response, Error>> {
        let handler = self.handler_for(&event.request.url)?;
        Some(handler.handle(event).await)
    }
}
