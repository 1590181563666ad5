//! Runtime-caching toolkit for stratus.
//!
//! This crate provides the pieces an embedder wires together to serve
//! intercepted requests from the response store:
//!
//! - [`Runtime`] - opens the stores and the shared HTTP client
//! - [`RequestWrapper`] - mediates every fetch and cache operation and
//!   fans out plugin lifecycle hooks
//! - The five caching strategies (cache-first, cache-only, network-only,
//!   network-first, stale-while-revalidate)
//! - [`CacheExpiration`] - LRU + max-age eviction plugin
//! - [`Router`] - minimal URL-pattern dispatch to handlers

pub mod fetch;
pub mod plugins;
pub mod router;
pub mod runtime;
pub mod strategies;
pub mod wrapper;

pub use fetch::{FetchClient, FetchConfig, FetchMode, FetchOptions};
pub use plugins::{CacheExpiration, ExpirationOptions, Hook, Plugin, PluginRegistry};
pub use router::{RoutePattern, Router};
pub use runtime::Runtime;
pub use strategies::{
    CacheFirst, CacheOnly, FetchEvent, Handler, NetworkFirst, NetworkOnly, StaleWhileRevalidate,
};
pub use wrapper::{RequestWrapper, WrapperOptions};
