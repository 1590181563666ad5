//! SQLite-backed storage for cached responses and their timestamps.
//!
//! Two stores live here:
//!
//! - The response store: one database, one `responses` table partitioned
//!   by cache name, keyed by a SHA-256 fingerprint of
//!   `method + url + vary values`.
//! - The timestamp index: one database per cache name, one table named
//!   after the cache, recording when each URL was last stored. Expiration
//!   walks it in timestamp order.
//!
//! Both use WAL mode with NORMAL synchronous and run their operations on
//! a background thread via tokio-rusqlite.

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod responses;
pub mod timestamps;

pub use crate::Error;

pub use connection::CacheDb;
pub use responses::{CacheHandle, MatchOptions, ResponseStore};
pub use timestamps::{TimestampIndex, TimestampRecord};

/// Prefix for runtime cache names derived from a registration scope.
pub const RUNTIME_CACHE_PREFIX: &str = "sw-runtime-caching-";

/// Prefix for the per-cache-name expiration databases.
pub const EXPIRATION_DB_PREFIX: &str = "sw-cache-expiration-";

/// Derive the default cache name for a registration scope.
///
/// Multiple workers on one origin get distinct scopes, so deriving the
/// name from the scope keeps their caches from colliding.
pub fn default_cache_name(scope: &str) -> String {
    format!("{RUNTIME_CACHE_PREFIX}{scope}")
}
