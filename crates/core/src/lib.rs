//! Core types and storage for stratus.
//!
//! This crate provides:
//! - The request/response model shared by strategies and plugins
//! - The SQLite-backed response store, partitioned by cache name
//! - The per-cache-name timestamp index used for cache expiration
//! - Unified error types and layered configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod request;
pub mod response;

pub use cache::{CacheDb, CacheHandle, MatchOptions, ResponseStore, TimestampIndex, TimestampRecord};
pub use config::{ConfigError, RuntimeConfig};
pub use error::Error;
pub use request::Request;
pub use response::{Response, ResponseKind};
