//! Unified error types for stratus.
//!
//! Every variant's display string begins with a stable kebab-case
//! identifier so callers and tests can match on it without depending on
//! the variant name.

use tokio_rusqlite::rusqlite;

/// Unified error type for the stratus toolkit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two or more plugins registered the cache-will-update transform hook.
    #[error("multiple-cache-will-update-plugins: at most one plugin may implement cache_will_update")]
    MultipleCacheWillUpdatePlugins,

    /// Two or more plugins registered the cache-will-match transform hook.
    #[error("multiple-cache-will-match-plugins: at most one plugin may implement cache_will_match")]
    MultipleCacheWillMatchPlugins,

    /// Cache expiration was configured without any limit.
    #[error("max-entries-or-age-required: expiration needs max_entries or max_age_seconds")]
    MaxEntriesOrAgeRequired,

    /// max_entries is not a usable number.
    #[error("max-entries-must-be-number: max_entries must be a positive integer, got {0}")]
    MaxEntriesMustBeNumber(u64),

    /// max_age_seconds is not a usable number.
    #[error("max-age-seconds-must-be-number: max_age_seconds must be a positive integer, got {0}")]
    MaxAgeSecondsMustBeNumber(u64),

    /// A response the cache-will-update policy refused while the caller
    /// asked to wait on the cache write.
    #[error("invalid-response-for-caching: status {0} was refused by the caching policy")]
    InvalidResponseForCaching(u16),

    /// Cache-only handling found nothing to serve.
    #[error("no-response-received: no cached response for {0}")]
    NoResponseReceived(String),

    /// The network call itself failed.
    #[error("fetch-failed: {0}")]
    FetchFailed(String),

    /// A URL could not be parsed.
    #[error("invalid-url: {0}")]
    InvalidUrl(String),

    /// A header name or value that cannot go on the wire.
    #[error("invalid-header: {0}")]
    InvalidHeader(String),

    /// A cache name the response store cannot partition on.
    #[error("invalid-cache-name: {0}")]
    InvalidCacheName(String),

    /// Database operation failed.
    #[error("cache-error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("cache-error: migration failed: {0}")]
    MigrationFailed(String),

    /// Filesystem failure while preparing the data directory.
    #[error("cache-error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row could not be decoded back into a response.
    #[error("cache-error: corrupt cache entry: {0}")]
    CorruptEntry(String),

    /// A detached background task died before producing its result.
    #[error("background-task-failed: {0}")]
    Background(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
