//! HTTP fetch pipeline.
//!
//! One shared [`FetchClient`] performs every network call; wrappers pass
//! their per-strategy [`FetchOptions`] alongside each request. Unlike a
//! bare HTTP client, the fetch pipeline:
//!
//! - returns non-2xx responses to the caller (the caching policy decides
//!   what to do with a 404, not the transport)
//! - caps body reads at the configured byte limit
//! - classifies each response as basic, cors, or opaque against the
//!   runtime's scope origin

use bytes::Bytes;
use http::HeaderMap;
use reqwest::Client;
use std::time::{Duration, Instant};
use url::{Origin, Url};

use stratus_core::{Error, Request, Response, ResponseKind, RuntimeConfig};

/// How the outbound request relates to the scope origin.
///
/// A cross-origin no-cors fetch yields an opaque response: stored and
/// served, but unreadable to every caching decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMode {
    #[default]
    Cors,
    NoCors,
}

/// Per-wrapper fetch options, merged into every request the wrapper sends.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Extra headers applied on top of the request's own.
    pub headers: HeaderMap,
    /// Request mode used for response classification.
    pub mode: FetchMode,
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "stratus/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Origin of the registration scope, when the scope is an absolute
    /// URL. `None` means every response is treated as same-origin.
    pub scope_origin: Option<Origin>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "stratus/0.1".to_string(),
            timeout: Duration::from_millis(20_000),
            max_redirects: 5,
            max_bytes: 5 * 1024 * 1024,
            scope_origin: None,
        }
    }
}

impl From<&RuntimeConfig> for FetchConfig {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
            max_bytes: config.max_bytes,
            scope_origin: Url::parse(&config.scope).ok().map(|u| u.origin()),
        }
    }
}

/// HTTP fetch client shared by every wrapper of a runtime.
#[derive(Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::FetchFailed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Send a request to the network.
    ///
    /// The returned response keeps the request's URL as its identity; the
    /// post-redirect URL only shows up in the trace line.
    pub async fn fetch(&self, request: &Request, options: &FetchOptions) -> Result<Response, Error> {
        let start = Instant::now();

        let mut headers = request.headers.clone();
        for (name, value) in options.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| Error::FetchFailed(format!("network error: {e}")))?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchFailed(format!("{len} bytes exceeds {}", self.config.max_bytes)));
        }

        let bytes: Bytes = response
            .bytes()
            .await
            .map_err(|e| Error::FetchFailed(format!("failed to read response: {e}")))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchFailed(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let kind = classify(&request.url, self.config.scope_origin.as_ref(), options.mode);

        tracing::debug!(
            "fetched {} -> {} {} in {}ms ({} bytes, {})",
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len(),
            kind.as_str(),
        );

        Ok(Response { url: request.url.clone(), status, headers, body: bytes, kind })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

/// Classify a response by where its request went.
fn classify(url: &Url, scope_origin: Option<&Origin>, mode: FetchMode) -> ResponseKind {
    match scope_origin {
        Some(origin) if url.origin() != *origin => match mode {
            FetchMode::Cors => ResponseKind::Cors,
            FetchMode::NoCors => ResponseKind::Opaque,
        },
        _ => ResponseKind::Basic,
    }
}
