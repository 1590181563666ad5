//! Response model with opacity discipline.
//!
//! Responses are cheap to clone: the body is reference-counted
//! [`Bytes`]. Toolkit code never inspects an opaque response's metadata;
//! the [`Response::is_ok`], [`Response::header`], and [`Response::date`]
//! accessors enforce that, so callers that go through them cannot make
//! caching decisions from data they are not supposed to see.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, StatusCode, header};
use url::Url;

use crate::Error;

/// How a response relates to the requesting context.
///
/// Opaque responses are unreadable: status, headers, and freshness data
/// are hidden from every caching decision, and they are never
/// freshness-checked (always treated as fresh).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Basic,
    Cors,
    Opaque,
}

impl ResponseKind {
    /// Stable string form used by the response store.
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Cors => "cors",
            ResponseKind::Opaque => "opaque",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(ResponseKind::Basic),
            "cors" => Some(ResponseKind::Cors),
            "opaque" => Some(ResponseKind::Opaque),
            _ => None,
        }
    }
}

/// A fetched or cached response.
#[derive(Debug, Clone)]
pub struct Response {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub kind: ResponseKind,
}

impl Response {
    /// Create a basic response.
    pub fn new(url: Url, status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self { url, status, headers: HeaderMap::new(), body: body.into(), kind: ResponseKind::Basic }
    }

    /// Attach a header, replacing any previous value. Invalid header
    /// data is rejected.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, Error> {
        let name: header::HeaderName =
            name.parse().map_err(|_| Error::InvalidHeader(format!("name: {name}")))?;
        let value = value
            .parse()
            .map_err(|_| Error::InvalidHeader(format!("value for {name}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Reclassify the response.
    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether the response is a success a cache would store by default.
    ///
    /// Opaque responses are never ok: their real status is not readable.
    pub fn is_ok(&self) -> bool {
        self.kind != ResponseKind::Opaque && self.status.is_success()
    }

    /// Read a response header as a string. Hidden for opaque responses.
    pub fn header(&self, name: &str) -> Option<&str> {
        if self.kind == ResponseKind::Opaque {
            return None;
        }
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `Date` header, parsed. `None` when absent, unparseable, or the
    /// response is opaque.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        let raw = self.header(header::DATE.as_str())?;
        DateTime::parse_from_rfc2822(raw).ok().map(|d| d.with_timezone(&Utc))
    }
}
