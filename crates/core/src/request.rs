//! Outbound request model.
//!
//! A [`Request`] is the fingerprint the response store keys on: method,
//! URL, and whatever headers a stored response declared itself to vary on.
//! Fragments are stripped at construction since they never reach the wire.

use http::{HeaderMap, Method};
use url::Url;

use crate::Error;

/// An outbound request, and the key used against the response store.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl Request {
    /// Create a request with an explicit method.
    pub fn new(method: Method, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method, url, headers: HeaderMap::new() }
    }

    /// Create a GET request from a URL string.
    pub fn get(url: &str) -> Result<Self, Error> {
        let url = Url::parse(url.trim()).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self::new(Method::GET, url))
    }

    /// Attach a header, replacing any previous value. Invalid header data
    /// is rejected.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, Error> {
        let name: http::header::HeaderName =
            name.parse().map_err(|_| Error::InvalidHeader(format!("name: {name}")))?;
        let value = value
            .parse()
            .map_err(|_| Error::InvalidHeader(format!("value for {name}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Read a request header as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The request URL without its query string.
    pub fn url_without_search(&self) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_strips_fragment() {
        let request = Request::get("https://example.com/page#section").unwrap();
        assert_eq!(request.url.fragment(), None);
        assert_eq!(request.url.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_get_preserves_query() {
        let request = Request::get("https://example.com/page?a=1&b=2").unwrap();
        assert_eq!(request.url.query(), Some("a=1&b=2"));
        assert_eq!(request.url_without_search(), "https://example.com/page");
    }

    #[test]
    fn test_get_invalid_url() {
        let result = Request::get("not a url");
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_header_roundtrip() {
        let request = Request::get("https://example.com/").unwrap().with_header("accept-language", "de").unwrap();
        assert_eq!(request.header("accept-language"), Some("de"));
        assert_eq!(request.header("accept-encoding"), None);
    }
}
