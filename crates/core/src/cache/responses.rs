//! Named response stores keyed by request fingerprint.
//!
//! One `responses` table holds every partition; a [`CacheHandle`] binds
//! one cache name and exposes the match/put/delete surface strategies
//! build on. A put captures the request header values the response
//! declares itself to vary on, so one URL can hold several variants.

use super::connection::CacheDb;
use super::hash::compute_fingerprint;
use crate::{Error, Request, Response, ResponseKind};
use http::{HeaderMap, StatusCode, header};
use std::path::Path;
use tokio_rusqlite::params;

/// Options controlling how a request is matched against stored entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOptions {
    /// Ignore the query string when comparing URLs.
    pub ignore_search: bool,
    /// Ignore the request method.
    pub ignore_method: bool,
    /// Ignore the stored vary header values.
    pub ignore_vary: bool,
}

/// The response store: every named cache, one database.
#[derive(Clone, Debug)]
pub struct ResponseStore {
    db: CacheDb,
}

impl ResponseStore {
    /// Open the store at the given path, creating it if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self { db: CacheDb::open(path).await? })
    }

    /// Open an in-memory store for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        Ok(Self { db: CacheDb::open_in_memory().await? })
    }

    /// Open a named cache partition.
    pub async fn open_cache(&self, name: &str) -> Result<CacheHandle, Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidCacheName("cache name must not be empty".to_string()));
        }
        Ok(CacheHandle { db: self.db.clone(), name: name.to_string() })
    }
}

/// Handle to one cache partition.
#[derive(Clone, Debug)]
pub struct CacheHandle {
    db: CacheDb,
    name: String,
}

struct StoredRow {
    method: String,
    url: String,
    vary_json: String,
    status: i64,
    headers_json: String,
    body: Vec<u8>,
    kind: String,
}

impl CacheHandle {
    /// The cache name this handle is bound to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a response under the request's fingerprint, replacing any
    /// previous entry with the same fingerprint.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        let vary = vary_values(request, response);
        let vary_json = serde_json::to_string(&vary).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let vary_key = if vary.is_empty() { String::new() } else { vary_json.clone() };
        let key_hash = compute_fingerprint(request.method.as_str(), request.url.as_str(), &vary_key);

        let name = self.name.clone();
        let method = request.method.as_str().to_string();
        let url = request.url.to_string();
        let url_no_search = request.url_without_search();
        let status = response.status.as_u16() as i64;
        let headers_json = headers_to_json(&response.headers)?;
        let body = response.body.to_vec();
        let kind = response.kind.as_str().to_string();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO responses (
                        cache_name, key_hash, method, url, url_no_search, vary_json,
                        status, headers_json, body, kind, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    ON CONFLICT(cache_name, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        url_no_search = excluded.url_no_search,
                        vary_json = excluded.vary_json,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        kind = excluded.kind,
                        stored_at = excluded.stored_at",
                    params![
                        name,
                        key_hash,
                        method,
                        url,
                        url_no_search,
                        vary_json,
                        status,
                        headers_json,
                        body,
                        kind,
                        stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!(cache = %self.name, url = %request.url, "stored response");
        Ok(())
    }

    /// Look up a stored response for the request.
    ///
    /// Candidates are read in insertion order; the first one passing the
    /// URL, method, and vary filters wins. Returns `None` on miss.
    pub async fn match_request(
        &self, request: &Request, options: &MatchOptions,
    ) -> Result<Option<Response>, Error> {
        let name = self.name.clone();
        let url_no_search = request.url_without_search();
        let rows = self
            .db
            .conn
            .call(move |conn| -> Result<Vec<StoredRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, vary_json, status, headers_json, body, kind
                     FROM responses
                     WHERE cache_name = ?1 AND url_no_search = ?2
                     ORDER BY rowid ASC",
                )?;
                let rows = stmt
                    .query_map(params![name, url_no_search], |row| {
                        Ok(StoredRow {
                            method: row.get(0)?,
                            url: row.get(1)?,
                            vary_json: row.get(2)?,
                            status: row.get(3)?,
                            headers_json: row.get(4)?,
                            body: row.get(5)?,
                            kind: row.get(6)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        let url = request.url.as_str();
        for row in rows {
            if !options.ignore_search && row.url != url {
                continue;
            }
            if !options.ignore_method && row.method != request.method.as_str() {
                continue;
            }
            if !options.ignore_vary {
                let vary: Vec<(String, Option<String>)> =
                    serde_json::from_str(&row.vary_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
                let matches = vary
                    .iter()
                    .all(|(name, value)| request.header(name).map(str::to_string) == *value);
                if !matches {
                    continue;
                }
            }
            return decode_row(row).map(Some);
        }
        Ok(None)
    }

    /// Remove every variant stored for the request's method and URL.
    pub async fn delete(&self, request: &Request) -> Result<bool, Error> {
        let name = self.name.clone();
        let method = request.method.as_str().to_string();
        let url = request.url.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM responses WHERE cache_name = ?1 AND method = ?2 AND url = ?3",
                    params![name, method, url],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove every entry stored for a URL, regardless of method or
    /// variant. Expiration deletes by URL because that is all the
    /// timestamp index records.
    pub async fn delete_url(&self, url: &str) -> Result<bool, Error> {
        let name = self.name.clone();
        let url = url.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM responses WHERE cache_name = ?1 AND url = ?2",
                    params![name, url],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

fn decode_row(row: StoredRow) -> Result<Response, Error> {
    let url = url::Url::parse(&row.url).map_err(|e| Error::CorruptEntry(e.to_string()))?;
    let status = StatusCode::from_u16(row.status as u16)
        .map_err(|_| Error::CorruptEntry(format!("status {}", row.status)))?;
    let headers = headers_from_json(&row.headers_json)?;
    let kind = ResponseKind::parse(&row.kind)
        .ok_or_else(|| Error::CorruptEntry(format!("response kind {}", row.kind)))?;
    Ok(Response { url, status, headers, body: row.body.into(), kind })
}

/// Capture the request header values a response varies on.
///
/// Opaque responses expose no headers, so they never vary. `Vary: *` is
/// treated as no vary. Names are lowercased and sorted so the fingerprint
/// does not depend on header order.
fn vary_values(request: &Request, response: &Response) -> Vec<(String, Option<String>)> {
    let Some(vary) = response.header(header::VARY.as_str()) else {
        return Vec::new();
    };
    let mut values: Vec<(String, Option<String>)> = vary
        .split(',')
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty() && name != "*")
        .map(|name| {
            let value = request.header(&name).map(str::to_string);
            (name, value)
        })
        .collect();
    values.sort();
    values.dedup();
    values
}

fn headers_to_json(headers: &HeaderMap) -> Result<String, Error> {
    let pairs: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| {
            (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
        })
        .collect();
    serde_json::to_string(&pairs).map_err(|e| Error::CorruptEntry(e.to_string()))
}

fn headers_from_json(raw: &str) -> Result<HeaderMap, Error> {
    let pairs: Vec<(String, String)> =
        serde_json::from_str(raw).map_err(|e| Error::CorruptEntry(e.to_string()))?;
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let name: header::HeaderName =
            name.parse().map_err(|_| Error::CorruptEntry(format!("header name {name}")))?;
        let value = value
            .parse()
            .map_err(|_| Error::CorruptEntry(format!("header value for {name}")))?;
        headers.append(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    async fn open_test_cache(name: &str) -> CacheHandle {
        let store = ResponseStore::open_in_memory().await.unwrap();
        store.open_cache(name).await.unwrap()
    }

    fn response_for(request: &Request, body: &str) -> Response {
        Response::new(request.url.clone(), StatusCode::OK, body.to_string())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let cache = open_test_cache("t1").await;
        let request = Request::get("https://example.com/a.css").unwrap();
        cache.put(&request, &response_for(&request, "x")).await.unwrap();

        let found = cache.match_request(&request, &MatchOptions::default()).await.unwrap().unwrap();
        assert_eq!(found.body.as_ref(), b"x");
        assert_eq!(found.status, StatusCode::OK);
        assert_eq!(found.kind, ResponseKind::Basic);
    }

    #[tokio::test]
    async fn test_match_miss() {
        let cache = open_test_cache("t1").await;
        let request = Request::get("https://example.com/missing").unwrap();
        let found = cache.match_request(&request, &MatchOptions::default()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_same_fingerprint() {
        let cache = open_test_cache("t1").await;
        let request = Request::get("https://example.com/a").unwrap();
        cache.put(&request, &response_for(&request, "old")).await.unwrap();
        cache.put(&request, &response_for(&request, "new")).await.unwrap();

        let found = cache.match_request(&request, &MatchOptions::default()).await.unwrap().unwrap();
        assert_eq!(found.body.as_ref(), b"new");
    }

    #[tokio::test]
    async fn test_cache_names_partition() {
        let store = ResponseStore::open_in_memory().await.unwrap();
        let first = store.open_cache("first").await.unwrap();
        let second = store.open_cache("second").await.unwrap();
        let request = Request::get("https://example.com/shared").unwrap();
        first.put(&request, &response_for(&request, "x")).await.unwrap();

        assert!(first.match_request(&request, &MatchOptions::default()).await.unwrap().is_some());
        assert!(second.match_request(&request, &MatchOptions::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ignore_search() {
        let cache = open_test_cache("t1").await;
        let stored = Request::get("https://example.com/page?v=1").unwrap();
        cache.put(&stored, &response_for(&stored, "x")).await.unwrap();

        let probe = Request::get("https://example.com/page?v=2").unwrap();
        assert!(cache.match_request(&probe, &MatchOptions::default()).await.unwrap().is_none());

        let options = MatchOptions { ignore_search: true, ..Default::default() };
        assert!(cache.match_request(&probe, &options).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ignore_method() {
        let cache = open_test_cache("t1").await;
        let stored = Request::get("https://example.com/page").unwrap();
        cache.put(&stored, &response_for(&stored, "x")).await.unwrap();

        let probe = Request::new(Method::HEAD, stored.url.clone());
        assert!(cache.match_request(&probe, &MatchOptions::default()).await.unwrap().is_none());

        let options = MatchOptions { ignore_method: true, ..Default::default() };
        assert!(cache.match_request(&probe, &options).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_vary_header_matching() {
        let cache = open_test_cache("t1").await;
        let stored = Request::get("https://example.com/page").unwrap().with_header("accept-language", "de").unwrap();
        let response = response_for(&stored, "de-page").with_header("vary", "Accept-Language").unwrap();
        cache.put(&stored, &response).await.unwrap();

        let same = Request::get("https://example.com/page").unwrap().with_header("accept-language", "de").unwrap();
        assert!(cache.match_request(&same, &MatchOptions::default()).await.unwrap().is_some());

        let other = Request::get("https://example.com/page").unwrap().with_header("accept-language", "en").unwrap();
        assert!(cache.match_request(&other, &MatchOptions::default()).await.unwrap().is_none());

        let options = MatchOptions { ignore_vary: true, ..Default::default() };
        assert!(cache.match_request(&other, &options).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_vary_variants_coexist() {
        let cache = open_test_cache("t1").await;
        let de = Request::get("https://example.com/page").unwrap().with_header("accept-language", "de").unwrap();
        let en = Request::get("https://example.com/page").unwrap().with_header("accept-language", "en").unwrap();
        cache
            .put(&de, &response_for(&de, "de-page").with_header("vary", "accept-language").unwrap())
            .await
            .unwrap();
        cache
            .put(&en, &response_for(&en, "en-page").with_header("vary", "accept-language").unwrap())
            .await
            .unwrap();

        let found = cache.match_request(&en, &MatchOptions::default()).await.unwrap().unwrap();
        assert_eq!(found.body.as_ref(), b"en-page");
        let found = cache.match_request(&de, &MatchOptions::default()).await.unwrap().unwrap();
        assert_eq!(found.body.as_ref(), b"de-page");
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = open_test_cache("t1").await;
        let request = Request::get("https://example.com/a").unwrap();
        cache.put(&request, &response_for(&request, "x")).await.unwrap();

        assert!(cache.delete(&request).await.unwrap());
        assert!(!cache.delete(&request).await.unwrap());
        assert!(cache.match_request(&request, &MatchOptions::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_url_removes_variants() {
        let cache = open_test_cache("t1").await;
        let de = Request::get("https://example.com/page").unwrap().with_header("accept-language", "de").unwrap();
        let en = Request::get("https://example.com/page").unwrap().with_header("accept-language", "en").unwrap();
        cache
            .put(&de, &response_for(&de, "de").with_header("vary", "accept-language").unwrap())
            .await
            .unwrap();
        cache
            .put(&en, &response_for(&en, "en").with_header("vary", "accept-language").unwrap())
            .await
            .unwrap();

        assert!(cache.delete_url("https://example.com/page").await.unwrap());
        assert!(cache.match_request(&de, &MatchOptions::default()).await.unwrap().is_none());
        assert!(cache.match_request(&en, &MatchOptions::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_cache_name_rejected() {
        let store = ResponseStore::open_in_memory().await.unwrap();
        let result = store.open_cache("  ").await;
        assert!(matches!(result, Err(Error::InvalidCacheName(_))));
    }

    #[tokio::test]
    async fn test_headers_survive_roundtrip() {
        let cache = open_test_cache("t1").await;
        let request = Request::get("https://example.com/a").unwrap();
        let response = response_for(&request, "x").with_header("content-type", "text/css").unwrap();
        cache.put(&request, &response).await.unwrap();

        let found = cache.match_request(&request, &MatchOptions::default()).await.unwrap().unwrap();
        assert_eq!(found.header("content-type"), Some("text/css"));
    }
}
