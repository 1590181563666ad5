//! Cache expiration plugin.
//!
//! Evicts by count (least-recently-stored first) and by age (the
//! response's `Date` header against `max_age_seconds`), keeping one
//! timestamp index per cache name in sync with the response store.
//!
//! The plugin registers two hooks: `cache_will_match` gates reads on
//! freshness, and `cache_did_update` records the write time, then kicks
//! off an eviction sweep on a detached task. The hook returns once the
//! timestamp is durable; it does not wait for the sweep.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use stratus_core::{CacheHandle, Error, Response, ResponseStore, TimestampIndex};

use crate::plugins::{Hook, Plugin};
use crate::runtime::{IndexLocation, Runtime};

/// Eviction limits. At least one must be set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpirationOptions {
    /// Maximum number of entries to keep per cache name.
    pub max_entries: Option<u64>,
    /// Maximum age, in seconds, a cached response stays servable.
    pub max_age_seconds: Option<u64>,
}

struct Inner {
    max_entries: Option<u64>,
    max_age_seconds: Option<u64>,
    store: ResponseStore,
    index_location: IndexLocation,
    indexes: Mutex<HashMap<String, TimestampIndex>>,
    caches: Mutex<HashMap<String, CacheHandle>>,
}

/// LRU + max-age eviction plugin.
///
/// Cloning is cheap; clones share the memoised index and cache handles.
#[derive(Clone)]
pub struct CacheExpiration {
    inner: Arc<Inner>,
}

impl CacheExpiration {
    /// Build the plugin.
    ///
    /// Fails with `max-entries-or-age-required` when neither limit is
    /// set, and with the per-field errors when a limit is zero.
    pub fn new(runtime: &Runtime, options: ExpirationOptions) -> Result<Self, Error> {
        if options.max_entries.is_none() && options.max_age_seconds.is_none() {
            return Err(Error::MaxEntriesOrAgeRequired);
        }
        if let Some(max_entries) = options.max_entries
            && max_entries == 0
        {
            return Err(Error::MaxEntriesMustBeNumber(max_entries));
        }
        if let Some(max_age) = options.max_age_seconds
            && max_age == 0
        {
            return Err(Error::MaxAgeSecondsMustBeNumber(max_age));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                max_entries: options.max_entries,
                max_age_seconds: options.max_age_seconds,
                store: runtime.store().clone(),
                index_location: runtime.index_location().clone(),
                indexes: Mutex::new(HashMap::new()),
                caches: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Whether a cached response is still servable at `now`.
    ///
    /// Freshness reads the `Date` header: absent, unparseable, or hidden
    /// (opaque responses) means fresh. With no `max_age_seconds`
    /// configured everything is fresh.
    pub fn is_response_fresh(&self, response: &Response, now: DateTime<Utc>) -> bool {
        let Some(max_age) = self.inner.max_age_seconds else {
            return true;
        };
        let Some(date) = response.date() else {
            return true;
        };
        date + Duration::seconds(max_age as i64) >= now
    }

    /// Record `now` as the write time for a URL.
    pub async fn update_timestamp(&self, cache_name: &str, url: &str, now: DateTime<Utc>) -> Result<(), Error> {
        let index = self.index_for(cache_name).await?;
        index.put(url, now.timestamp_millis()).await
    }

    /// URLs whose recorded write time is older than the age limit.
    pub async fn find_old_entries(&self, cache_name: &str, now: DateTime<Utc>) -> Result<Vec<String>, Error> {
        let Some(max_age) = self.inner.max_age_seconds else {
            return Ok(Vec::new());
        };
        let cutoff = now.timestamp_millis() - (max_age as i64) * 1000;
        let index = self.index_for(cache_name).await?;
        let urls = index
            .records_ascending()
            .await?
            .into_iter()
            .filter(|record| record.timestamp < cutoff)
            .map(|record| record.url)
            .collect();
        Ok(urls)
    }

    /// URLs beyond the entry limit, least-recently-stored first.
    pub async fn find_extra_entries(&self, cache_name: &str) -> Result<Vec<String>, Error> {
        let Some(max_entries) = self.inner.max_entries else {
            return Ok(Vec::new());
        };
        let index = self.index_for(cache_name).await?;
        let count = index.count().await?;
        if count <= max_entries {
            return Ok(Vec::new());
        }
        index.oldest_urls(count - max_entries).await
    }

    /// Run one eviction sweep and return the URLs it removed.
    ///
    /// After this returns, none of the returned URLs exist in the
    /// response cache or the timestamp index for this cache name.
    pub async fn expire_entries(&self, cache_name: &str, now: DateTime<Utc>) -> Result<Vec<String>, Error> {
        let old = self.find_old_entries(cache_name, now).await?;
        let extra = self.find_extra_entries(cache_name).await?;

        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        for url in old.into_iter().chain(extra) {
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }

        self.delete_from_cache_and_index(cache_name, &urls).await?;
        Ok(urls)
    }

    /// Delete each URL from the response cache, then from the index.
    /// Deletions are awaited one at a time; each index delete runs in
    /// its own transaction.
    pub async fn delete_from_cache_and_index(&self, cache_name: &str, urls: &[String]) -> Result<(), Error> {
        if urls.is_empty() {
            return Ok(());
        }
        let cache = self.cache_for(cache_name).await?;
        let index = self.index_for(cache_name).await?;
        for url in urls {
            cache.delete_url(url).await?;
            index.delete_by_url(url).await?;
        }
        tracing::debug!(cache = cache_name, deleted = urls.len(), "expired cache entries");
        Ok(())
    }

    async fn index_for(&self, cache_name: &str) -> Result<TimestampIndex, Error> {
        let mut indexes = self.inner.indexes.lock().await;
        if let Some(index) = indexes.get(cache_name) {
            return Ok(index.clone());
        }
        let index = self.inner.index_location.open(cache_name).await?;
        indexes.insert(cache_name.to_string(), index.clone());
        Ok(index)
    }

    async fn cache_for(&self, cache_name: &str) -> Result<CacheHandle, Error> {
        let mut caches = self.inner.caches.lock().await;
        if let Some(cache) = caches.get(cache_name) {
            return Ok(cache.clone());
        }
        let cache = self.inner.store.open_cache(cache_name).await?;
        caches.insert(cache_name.to_string(), cache.clone());
        Ok(cache)
    }
}

#[async_trait]
impl Plugin for CacheExpiration {
    fn hooks(&self) -> &[Hook] {
        &[Hook::CacheWillMatch, Hook::CacheDidUpdate]
    }

    async fn cache_will_match(&self, cached_response: Option<Response>) -> Result<Option<Response>, Error> {
        let now = Utc::now();
        Ok(cached_response.filter(|response| self.is_response_fresh(response, now)))
    }

    async fn cache_did_update(
        &self, cache_name: &str, _old_response: Option<&Response>, new_response: &Response,
    ) -> Result<(), Error> {
        let now = Utc::now();
        self.update_timestamp(cache_name, new_response.url.as_str(), now).await?;

        let plugin = self.clone();
        let cache_name = cache_name.to_string();
        tokio::spawn(async move {
            if let Err(err) = plugin.expire_entries(&cache_name, Utc::now()).await {
                tracing::warn!(cache = %cache_name, error = %err, "cache expiration sweep failed");
            }
        });

        Ok(())
    }
}
