//! Per-cache-name timestamp index.
//!
//! Expiration keeps one database per cache name, holding a single table
//! named after the cache: `url` is the primary key, `timestamp` (epoch
//! milliseconds of the last store) carries a non-unique index. The table
//! is created on demand when the index is opened.
//!
//! Every operation runs in its own transaction; in particular the two
//! scan operations never share one, so a sweep that scans twice opens two.

use super::EXPIRATION_DB_PREFIX;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::{Connection, params};

/// One row of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampRecord {
    pub url: String,
    pub timestamp: i64,
}

/// Timestamp index for one cache name.
#[derive(Clone, Debug)]
pub struct TimestampIndex {
    conn: Connection,
    table: String,
}

impl TimestampIndex {
    /// Open (and create if needed) the index database for a cache name.
    pub async fn open(dir: impl AsRef<Path>, cache_name: &str) -> Result<Self, Error> {
        let path = dir.as_ref().join(db_file_name(cache_name));
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::configure(conn, cache_name).await
    }

    /// Open an in-memory index for testing.
    pub async fn open_in_memory(cache_name: &str) -> Result<Self, Error> {
        let conn = Connection::open_in_memory().await.map_err(|e| Error::Database(e.into()))?;
        Self::configure(conn, cache_name).await
    }

    async fn configure(conn: Connection, cache_name: &str) -> Result<Self, Error> {
        if cache_name.trim().is_empty() {
            return Err(Error::InvalidCacheName("cache name must not be empty".to_string()));
        }
        let table = cache_name.to_string();
        let create = format!(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             CREATE TABLE IF NOT EXISTS {t} (
                 url TEXT PRIMARY KEY,
                 timestamp INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS {idx} ON {t} (timestamp);",
            t = quote_ident(&table),
            idx = quote_ident(&format!("{table}_timestamp")),
        );
        conn.call(move |conn| {
            conn.execute_batch(&create)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;
        Ok(Self { conn, table })
    }

    /// Upsert the timestamp for a URL.
    pub async fn put(&self, url: &str, timestamp: i64) -> Result<(), Error> {
        let sql = format!(
            "INSERT INTO {t} (url, timestamp) VALUES (?1, ?2)
             ON CONFLICT(url) DO UPDATE SET timestamp = excluded.timestamp",
            t = quote_ident(&self.table),
        );
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(&sql, params![url, timestamp])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the record for a URL. Returns whether one existed.
    pub async fn delete_by_url(&self, url: &str) -> Result<bool, Error> {
        let sql = format!("DELETE FROM {t} WHERE url = ?1", t = quote_ident(&self.table));
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(&sql, params![url])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of records in the index.
    pub async fn count(&self) -> Result<u64, Error> {
        let sql = format!("SELECT COUNT(*) FROM {t}", t = quote_ident(&self.table));
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Every record, oldest first.
    pub async fn records_ascending(&self) -> Result<Vec<TimestampRecord>, Error> {
        let sql = format!(
            "SELECT url, timestamp FROM {t} ORDER BY timestamp ASC, rowid ASC",
            t = quote_ident(&self.table),
        );
        self.conn
            .call(move |conn| -> Result<Vec<TimestampRecord>, Error> {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(TimestampRecord { url: row.get(0)?, timestamp: row.get(1)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }

    /// The `limit` least-recently-stored URLs, oldest first.
    pub async fn oldest_urls(&self, limit: u64) -> Result<Vec<String>, Error> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT url FROM {t} ORDER BY timestamp ASC, rowid ASC LIMIT ?1",
            t = quote_ident(&self.table),
        );
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![limit as i64], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }
}

/// Database file name for a cache name's index.
///
/// Cache names routinely contain scope URLs; anything the filesystem
/// might object to is mapped to `_`.
pub fn db_file_name(cache_name: &str) -> String {
    let sanitized: String = cache_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    format!("{EXPIRATION_DB_PREFIX}{sanitized}.sqlite")
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
