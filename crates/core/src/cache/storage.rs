//! Cache storage operations: the set of named caches.
//!
//! Mirrors the shape of a browser's cache storage: caches are opened by
//! name (created if absent), enumerated, deleted as a whole, and searched
//! together in creation order.

use super::connection::CacheDb;
use super::entries::{CachedResponse, NamedCache, RequestKey, decode_response, read_response};
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Summary of one named cache.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheSummary {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
}

impl CacheDb {
    /// Open the cache called `name`, creating it if it doesn't exist.
    pub async fn open_cache(&self, name: &str) -> Result<NamedCache, Error> {
        let owned = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
                    params![owned, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(NamedCache::new(self.clone(), name.to_string()))
    }

    /// Names of all caches, oldest first.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Whether a cache called `name` exists.
    pub async fn has_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Handle to the cache called `name` if it still exists. Unlike
    /// [`CacheDb::open_cache`] this never creates it.
    pub async fn existing_cache(&self, name: &str) -> Result<Option<NamedCache>, Error> {
        if self.has_cache(name).await? {
            Ok(Some(NamedCache::new(self.clone(), name.to_string())))
        } else {
            Ok(None)
        }
    }

    /// Delete the cache called `name` and every entry in it.
    ///
    /// Returns whether the cache existed.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `key` across every cache, returning the match from the
    /// oldest cache that has one.
    pub async fn match_any(&self, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        let hash = key.hash();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let result = conn.query_row(
                    "SELECT e.url, e.status, e.headers_json, e.body, e.stored_at
                    FROM entries e JOIN caches c ON c.name = e.cache_name
                    WHERE e.key_hash = ?1
                    ORDER BY c.rowid LIMIT 1",
                    params![hash],
                    read_response,
                );

                match result {
                    Ok(raw) => decode_response(raw).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Name, creation time and entry count of every cache, oldest first.
    pub async fn cache_summaries(&self) -> Result<Vec<CacheSummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<CacheSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT c.name, c.created_at, COUNT(e.key_hash)
                    FROM caches c LEFT JOIN entries e ON e.cache_name = c.name
                    GROUP BY c.name ORDER BY c.rowid",
                )?;
                let summaries = stmt
                    .query_map([], |row| {
                        Ok(CacheSummary {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(summaries)
            })
            .await
            .map_err(Error::from)
    }
}
