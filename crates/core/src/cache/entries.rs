//! Entries inside a single named cache.
//!
//! A [`NamedCache`] is a handle to one cache generation. Writes never
//! recreate a cache that has been deleted: a write racing an activation
//! that retired its generation fails instead of resurrecting it.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Normalized identity of a cached request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: &str, url: &str) -> Self {
        Self { method: method.to_ascii_uppercase(), url: url.to_string() }
    }

    /// Key for a GET request, the only kind that is ever stored.
    pub fn get(url: &str) -> Self {
        Self::new("GET", url)
    }

    /// Storage hash of this key.
    pub fn hash(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// URL the response was fetched from.
    pub url: String,
    pub status: u16,
    /// Header name/value pairs in the order they were received.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// RFC3339 timestamp of when the entry was written.
    pub stored_at: String,
}

impl CachedResponse {
    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Handle to one named cache.
#[derive(Clone, Debug)]
pub struct NamedCache {
    db: CacheDb,
    name: String,
}

fn insert_entry(conn: &rusqlite::Connection, cache: &str, key: &RequestKey, response: &CachedResponse) -> Result<(), Error> {
    if key.method != "GET" {
        return Err(Error::InvalidInput(format!("only GET requests can be cached, got {}", key.method)));
    }
    let headers_json = serde_json::to_string(&response.headers)?;
    conn.execute(
        "INSERT INTO entries (cache_name, key_hash, method, url, status, headers_json, body, stored_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(cache_name, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            cache,
            key.hash(),
            &key.method,
            &key.url,
            response.status,
            headers_json,
            &response.body,
            &response.stored_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn read_response(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, u16, String, Vec<u8>, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

pub(crate) fn decode_response(
    (url, status, headers_json, body, stored_at): (String, u16, String, Vec<u8>, String),
) -> Result<CachedResponse, Error> {
    let headers = serde_json::from_str(&headers_json)?;
    Ok(CachedResponse { url, status, headers, body, stored_at })
}

impl NamedCache {
    pub(crate) fn new(db: CacheDb, name: String) -> Self {
        Self { db, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a response under `key`, replacing any previous entry.
    ///
    /// Fails if the cache has been deleted since this handle was opened.
    pub async fn put(&self, key: &RequestKey, response: &CachedResponse) -> Result<(), Error> {
        let name = self.name.clone();
        let key = key.clone();
        let response = response.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> { insert_entry(conn, &name, &key, &response) })
            .await
            .map_err(Error::from)
    }

    /// Store several responses in one transaction: either all land or none do.
    pub async fn put_all(&self, entries: Vec<(RequestKey, CachedResponse)>) -> Result<(), Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for (key, response) in &entries {
                    insert_entry(&tx, &name, key, response)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `key` in this cache only.
    pub async fn match_key(&self, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        let name = self.name.clone();
        let hash = key.hash();
        self.db
            .conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let result = conn.query_row(
                    "SELECT url, status, headers_json, body, stored_at
                    FROM entries WHERE cache_name = ?1 AND key_hash = ?2",
                    params![name, hash],
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

    /// Remove `key` from this cache. Returns whether an entry existed.
    pub async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        let name = self.name.clone();
        let hash = key.hash();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE cache_name = ?1 AND key_hash = ?2",
                    params![name, hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Request keys stored in this cache, in URL order.
    pub async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE cache_name = ?1 ORDER BY url")?;
                let keys = stmt
                    .query_map(params![name], |row| Ok(RequestKey { method: row.get(0)?, url: row.get(1)? }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this cache.
    pub async fn len(&self) -> Result<u64, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE cache_name = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
