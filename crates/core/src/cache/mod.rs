//! SQLite-backed cache storage for versioned response caches.
//!
//! This module provides persistent, request-addressed caches using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named cache generations, opened by name and deleted as a whole
//! - Request-addressed entries using SHA-256 hashing of method and URL
//! - Cross-cache lookups in creation order
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CachedResponse, NamedCache, RequestKey};
pub use storage::CacheSummary;
