//! Cache Entry Module
//!
//! Defines the document shape persisted for each cached key.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{Document, StoreError};

// == Cache Entry ==
/// A single cache entry as it round-trips through the document store.
///
/// The store holds at most one entry per `key` (enforced by upsert-by-key).
/// An entry whose `expire` instant has been reached is logically absent even
/// while physically still present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Caller-chosen unique identifier
    pub key: String,
    /// Absolute instant after which the entry is stale
    pub expire: DateTime<Utc>,
    /// Opaque caller payload, never inspected by the cache
    pub data: Value,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry expiring `ttl` after the current instant.
    ///
    /// An offset that would leave the representable timestamp range saturates
    /// to the nearest bound instead of overflowing.
    pub fn new(key: impl Into<String>, data: Value, ttl: TimeDelta) -> Self {
        let expire = Utc::now().checked_add_signed(ttl).unwrap_or(if ttl < TimeDelta::zero() {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        });
        Self {
            key: key.into(),
            expire,
            data,
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its `expire` instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire <= now
    }

    // == Document Conversion ==
    /// Serializes the entry into a schema-less store document.
    ///
    /// The `expire` field becomes an RFC 3339 string, so documents written by
    /// different producers stay comparable inside the store.
    pub fn to_document(&self) -> std::result::Result<Document, StoreError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(doc)) => Ok(doc),
            Ok(_) => Err(StoreError::new("cache entry did not serialize to a document")),
            Err(err) => Err(StoreError::with_source(
                "failed to serialize cache entry",
                err,
            )),
        }
    }

    /// Reads an entry back out of a store document.
    pub fn from_document(doc: Document) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(doc))
    }
}
