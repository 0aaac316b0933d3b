//! Store Module
//!
//! The seam between the cache facade and whatever document database backs it.
//!
//! The facade only ever needs four primitives (upsert, find-one, delete-one,
//! delete-many) over schema-less documents, filtered by one of three shapes:
//! an exact key, an expiration cutoff, or everything. Drivers implement
//! [`DocumentCollection`] for a single collection handle and [`StoreDriver`]
//! to open handles by name.

mod memory;

pub use memory::{MemoryCollection, MemoryStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// == Document ==
/// A schema-less store document: arbitrary nested fields, no fixed shape.
pub type Document = serde_json::Map<String, Value>;

// == Filter ==
/// The closed set of document selections the cache issues against a store.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Match every document in the collection
    All,
    /// Match the unique document whose `key` field equals the given string
    Key(String),
    /// Match every document whose `expire` field is at or before the cutoff
    ExpiredBy(DateTime<Utc>),
}

impl Filter {
    /// Key filter from anything string-like.
    pub fn key(key: impl Into<String>) -> Self {
        Filter::Key(key.into())
    }
}

// == Delete Result ==
/// Outcome of a delete operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    /// Number of documents removed
    pub deleted_count: u64,
}

// == Store Error ==
/// Failure reported by a store driver.
///
/// Drivers fold their native error types into this one; the cache never
/// inspects it beyond logging or wrapping it.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    /// A store error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// A store error wrapping the driver-native cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Convenience Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Document Collection Trait ==
/// One collection of schema-less documents inside an external store.
///
/// Implementations must be cheap to clone (a handle, not the data) so the
/// cache can hand copies to detached tasks. Each method is a single store
/// round-trip; atomicity of the individual primitive is the driver's
/// responsibility.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Replace-or-insert the unique document matching `filter`.
    ///
    /// Returns the document as stored.
    async fn upsert(&self, filter: Filter, replacement: Document) -> StoreResult<Option<Document>>;

    /// Fetch the first document matching `filter`, if any.
    async fn find_one(&self, filter: Filter) -> StoreResult<Option<Document>>;

    /// Delete at most one document matching `filter`.
    async fn delete_one(&self, filter: Filter) -> StoreResult<DeleteResult>;

    /// Delete every document matching `filter`.
    async fn delete_many(&self, filter: Filter) -> StoreResult<DeleteResult>;
}

// == Store Driver Trait ==
/// Opens named collection handles inside a store.
pub trait StoreDriver {
    /// The collection handle type this driver produces.
    type Collection: DocumentCollection + Clone + Send + Sync + 'static;

    /// Derive a handle to the collection with the given name, creating it if
    /// the store requires that.
    fn collection(&self, name: &str) -> Self::Collection;
}
