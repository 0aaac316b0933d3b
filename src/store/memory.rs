//! In-Memory Store Driver
//!
//! A complete in-process implementation of the store seam, backed by hash
//! maps. Useful as a test double and for embedding the cache without an
//! external database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use super::{DeleteResult, Document, DocumentCollection, Filter, StoreDriver, StoreError, StoreResult};

// == Memory Store ==
/// An in-process document store holding any number of named collections.
///
/// Cloning the store (or asking twice for the same collection name) yields
/// handles onto the same shared data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<String, MemoryCollection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreDriver for MemoryStore {
    type Collection = MemoryCollection;

    fn collection(&self, name: &str) -> MemoryCollection {
        let mut collections = self
            .collections
            .lock()
            .expect("collection registry lock poisoned");
        collections.entry(name.to_string()).or_default().clone()
    }
}

// == Memory Collection ==
/// One named collection inside a [`MemoryStore`], keyed by the documents'
/// `key` field.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    docs: Arc<RwLock<HashMap<String, Document>>>,
}

impl MemoryCollection {
    /// Number of documents physically present, expired or not.
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    /// True when the collection holds no documents at all.
    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

// == Filter Matching ==
fn expire_instant(doc: &Document) -> Option<DateTime<Utc>> {
    doc.get("expire")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn matches(filter: &Filter, doc: &Document) -> bool {
    match filter {
        Filter::All => true,
        Filter::Key(key) => doc.get("key").and_then(Value::as_str) == Some(key.as_str()),
        // Documents without a parseable expire field never match the cutoff
        Filter::ExpiredBy(cutoff) => {
            expire_instant(doc).is_some_and(|expire| expire <= *cutoff)
        }
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    async fn upsert(&self, filter: Filter, replacement: Document) -> StoreResult<Option<Document>> {
        let Filter::Key(key) = filter else {
            return Err(StoreError::new("upsert requires a key filter"));
        };
        let mut docs = self.docs.write().await;
        docs.insert(key, replacement.clone());
        Ok(Some(replacement))
    }

    async fn find_one(&self, filter: Filter) -> StoreResult<Option<Document>> {
        let docs = self.docs.read().await;
        match &filter {
            Filter::Key(key) => Ok(docs.get(key).cloned()),
            _ => Ok(docs.values().find(|doc| matches(&filter, doc)).cloned()),
        }
    }

    async fn delete_one(&self, filter: Filter) -> StoreResult<DeleteResult> {
        let mut docs = self.docs.write().await;
        let target = match &filter {
            Filter::Key(key) => docs.contains_key(key).then(|| key.clone()),
            _ => docs
                .iter()
                .find(|(_, doc)| matches(&filter, doc))
                .map(|(stored_key, _)| stored_key.clone()),
        };
        let deleted_count = match target {
            Some(stored_key) => {
                docs.remove(&stored_key);
                1
            }
            None => 0,
        };
        Ok(DeleteResult { deleted_count })
    }

    async fn delete_many(&self, filter: Filter) -> StoreResult<DeleteResult> {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|_, doc| !matches(&filter, doc));
        Ok(DeleteResult {
            deleted_count: (before - docs.len()) as u64,
        })
    }
}
