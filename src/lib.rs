//! Doc TTL Cache - a key-value cache facade over an external document store
//!
//! Every entry carries an absolute expiration timestamp. Stale entries are
//! treated as absent on read (and deleted behind the reader's back), while a
//! background sweep periodically bulk-deletes whatever has already expired.
//! The document store itself sits behind the [`store::DocumentCollection`]
//! trait; [`MemoryStore`] ships as an in-process reference driver.

pub mod cache;
pub mod config;
pub mod entry;
pub mod error;
pub mod store;


pub use cache::{CommandResult, TtlCache};
pub use config::CacheConfig;
pub use entry::CacheEntry;
pub use error::{CacheError, Result};
pub use store::{
    DeleteResult, Document, DocumentCollection, Filter, MemoryCollection, MemoryStore,
    StoreDriver, StoreError, StoreResult,
};
