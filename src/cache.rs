//! Cache Facade Module
//!
//! The TTL cache itself: set/get/del/flush over a document collection, plus
//! the background sweep that garbage-collects expired entries.
//!
//! Expiration is two-layered. Reads treat a stale entry as absent and kick
//! off a detached delete (lazy expiration). Independently, a periodic sweep
//! bulk-deletes everything already expired. The sweep only runs while there
//! is a known pending expiration: any successful `set` starts it if idle,
//! and it stands down once the current time passes the expiration of the
//! most recently written entry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::error::{CacheError, Result};
use crate::store::{DeleteResult, Document, DocumentCollection, Filter, StoreDriver, StoreResult};

// == Command Result ==
/// What a successful write-ish operation (`set`/`del`/`flush`) hands back.
///
/// By default operations return [`CommandResult::Acknowledged`]; with
/// `return_store_results` set they return the raw store outcome instead.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// The operation completed; no store detail requested
    Acknowledged,
    /// The document as stored, returned from an upsert
    Document(Document),
    /// The raw outcome of a delete
    Delete(DeleteResult),
}

// == Sweep State ==
/// Mutable sweep bookkeeping, shared between the facade and its sweep task.
///
/// `task` doubles as the active flag: the sweep is running exactly while the
/// handle is present.
struct SweepState {
    /// Expiration instant of the most recently written entry
    /// (last-writer-wins, not a maximum)
    last_expire: Option<DateTime<Utc>>,
    /// Handle of the running sweep task, if any
    task: Option<JoinHandle<()>>,
    /// Bumped on every spawn. An aborted task can still be mid-firing when a
    /// replacement starts; it may only clear `task` while its own generation
    /// is current.
    generation: u64,
}

// == TTL Cache ==
/// A TTL key-value cache facade over one external document collection.
///
/// Every write stamps its entry with `now + ttl`; entries past their stamp
/// are logically absent. The facade is a cheap handle: clones share the
/// collection and sweep state.
///
/// # Example
/// ```
/// use doc_ttl_cache::{CacheConfig, MemoryStore, TtlCache};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> doc_ttl_cache::Result<()> {
/// let store = MemoryStore::new();
/// let cache = TtlCache::open(&store, CacheConfig::default()).await?;
///
/// cache.set("greeting", "hello").await?;
/// assert_eq!(cache.get("greeting").await?, Some("hello".into()));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TtlCache<C> {
    collection: C,
    ttl: TimeDelta,
    check_period: Duration,
    ignore_store_error: bool,
    return_store_results: bool,
    sweep: Arc<Mutex<SweepState>>,
}

impl<C> TtlCache<C>
where
    C: DocumentCollection + Clone + Send + Sync + 'static,
{
    // == Construction ==
    /// Opens a cache over the collection named by `config.collection_name`.
    ///
    /// Validates the configuration, derives the collection handle from the
    /// driver, and, when `flush_on_create` is set, clears the collection
    /// before returning.
    ///
    /// # Errors
    /// [`CacheError::InvalidConfig`] when the numeric options fail
    /// validation; [`CacheError::Store`] when the initial flush fails and
    /// `ignore_store_error` is off.
    pub async fn open<D>(driver: &D, config: CacheConfig) -> Result<Self>
    where
        D: StoreDriver<Collection = C>,
    {
        config.validate()?;
        let collection = driver.collection(&config.collection_name);
        Self::with_collection(collection, config).await
    }

    /// Opens a cache over an already-derived collection handle.
    pub async fn with_collection(collection: C, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let cache = Self {
            collection,
            ttl: config.ttl_delta(),
            check_period: config.check_period_duration(),
            ignore_store_error: config.ignore_store_error,
            return_store_results: config.return_store_results,
            sweep: Arc::new(Mutex::new(SweepState {
                last_expire: None,
                task: None,
                generation: 0,
            })),
        };
        if config.flush_on_create {
            cache.flush().await?;
        }
        Ok(cache)
    }

    // == Set ==
    /// Stores `item` under `key`, fully replacing any existing entry.
    ///
    /// The entry is stamped to expire `ttl` from now and that instant is
    /// recorded as the newest pending expiration. A sweep task is started if
    /// none is running.
    ///
    /// # Errors
    /// [`CacheError::InvalidArgument`] when `item` cannot be serialized;
    /// [`CacheError::Store`] on store failure unless `ignore_store_error`
    /// is set, in which case the failure is logged and `None` is returned.
    pub async fn set<T: Serialize>(&self, key: &str, item: T) -> Result<Option<CommandResult>> {
        let data = serde_json::to_value(item)
            .map_err(|err| CacheError::InvalidArgument(format!("item is not serializable: {err}")))?;
        let entry = CacheEntry::new(key, data, self.ttl);

        // Record the newest pending expiration before touching the store, so
        // a concurrently firing sweep cannot stand down against a stale value.
        self.sweep.lock().await.last_expire = Some(entry.expire);

        let doc = entry.to_document()?;
        let result = self
            .absorb("set", self.collection.upsert(Filter::key(key), doc).await)?
            .flatten();

        self.ensure_sweep().await;

        Ok(result.map(|doc| self.document_result(doc)))
    }

    // == Get ==
    /// Fetches the payload stored under `key`, or `None` when absent or
    /// expired.
    ///
    /// Reading an expired entry triggers a detached delete whose outcome is
    /// only ever logged.
    ///
    /// # Errors
    /// [`CacheError::Store`] on store failure unless `ignore_store_error`
    /// is set.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let found = self
            .absorb("get", self.collection.find_one(Filter::key(key)).await)?
            .flatten();
        let Some(doc) = found else {
            return Ok(None);
        };

        let entry = match CacheEntry::from_document(doc) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key, error = %err, "ignoring malformed cache document");
                return Ok(None);
            }
        };

        if entry.is_expired(Utc::now()) {
            // Lazy expiration: delete without waiting for the outcome
            let collection = self.collection.clone();
            let stale_key = key.to_string();
            tokio::spawn(async move {
                if let Err(err) = collection.delete_one(Filter::Key(stale_key.clone())).await {
                    warn!(key = %stale_key, error = %err, "failed to delete expired entry");
                }
            });
            return Ok(None);
        }

        Ok(Some(entry.data))
    }

    // == Delete ==
    /// Removes the entry stored under `key`, if any.
    ///
    /// # Errors
    /// [`CacheError::Store`] on store failure unless `ignore_store_error`
    /// is set.
    pub async fn del(&self, key: &str) -> Result<Option<CommandResult>> {
        let result = self.absorb(
            "del",
            self.collection.delete_one(Filter::key(key)).await,
        )?;
        Ok(result.map(|res| self.delete_result(res)))
    }

    // == Flush ==
    /// Stops the sweep and deletes every entry in the collection.
    ///
    /// # Errors
    /// [`CacheError::Store`] on store failure unless `ignore_store_error`
    /// is set. The sweep is stopped even when the delete fails.
    pub async fn flush(&self) -> Result<Option<CommandResult>> {
        {
            let mut state = self.sweep.lock().await;
            if let Some(task) = state.task.take() {
                task.abort();
                debug!("sweep task stopped by flush");
            }
        }
        let result = self.absorb(
            "flush",
            self.collection.delete_many(Filter::All).await,
        )?;
        Ok(result.map(|res| self.delete_result(res)))
    }

    // == Sweep Introspection ==
    /// True while a background sweep task is scheduled.
    pub async fn sweep_active(&self) -> bool {
        self.sweep.lock().await.task.is_some()
    }

    // == Internals ==
    /// Applies the store-failure policy: swallow-and-log or propagate.
    fn absorb<T>(&self, operation: &'static str, result: StoreResult<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if self.ignore_store_error => {
                warn!(operation, error = %err, "store operation failed, continuing without result");
                Ok(None)
            }
            Err(err) => Err(CacheError::Store(err)),
        }
    }

    fn document_result(&self, doc: Document) -> CommandResult {
        if self.return_store_results {
            CommandResult::Document(doc)
        } else {
            CommandResult::Acknowledged
        }
    }

    fn delete_result(&self, result: DeleteResult) -> CommandResult {
        if self.return_store_results {
            CommandResult::Delete(result)
        } else {
            CommandResult::Acknowledged
        }
    }

    /// Starts the sweep task if none is running. The check and the spawn
    /// happen under the sweep lock, so at most one task exists at a time.
    async fn ensure_sweep(&self) {
        let mut state = self.sweep.lock().await;
        if state.task.is_none() {
            state.generation = state.generation.wrapping_add(1);
            state.task = Some(spawn_sweep(
                self.collection.clone(),
                Arc::clone(&self.sweep),
                self.check_period,
                self.ignore_store_error,
                state.generation,
            ));
        }
    }
}

// == Background Sweep ==
/// Spawns the periodic sweep over `collection`.
///
/// Each firing bulk-deletes every entry already expired, then stands down
/// once the current time has passed the newest recorded expiration. A timer
/// interval of zero is clamped to one millisecond.
fn spawn_sweep<C>(
    collection: C,
    sweep: Arc<Mutex<SweepState>>,
    check_period: Duration,
    ignore_store_error: bool,
    generation: u64,
) -> JoinHandle<()>
where
    C: DocumentCollection + Clone + Send + Sync + 'static,
{
    let period = check_period.max(Duration::from_millis(1));
    tokio::spawn(async move {
        info!(period_ms = period.as_millis() as u64, "sweep task started");
        let mut ticker = tokio::time::interval(period);
        // The first tick of an interval completes immediately; skip it so
        // firings land one full period apart.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let now = Utc::now();

            match collection.delete_many(Filter::ExpiredBy(now)).await {
                Ok(result) if result.deleted_count > 0 => {
                    info!(removed = result.deleted_count, "sweep removed expired entries");
                }
                Ok(_) => debug!("sweep found no expired entries"),
                Err(err) if ignore_store_error => {
                    warn!(error = %err, "sweep delete failed, continuing");
                }
                Err(err) => error!(error = %err, "sweep delete failed"),
            }

            let stand_down = {
                let mut state = sweep.lock().await;
                if state.generation != generation {
                    // A flush aborted this task and a newer sweep has taken
                    // over; exit without touching the new task's handle.
                    true
                } else {
                    let idle = state.last_expire.map_or(true, |last| now > last);
                    if idle {
                        state.task = None;
                    }
                    idle
                }
            };
            if stand_down {
                debug!("no pending expirations, sweep standing down");
                break;
            }
        }
    })
}
