//! CachedCollection - read-through caching and write invalidation
//!
//! # Reads
//!
//! ```text
//! find / find_one
//!       │
//!       ├── caching disabled or skip_cache ──► store
//!       │
//!       ▼
//!   derive key ──► cache get ── hit ──► cached payload (marked)
//!                      │
//!                     miss / cache error
//!                      ▼
//!                    store ──► cache set (failure ignored) ──► store result
//! ```
//!
//! # Writes
//!
//! Inserts and updates are stamped by the [`TimestampPolicy`], executed
//! against the store, and followed by a flush of the collection's whole
//! cache namespace. Deletes skip the stamping step. Store errors are
//! returned as-is and nothing is invalidated; cache errors are logged and
//! never fail the operation.
//!
//! A concurrent read can repopulate an entry between a write committing
//! and its invalidation finishing. With no TTLs or versions that entry is
//! served until the next write to the collection.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheHealthMonitor, CacheKeyCodec, ReadKind};
use crate::config::CollectionConfig;
use crate::telemetry;
use crate::timestamps::TimestampPolicy;
use crate::traits::{CacheBackend, DocumentStore};
use crate::types::{
    DeleteResult, Document, FindAndModifyResult, InsertResult, OperationOptions, PrefixDeletion,
    Query, UpdateResult,
};
use crate::Result;

/// A cache backend attached to a collection, with its own health monitor.
struct AttachedCache {
    backend: Arc<dyn CacheBackend>,
    health: CacheHealthMonitor,
}

/// Cache-aware facade over one document collection.
///
/// Build with [`Muninn::collection()`](crate::Muninn::collection).
pub struct CachedCollection {
    name: String,
    store: Arc<dyn DocumentStore>,
    cache: Option<AttachedCache>,
    codec: CacheKeyCodec,
    timestamps: TimestampPolicy,
    config: CollectionConfig,
}

impl CachedCollection {
    pub(crate) fn new(
        store: Arc<dyn DocumentStore>,
        config: CollectionConfig,
        timestamps: TimestampPolicy,
    ) -> Self {
        Self {
            name: store.name().to_string(),
            store,
            cache: None,
            codec: CacheKeyCodec::new(),
            timestamps,
            config,
        }
    }

    /// Collection name, which is also the cache namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    pub fn timestamps(&self) -> &TimestampPolicy {
        &self.timestamps
    }

    /// Attach a cache backend, replacing any previous one.
    ///
    /// Caching starts enabled only if the backend reports ready right now;
    /// afterwards its lifecycle events drive the state. Must be called
    /// within a tokio runtime for events to be observed.
    pub fn set_cache_backend(&mut self, backend: Arc<dyn CacheBackend>) {
        let health = CacheHealthMonitor::attach(Arc::clone(&backend));
        debug!(
            collection = %self.name,
            backend = backend.name(),
            state = health.state().as_str(),
            "cache backend attached"
        );
        self.cache = Some(AttachedCache { backend, health });
    }

    /// Detach the cache backend. Subsequent reads go straight to the store.
    pub fn detach_cache_backend(&mut self) {
        self.cache = None;
    }

    /// Health monitor of the attached backend, if any.
    pub fn cache_health(&self) -> Option<&CacheHealthMonitor> {
        self.cache.as_ref().map(|c| &c.health)
    }

    /// Whether reads currently consult the cache.
    pub fn caching_enabled(&self) -> bool {
        self.active_cache().is_some()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Find all documents matching `query`.
    ///
    /// Documents served from the cache carry the marker field
    /// (`_inCache: true` by default); documents fresh from the store don't.
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn find(&self, query: &Query, options: &OperationOptions) -> Result<Vec<Document>> {
        let Some((backend, key)) = self.cache_slot(ReadKind::Many, query, options) else {
            return self.timed("find", self.store.find(query, options)).await;
        };
        if let Some(docs) = self.lookup::<Vec<Document>>(backend, &key, "find").await {
            return Ok(docs);
        }

        let docs = self.timed("find", self.store.find(query, options)).await?;
        let payload = Value::Array(docs.iter().map(|d| Value::Object(self.mark(d))).collect());
        self.populate(backend, &key, payload).await;
        Ok(docs)
    }

    /// Find the first document matching `query`.
    ///
    /// An absent result is not cached.
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn find_one(
        &self,
        query: &Query,
        options: &OperationOptions,
    ) -> Result<Option<Document>> {
        let Some((backend, key)) = self.cache_slot(ReadKind::One, query, options) else {
            return self.timed("find_one", self.store.find_one(query, options)).await;
        };
        if let Some(doc) = self.lookup::<Document>(backend, &key, "find_one").await {
            return Ok(Some(doc));
        }

        let doc = self
            .timed("find_one", self.store.find_one(query, options))
            .await?;
        if let Some(doc) = &doc {
            self.populate(backend, &key, Value::Object(self.mark(doc)))
                .await;
        }
        Ok(doc)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert one document, stamping missing timestamps first.
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn insert_one(
        &self,
        mut doc: Document,
        options: &OperationOptions,
    ) -> Result<InsertResult> {
        self.timestamps.on_insert(&mut doc);
        let result = self
            .timed("insert_one", self.store.insert_one(doc, options))
            .await?;
        self.invalidate().await;
        Ok(result)
    }

    /// Insert a batch of documents, stamping missing timestamps first.
    #[instrument(skip_all, fields(collection = %self.name, batch_size = docs.len()))]
    pub async fn insert_many(
        &self,
        mut docs: Vec<Document>,
        options: &OperationOptions,
    ) -> Result<InsertResult> {
        self.timestamps.on_insert_many(&mut docs);
        let result = self
            .timed("insert_many", self.store.insert_many(docs, options))
            .await?;
        self.invalidate().await;
        Ok(result)
    }

    /// Update the first document matching `filter`. `updatedAt` is added
    /// to the payload's `$set` clause.
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn update_one(
        &self,
        filter: &Query,
        mut update: Document,
        options: &OperationOptions,
    ) -> Result<UpdateResult> {
        self.timestamps.on_update(&mut update)?;
        let result = self
            .timed("update_one", self.store.update_one(filter, &update, options))
            .await?;
        self.invalidate().await;
        Ok(result)
    }

    /// Update every document matching `filter`. `updatedAt` is added to
    /// the payload's `$set` clause.
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn update_many(
        &self,
        filter: &Query,
        mut update: Document,
        options: &OperationOptions,
    ) -> Result<UpdateResult> {
        self.timestamps.on_update(&mut update)?;
        let result = self
            .timed(
                "update_many",
                self.store.update_many(filter, &update, options),
            )
            .await?;
        self.invalidate().await;
        Ok(result)
    }

    /// Update one document and return it.
    ///
    /// Returns the updated document unless
    /// [`return_updated_document(false)`](OperationOptions::return_updated_document)
    /// was set. When `upsert` created a new document, a second write copies
    /// its `updatedAt` into `createdAt`, and the corrected document is what
    /// gets returned.
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn find_one_and_update(
        &self,
        filter: &Query,
        mut update: Document,
        options: &OperationOptions,
    ) -> Result<Option<Document>> {
        let stamped = self.timestamps.on_update(&mut update)?;
        let result = self
            .timed(
                "find_one_and_update",
                self.store.find_one_and_update(filter, &update, options),
            )
            .await?;

        let value = if options.is_upsert() && result.created_by_upsert() {
            self.correct_upserted(result, &stamped, options).await
        } else {
            Ok(result.value)
        };
        // The primary write is committed even if the correction failed.
        self.invalidate().await;
        value
    }

    /// Delete the first document matching `filter` and return it.
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn find_one_and_delete(
        &self,
        filter: &Query,
        options: &OperationOptions,
    ) -> Result<Option<Document>> {
        let deleted = self
            .timed(
                "find_one_and_delete",
                self.store.find_one_and_delete(filter, options),
            )
            .await?;
        self.invalidate().await;
        Ok(deleted)
    }

    /// Delete every document matching `filter`.
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn remove(&self, filter: &Query, options: &OperationOptions) -> Result<DeleteResult> {
        let result = self
            .timed("remove", self.store.remove(filter, options))
            .await?;
        self.invalidate().await;
        Ok(result)
    }

    /// Delete every cache entry of this collection.
    ///
    /// Does nothing (and reports nothing deleted) while caching is
    /// disabled. Unlike the flush that follows each write, backend errors
    /// are returned.
    pub async fn clear_cache(&self) -> Result<PrefixDeletion> {
        let Some(backend) = self.active_cache() else {
            return Ok(PrefixDeletion::default());
        };
        let prefix = self.codec.namespace_prefix(&self.name);
        let deletion = backend.delete_by_prefix(&prefix).await?;
        metrics::counter!(telemetry::INVALIDATIONS_TOTAL, "collection" => self.name.clone())
            .increment(1);
        metrics::counter!(telemetry::KEYS_INVALIDATED_TOTAL, "collection" => self.name.clone())
            .increment(deletion.deleted);
        debug!(
            collection = %self.name,
            matched = deletion.matched,
            deleted = deletion.deleted,
            "cache namespace cleared"
        );
        Ok(deletion)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn active_cache(&self) -> Option<&Arc<dyn CacheBackend>> {
        if !self.config.caching {
            return None;
        }
        self.cache
            .as_ref()
            .filter(|c| c.health.is_enabled())
            .map(|c| &c.backend)
    }

    /// Backend and key for a read, or `None` if the read bypasses the cache.
    fn cache_slot(
        &self,
        kind: ReadKind,
        query: &Query,
        options: &OperationOptions,
    ) -> Option<(&Arc<dyn CacheBackend>, String)> {
        if options.skip_cache {
            return None;
        }
        let backend = self.active_cache()?;
        match self.codec.derive_key(&self.name, kind, query, options) {
            Ok(key) => Some((backend, key)),
            Err(e) => {
                warn!(collection = %self.name, error = %e, "cannot derive cache key, bypassing cache");
                None
            }
        }
    }

    /// Read and decode a cache entry. Errors and undecodable entries count
    /// as misses.
    async fn lookup<T: DeserializeOwned>(
        &self,
        backend: &Arc<dyn CacheBackend>,
        key: &str,
        operation: &'static str,
    ) -> Option<T> {
        let hit = match backend.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Option<T>>(&raw) {
                Ok(value) => value,
                Err(e) => {
                    self.record_cache_error("get", &e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.record_cache_error("get", &e);
                None
            }
        };

        let counter = if hit.is_some() {
            telemetry::CACHE_HITS_TOTAL
        } else {
            telemetry::CACHE_MISSES_TOTAL
        };
        metrics::counter!(counter,
            "collection" => self.name.clone(),
            "operation" => operation,
        )
        .increment(1);
        debug!(collection = %self.name, key, hit = hit.is_some(), "cache lookup");
        hit
    }

    /// Write a store result back to the cache. Failures are logged only.
    async fn populate(&self, backend: &Arc<dyn CacheBackend>, key: &str, payload: Value) {
        match backend.set(key, payload.to_string()).await {
            Ok(()) => {
                metrics::counter!(telemetry::CACHE_POPULATES_TOTAL, "collection" => self.name.clone())
                    .increment(1);
            }
            Err(e) => self.record_cache_error("set", &e),
        }
    }

    /// Flush the namespace after a write, swallowing cache errors.
    async fn invalidate(&self) {
        if let Err(e) = self.clear_cache().await {
            self.record_cache_error("invalidate", &e);
        }
    }

    /// Second write for an upsert that created a document: set its
    /// `createdAt` to the `updatedAt` the primary write gave it.
    async fn correct_upserted(
        &self,
        result: FindAndModifyResult,
        stamped: &Value,
        options: &OperationOptions,
    ) -> Result<Option<Document>> {
        let id = result.upserted_id.clone().or_else(|| {
            result
                .value
                .as_ref()
                .and_then(|d| d.get(&self.config.id_field).cloned())
        });
        let Some(id) = id else {
            warn!(
                collection = %self.name,
                "upserted document has no id, creation time not set"
            );
            return Ok(result.value);
        };

        let updated_at = result
            .value
            .as_ref()
            .and_then(|d| d.get(self.timestamps.updated_at_field()))
            .filter(|v| !v.is_null())
            .unwrap_or(stamped);
        let correction = self.timestamps.on_upsert_create(updated_at);

        let mut filter = Query::new();
        filter.insert(self.config.id_field.clone(), id);
        let corrected = self
            .timed(
                "find_one_and_update",
                self.store.find_one_and_update(
                    &filter,
                    &correction,
                    &OperationOptions::new().return_updated_document(true),
                ),
            )
            .await?;

        if options.returns_updated_document() {
            Ok(corrected.value)
        } else {
            Ok(result.value)
        }
    }

    fn mark(&self, doc: &Document) -> Document {
        let mut marked = doc.clone();
        marked.insert(self.config.marker_field.clone(), Value::Bool(true));
        marked
    }

    async fn timed<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let start = Instant::now();
        let result = fut.await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::STORE_OPERATIONS_TOTAL,
            "collection" => self.name.clone(),
            "operation" => operation,
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::STORE_DURATION_SECONDS,
            "collection" => self.name.clone(),
            "operation" => operation,
        )
        .record(start.elapsed().as_secs_f64());
        result
    }

    fn record_cache_error(&self, stage: &'static str, error: &dyn std::fmt::Display) {
        warn!(collection = %self.name, stage, error = %error, "cache operation failed, ignoring");
        metrics::counter!(telemetry::CACHE_ERRORS_TOTAL,
            "collection" => self.name.clone(),
            "stage" => stage,
        )
        .increment(1);
    }
}

impl std::fmt::Debug for CachedCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedCollection")
            .field("name", &self.name)
            .field("cache", &self.cache.as_ref().map(|c| c.backend.name()))
            .field("caching_enabled", &self.caching_enabled())
            .finish_non_exhaustive()
    }
}
