//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tokio::sync::broadcast;

use muninn::backends::{MemoryDocumentStore, MokaCacheBackend};
use muninn::{
    CacheBackend, CacheEvent, CacheKeyCodec, CachedCollection, DeleteResult, Document, DocumentStore,
    FindAndModifyResult, InsertResult, Muninn, MuninnError, OperationOptions, PrefixDeletion,
    Query, Result, TimestampPolicy, UpdateResult,
};

// ============================================================================
// Document helpers
// ============================================================================

/// Turn a `json!` object literal into a document.
pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub fn opts() -> OperationOptions {
    OperationOptions::new()
}

/// Timestamp policy whose clock advances one second per reading.
pub fn ticking_timestamps() -> TimestampPolicy {
    let tick = Arc::new(AtomicI64::new(0));
    TimestampPolicy::new().with_clock(move || {
        let n = tick.fetch_add(1, Ordering::SeqCst);
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(n)
    })
}

/// Store + cache + collection wired together with in-memory backends.
pub struct Fixture {
    pub store: Arc<MemoryDocumentStore>,
    pub cache: Arc<MokaCacheBackend>,
    pub collection: CachedCollection,
}

pub fn fixture(name: &str) -> Fixture {
    let store = Arc::new(MemoryDocumentStore::new(name));
    let cache = Arc::new(MokaCacheBackend::new());
    let collection = Muninn::collection()
        .store(store.clone())
        .cache(cache.clone())
        .timestamps(ticking_timestamps())
        .build()
        .expect("failed to build collection");
    Fixture {
        store,
        cache,
        collection,
    }
}

impl Fixture {
    /// Cache keys belonging to this fixture's collection.
    pub fn cached_keys(&self) -> Vec<String> {
        let prefix = CacheKeyCodec::new().namespace_prefix(self.collection.name());
        self.cache
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(&prefix))
            .collect()
    }
}

/// Poll `cond` until it holds, yielding to background tasks in between.
pub async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

// ============================================================================
// Faulty cache backend
// ============================================================================

/// Cache backend whose commands can be made to fail individually.
pub struct FaultyCache {
    inner: MokaCacheBackend,
    pub fail_get: AtomicBool,
    pub fail_set: AtomicBool,
    pub fail_delete: AtomicBool,
    events: broadcast::Sender<CacheEvent>,
}

impl FaultyCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: MokaCacheBackend::new(),
            fail_get: AtomicBool::new(false),
            fail_set: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            events,
        }
    }

    pub fn inner(&self) -> &MokaCacheBackend {
        &self.inner
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(MuninnError::Cache(format!("{what} failed")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheBackend for FaultyCache {
    fn name(&self) -> &str {
        "faulty"
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Self::check(&self.fail_get, "get")?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        Self::check(&self.fail_set, "set")?;
        self.inner.set(key, value).await
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<PrefixDeletion> {
        Self::check(&self.fail_delete, "delete")?;
        self.inner.delete_by_prefix(prefix).await
    }
}

// ============================================================================
// Faulty document store
// ============================================================================

/// Document store that can be switched to fail every operation.
pub struct FaultyStore {
    inner: MemoryDocumentStore,
    pub failing: AtomicBool,
}

impl FaultyStore {
    pub fn new(name: &str) -> Self {
        Self {
            inner: MemoryDocumentStore::new(name),
            failing: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &MemoryDocumentStore {
        &self.inner
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(MuninnError::Store("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn find(&self, query: &Query, options: &OperationOptions) -> Result<Vec<Document>> {
        self.check()?;
        self.inner.find(query, options).await
    }

    async fn find_one(
        &self,
        query: &Query,
        options: &OperationOptions,
    ) -> Result<Option<Document>> {
        self.check()?;
        self.inner.find_one(query, options).await
    }

    async fn insert_one(&self, doc: Document, options: &OperationOptions) -> Result<InsertResult> {
        self.check()?;
        self.inner.insert_one(doc, options).await
    }

    async fn insert_many(
        &self,
        docs: Vec<Document>,
        options: &OperationOptions,
    ) -> Result<InsertResult> {
        self.check()?;
        self.inner.insert_many(docs, options).await
    }

    async fn update_one(
        &self,
        filter: &Query,
        update: &Document,
        options: &OperationOptions,
    ) -> Result<UpdateResult> {
        self.check()?;
        self.inner.update_one(filter, update, options).await
    }

    async fn update_many(
        &self,
        filter: &Query,
        update: &Document,
        options: &OperationOptions,
    ) -> Result<UpdateResult> {
        self.check()?;
        self.inner.update_many(filter, update, options).await
    }

    async fn find_one_and_update(
        &self,
        filter: &Query,
        update: &Document,
        options: &OperationOptions,
    ) -> Result<FindAndModifyResult> {
        self.check()?;
        self.inner.find_one_and_update(filter, update, options).await
    }

    async fn find_one_and_delete(
        &self,
        filter: &Query,
        options: &OperationOptions,
    ) -> Result<Option<Document>> {
        self.check()?;
        self.inner.find_one_and_delete(filter, options).await
    }

    async fn remove(&self, filter: &Query, options: &OperationOptions) -> Result<DeleteResult> {
        self.check()?;
        self.inner.remove(filter, options).await
    }
}
