//! Collaborator traits: the document store and the cache backend.
//!
//! The collection facade only talks to its collaborators through these two
//! traits. Implementations own connection management, timeouts and retries;
//! their failures surface as [`MuninnError::Store`](crate::MuninnError::Store)
//! and [`MuninnError::Cache`](crate::MuninnError::Cache) respectively.
//!
//! # Example
//!
//! ```ignore
//! struct Widgets { inner: mongodb::Collection<Document> }
//!
//! #[async_trait]
//! impl DocumentStore for Widgets {
//!     async fn find(&self, query: &Query, options: &OperationOptions) -> Result<Vec<Document>> {
//!         // ... translate options, run the query, map errors to MuninnError::Store
//!     }
//!     // ...
//! }
//! ```

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::Result;
use crate::types::{
    CacheEvent, DeleteResult, Document, FindAndModifyResult, InsertResult, OperationOptions,
    PrefixDeletion, Query, UpdateResult,
};

// ============================================================================
// Document Store
// ============================================================================

/// A single document collection.
///
/// `options` carries the store-specific settings in
/// [`OperationOptions::extra`]; `skip_cache` can be ignored.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Collection name, used as the cache namespace.
    fn name(&self) -> &str;

    async fn find(&self, query: &Query, options: &OperationOptions) -> Result<Vec<Document>>;

    async fn find_one(&self, query: &Query, options: &OperationOptions)
    -> Result<Option<Document>>;

    async fn insert_one(&self, doc: Document, options: &OperationOptions) -> Result<InsertResult>;

    async fn insert_many(
        &self,
        docs: Vec<Document>,
        options: &OperationOptions,
    ) -> Result<InsertResult>;

    async fn update_one(
        &self,
        filter: &Query,
        update: &Document,
        options: &OperationOptions,
    ) -> Result<UpdateResult>;

    async fn update_many(
        &self,
        filter: &Query,
        update: &Document,
        options: &OperationOptions,
    ) -> Result<UpdateResult>;

    /// Update one document and return either its pre- or post-image,
    /// per [`OperationOptions::returns_updated_document`].
    async fn find_one_and_update(
        &self,
        filter: &Query,
        update: &Document,
        options: &OperationOptions,
    ) -> Result<FindAndModifyResult>;

    async fn find_one_and_delete(
        &self,
        filter: &Query,
        options: &OperationOptions,
    ) -> Result<Option<Document>>;

    async fn remove(&self, filter: &Query, options: &OperationOptions) -> Result<DeleteResult>;
}

// ============================================================================
// Cache Backend
// ============================================================================

/// A string key-value cache with prefix deletion and lifecycle events.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Backend name for logging/debugging.
    fn name(&self) -> &str;

    /// Whether the backend is currently connected.
    ///
    /// Read once when a collection attaches, and again whenever its health
    /// monitor loses track of the event stream.
    fn is_ready(&self) -> bool;

    /// Subscribe to lifecycle events.
    ///
    /// Every collection attached to the backend holds its own receiver, so
    /// implementations must not cap the number of subscribers.
    fn subscribe(&self) -> broadcast::Receiver<CacheEvent>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Delete every key starting with `prefix`.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<PrefixDeletion>;
}
