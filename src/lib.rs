//! Muninn - cache-coherent access layer for document collections
//!
//! This crate puts a key-value cache in front of a document store. Reads
//! are served from the cache when possible and populated on a miss; writes
//! go to the store and then flush the collection's cache namespace. Both
//! collaborators sit behind traits ([`DocumentStore`], [`CacheBackend`]),
//! so any database and any cache can be plugged in.
//!
//! Caching is switched off automatically while the cache backend reports
//! itself disconnected, and cache failures never fail a store operation.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use muninn::backends::{MemoryDocumentStore, MokaCacheBackend};
//! use muninn::{Muninn, OperationOptions, Query};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> muninn::Result<()> {
//!     let widgets = Muninn::collection()
//!         .store(Arc::new(MemoryDocumentStore::new("widgets")))
//!         .cache(Arc::new(MokaCacheBackend::new()))
//!         .build()?;
//!
//!     let doc = json!({"name": "a"}).as_object().cloned().unwrap_or_default();
//!     widgets.insert_one(doc, &OperationOptions::new()).await?;
//!
//!     let mut query = Query::new();
//!     query.insert("name".into(), json!("a"));
//!     let found = widgets.find(&query, &OperationOptions::new()).await?;
//!     println!("{} document(s)", found.len());
//!     Ok(())
//! }
//! ```

pub mod backends;
pub mod cache;
pub mod collection;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod timestamps;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheHealthMonitor, CacheKeyCodec, HealthState, ReadKind};
pub use collection::{CachedCollection, CollectionBuilder, Muninn};
pub use config::{CollectionConfig, Config, MokaCacheConfig};
pub use error::{MuninnError, Result};
pub use timestamps::TimestampPolicy;
pub use traits::{CacheBackend, DocumentStore};

// Re-export all types
pub use types::{
    CacheEvent, DeleteResult, Document, FindAndModifyResult, InsertResult, OperationOptions,
    PrefixDeletion, Query, UpdateResult,
};
