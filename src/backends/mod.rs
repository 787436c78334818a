//! Bundled collaborator implementations.
//!
//! - [`MokaCacheBackend`]: in-process [`CacheBackend`](crate::CacheBackend)
//!   on top of moka, with a lifecycle event channel that can be driven by
//!   hand. Suitable for single-process deployments and tests.
//!
//! - [`MemoryDocumentStore`]: in-process [`DocumentStore`](crate::DocumentStore)
//!   supporting equality filters and the `$set`, `$unset` and `$inc` update
//!   operators, including upserts.

mod memory_store;
mod moka_cache;

pub use self::memory_store::MemoryDocumentStore;
pub use self::moka_cache::MokaCacheBackend;
