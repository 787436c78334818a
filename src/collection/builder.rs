//! Builder for configuring collection facades

use std::sync::Arc;

use super::CachedCollection;
use crate::config::CollectionConfig;
use crate::timestamps::TimestampPolicy;
use crate::traits::{CacheBackend, DocumentStore};
use crate::{MuninnError, Result};

/// Main entry point for creating collection facades.
pub struct Muninn;

impl Muninn {
    /// Create a new builder for a cache-aware collection.
    pub fn collection() -> CollectionBuilder {
        CollectionBuilder::new()
    }
}

/// Builder for configuring [`CachedCollection`] instances.
pub struct CollectionBuilder {
    store: Option<Arc<dyn DocumentStore>>,
    cache: Option<Arc<dyn CacheBackend>>,
    config: CollectionConfig,
    timestamps: Option<TimestampPolicy>,
}

impl CollectionBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            cache: None,
            config: CollectionConfig::default(),
            timestamps: None,
        }
    }

    /// Set the backing document store (required).
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the cache backend. Without one, every read goes to the store.
    pub fn cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(mut self, config: CollectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the timestamp policy derived from the config, e.g. to
    /// inject a clock.
    pub fn timestamps(mut self, policy: TimestampPolicy) -> Self {
        self.timestamps = Some(policy);
        self
    }

    /// Build the collection.
    ///
    /// When a cache is configured its health monitor is started here, so
    /// this should be called from within a tokio runtime; outside one the
    /// collection works but never consults the cache.
    pub fn build(self) -> Result<CachedCollection> {
        let store = self.store.ok_or(MuninnError::NoStore)?;
        let timestamps = self
            .timestamps
            .unwrap_or_else(|| TimestampPolicy::from_config(&self.config));
        let mut collection = CachedCollection::new(store, self.config, timestamps);
        if let Some(cache) = self.cache {
            collection.set_cache_backend(cache);
        }
        Ok(collection)
    }
}

impl Default for CollectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
