//! Configuration.
//!
//! Everything has a default, so a collection can be built without any
//! configuration at all. When loaded from TOML the layout is:
//!
//! ```toml
//! [collection]
//! caching = true
//! marker_field = "_inCache"
//! created_at_field = "createdAt"
//! updated_at_field = "updatedAt"
//! id_field = "_id"
//!
//! [memory_cache]
//! max_entries = 10000
//! event_capacity = 64
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::{MuninnError, Result};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub memory_cache: MokaCacheConfig,
}

impl Config {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| MuninnError::Configuration(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MuninnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            MuninnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }
}

/// Per-collection behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    /// Master switch. When `false` the cache backend is never consulted,
    /// whatever its health. Default: true.
    #[serde(default = "default_true")]
    pub caching: bool,
    /// Field added to documents served from the cache. Default: `_inCache`.
    #[serde(default = "default_marker_field")]
    pub marker_field: String,
    /// Default: `createdAt`.
    #[serde(default = "default_created_at_field")]
    pub created_at_field: String,
    /// Default: `updatedAt`.
    #[serde(default = "default_updated_at_field")]
    pub updated_at_field: String,
    /// Primary key field used by the upsert correction. Default: `_id`.
    #[serde(default = "default_id_field")]
    pub id_field: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            caching: true,
            marker_field: default_marker_field(),
            created_at_field: default_created_at_field(),
            updated_at_field: default_updated_at_field(),
            id_field: default_id_field(),
        }
    }
}

impl CollectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn caching(mut self, enabled: bool) -> Self {
        self.caching = enabled;
        self
    }

    pub fn marker_field(mut self, field: impl Into<String>) -> Self {
        self.marker_field = field.into();
        self
    }

    pub fn created_at_field(mut self, field: impl Into<String>) -> Self {
        self.created_at_field = field.into();
        self
    }

    pub fn updated_at_field(mut self, field: impl Into<String>) -> Self {
        self.updated_at_field = field.into();
        self
    }

    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }
}

fn default_true() -> bool {
    true
}

fn default_marker_field() -> String {
    "_inCache".to_string()
}

fn default_created_at_field() -> String {
    "createdAt".to_string()
}

fn default_updated_at_field() -> String {
    "updatedAt".to_string()
}

fn default_id_field() -> String {
    "_id".to_string()
}

/// Configuration for [`MokaCacheBackend`](crate::backends::MokaCacheBackend).
///
/// ```rust
/// # use muninn::MokaCacheConfig;
/// let config = MokaCacheConfig::new()
///     .max_entries(50_000)
///     .event_capacity(128);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MokaCacheConfig {
    /// Maximum number of cached entries. Default: 10,000.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// Lifecycle events buffered per subscriber. Default: 64.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for MokaCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl MokaCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set how many lifecycle events a slow subscriber may fall behind by.
    pub fn event_capacity(mut self, n: usize) -> Self {
        self.event_capacity = n;
        self
    }
}

fn default_max_entries() -> u64 {
    10_000
}

fn default_event_capacity() -> usize {
    64
}
