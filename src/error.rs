//! Muninn error types

/// Muninn error types
#[derive(Debug, thiserror::Error)]
pub enum MuninnError {
    // Collaborator errors
    /// Failure reported by the document store. Always surfaced to the caller.
    #[error("store error: {0}")]
    Store(String),

    /// Failure reported by the cache backend. Never fails a store operation.
    #[error("cache error: {0}")]
    Cache(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("unsupported update operator: {0}")]
    UnsupportedOperator(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no document store configured")]
    NoStore,
}

impl MuninnError {
    /// Whether this error came from the cache side: a backend command or
    /// an undecodable cache payload.
    ///
    /// For callers driving a [`CacheBackend`](crate::CacheBackend) directly,
    /// e.g. around [`clear_cache`](crate::CachedCollection::clear_cache).
    pub fn is_cache_failure(&self) -> bool {
        matches!(self, MuninnError::Cache(_) | MuninnError::Json(_))
    }
}

/// Result type alias for Muninn operations
pub type Result<T> = std::result::Result<T, MuninnError>;
