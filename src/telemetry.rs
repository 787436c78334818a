//! Telemetry metric name constants.
//!
//! Centralised metric names for muninn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `muninn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `collection`: collection name (cache namespace)
//! - `operation`: facade operation (e.g. "find", "update_one")
//! - `status`: "ok" or "error"

/// Total store operations issued by the facade.
///
/// Labels: `collection`, `operation`, `status` ("ok" | "error").
pub const STORE_OPERATIONS_TOTAL: &str = "muninn_store_operations_total";

/// Store operation duration in seconds.
///
/// Labels: `collection`, `operation`.
pub const STORE_DURATION_SECONDS: &str = "muninn_store_duration_seconds";

/// Total reads served from the cache.
///
/// Labels: `collection`, `operation`.
pub const CACHE_HITS_TOTAL: &str = "muninn_cache_hits_total";

/// Total reads that missed the cache and went to the store.
///
/// Labels: `collection`, `operation`.
pub const CACHE_MISSES_TOTAL: &str = "muninn_cache_misses_total";

/// Total cache entries written after a miss.
///
/// Labels: `collection`.
pub const CACHE_POPULATES_TOTAL: &str = "muninn_cache_populates_total";

/// Total swallowed cache backend failures.
///
/// Labels: `collection`, `stage` ("get" | "set" | "invalidate").
pub const CACHE_ERRORS_TOTAL: &str = "muninn_cache_errors_total";

/// Total namespace invalidations issued after writes.
///
/// Labels: `collection`.
pub const INVALIDATIONS_TOTAL: &str = "muninn_invalidations_total";

/// Total cache keys deleted by invalidations.
///
/// Labels: `collection`.
pub const KEYS_INVALIDATED_TOTAL: &str = "muninn_keys_invalidated_total";

/// Total caching state changes driven by backend events.
///
/// Labels: `state` ("enabled" | "disabled").
pub const HEALTH_TRANSITIONS_TOTAL: &str = "muninn_health_transitions_total";
