//! Cache-side building blocks.
//!
//! - [`CacheKeyCodec`]: deterministic key derivation from a query and its
//!   options, plus the per-collection namespace prefix used to invalidate.
//!
//! - [`CacheHealthMonitor`]: follows a backend's lifecycle events and
//!   decides whether reads may consult the cache.

pub mod health;
pub mod key;

pub use health::{CacheHealthMonitor, HealthState};
pub use key::{CacheKeyCodec, ReadKind};
