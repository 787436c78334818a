//! Cache-aware collection facade

mod builder;
mod cached;

pub use builder::{CollectionBuilder, Muninn};
pub use cached::CachedCollection;
