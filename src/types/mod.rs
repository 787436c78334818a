//! Public types for the Muninn API.

mod document;
mod event;
mod options;
mod results;

pub use document::{Document, Query};
pub use event::CacheEvent;
pub use options::OperationOptions;
pub use results::{DeleteResult, FindAndModifyResult, InsertResult, PrefixDeletion, UpdateResult};
