//! Per-operation options

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Options accepted by every collection operation.
///
/// Only `skip_cache`, `upsert` and `return_updated_document` are interpreted
/// by this crate. Everything else lives in `extra` and is handed to the
/// document store untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOptions {
    /// Bypass the cache for this read.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upsert: Option<bool>,
    /// Return the post-update image from `find_one_and_update`.
    /// Unset means `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_updated_document: Option<bool>,

    // Store-specific options (projection, sort, limit, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OperationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_cache(mut self, skip: bool) -> Self {
        self.skip_cache = skip;
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = Some(upsert);
        self
    }

    pub fn return_updated_document(mut self, updated: bool) -> Self {
        self.return_updated_document = Some(updated);
        self
    }

    /// Set a store-specific option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Whether upsert semantics were requested.
    pub fn is_upsert(&self) -> bool {
        self.upsert.unwrap_or(false)
    }

    /// Whether `find_one_and_update` should return the updated image.
    pub fn returns_updated_document(&self) -> bool {
        self.return_updated_document.unwrap_or(true)
    }
}
