//! Store and cache result shapes

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Document;

/// Outcome of `insert_one` / `insert_many`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertResult {
    pub inserted_count: u64,
    /// Identifiers of the inserted documents, in input order.
    pub inserted_ids: Vec<Value>,
}

/// Outcome of `update_one` / `update_many`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
    /// `false` when the operation upserted a new document.
    pub updated_existing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upserted_id: Option<Value>,
}

/// Outcome of `find_one_and_update`.
///
/// `matched_count` counts documents touched, including one created by an
/// upsert. `updated_existing` is `false` in that case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindAndModifyResult {
    pub value: Option<Document>,
    pub matched_count: u64,
    pub updated_existing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upserted_id: Option<Value>,
}

impl FindAndModifyResult {
    /// Whether this result describes a document created by an upsert.
    pub fn created_by_upsert(&self) -> bool {
        self.matched_count == 1 && !self.updated_existing
    }
}

/// Outcome of `remove`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Outcome of a prefix deletion on the cache backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefixDeletion {
    /// Keys found under the prefix.
    pub matched: u64,
    /// Keys actually removed.
    pub deleted: u64,
}
