//! Cache key derivation.
//!
//! A key is `{collection}_{query}-{options}` where `query` and `options`
//! are serialized as JSON after sorting object keys recursively. Two
//! filters with the same content therefore share a key regardless of the
//! order their fields were inserted in. Array order is significant and is
//! kept as-is.
//!
//! `find_one` entries carry a `-one` suffix. A list and a single document
//! are different payloads, so the two reads never share an entry.
//!
//! Every key of a collection starts with [`CacheKeyCodec::namespace_prefix`]
//! (`{collection}_{`), which is what write-path invalidation deletes by.
//! The trailing `{` is the opening brace of the serialized query, so the
//! namespace of `orders` never covers keys of `orders_archive`.

use serde_json::{Map, Value};

use crate::Result;
use crate::types::{OperationOptions, Query};

/// Which read an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadKind {
    /// `find`: the entry holds a list of documents.
    Many,
    /// `find_one`: the entry holds a single document.
    One,
}

/// Deterministic mapping from `(collection, query, options)` to a cache key.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeyCodec;

impl CacheKeyCodec {
    pub fn new() -> Self {
        Self
    }

    /// Derive the cache key for a read.
    pub fn derive_key(
        &self,
        collection: &str,
        kind: ReadKind,
        query: &Query,
        options: &OperationOptions,
    ) -> Result<String> {
        let query = canonicalize_map(query);
        let options = canonicalize(&serde_json::to_value(options)?);
        let suffix = match kind {
            ReadKind::Many => "",
            ReadKind::One => "-one",
        };
        Ok(format!(
            "{collection}_{}-{}{suffix}",
            serde_json::to_string(&query)?,
            serde_json::to_string(&options)?
        ))
    }

    /// Prefix shared by every key derived for `collection`.
    pub fn namespace_prefix(&self, collection: &str) -> String {
        format!("{collection}_{{")
    }
}

fn canonicalize_map(map: &Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    entries
        .into_iter()
        .map(|(k, v)| (k.clone(), canonicalize(v)))
        .collect()
}

/// Rebuild `value` with object keys in sorted order.
///
/// `serde_json::Map` already iterates sorted unless `preserve_order` is
/// enabled somewhere in the dependency graph; this keeps keys stable either
/// way.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(canonicalize_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
