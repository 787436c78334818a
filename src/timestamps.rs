//! Creation and update timestamps.
//!
//! Timestamps are written as RFC 3339 strings in UTC with millisecond
//! precision (`2024-05-01T12:00:00.000Z`). That format sorts
//! lexicographically in time order, so stored values compare correctly
//! both as strings and once parsed.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::config::CollectionConfig;
use crate::types::Document;
use crate::{MuninnError, Result};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Stamps `createdAt` / `updatedAt` on inserted documents and update payloads.
#[derive(Clone)]
pub struct TimestampPolicy {
    created_at: String,
    updated_at: String,
    clock: Clock,
}

impl TimestampPolicy {
    /// Policy using the default field names and the system clock.
    pub fn new() -> Self {
        Self::from_config(&CollectionConfig::default())
    }

    pub fn from_config(config: &CollectionConfig) -> Self {
        Self {
            created_at: config.created_at_field.clone(),
            updated_at: config.updated_at_field.clone(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the clock, e.g. with a fixed instant in tests.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn created_at_field(&self) -> &str {
        &self.created_at
    }

    pub fn updated_at_field(&self) -> &str {
        &self.updated_at
    }

    /// Current time in stored form.
    pub fn now(&self) -> Value {
        format_timestamp((self.clock)())
    }

    /// Fill in missing timestamps on a document about to be inserted.
    ///
    /// Existing values are kept, so re-inserting a stamped document (e.g.
    /// during a migration) leaves it unchanged. A `null` counts as missing.
    pub fn on_insert(&self, doc: &mut Document) {
        let now = self.now();
        self.stamp_missing(doc, &now);
    }

    /// Batch form of [`on_insert`](Self::on_insert). All documents that
    /// need a stamp get the same instant.
    pub fn on_insert_many(&self, docs: &mut [Document]) {
        let now = self.now();
        for doc in docs.iter_mut() {
            self.stamp_missing(doc, &now);
        }
    }

    /// Set `updatedAt` to now in the payload's `$set` clause, creating the
    /// clause if needed and keeping whatever else it already sets.
    ///
    /// Returns the stamped value.
    pub fn on_update(&self, update: &mut Document) -> Result<Value> {
        let now = self.now();
        let set = update
            .entry("$set")
            .or_insert_with(|| Value::Object(Map::new()));
        match set {
            Value::Object(fields) => {
                fields.insert(self.updated_at.clone(), now.clone());
                Ok(now)
            }
            other => Err(MuninnError::InvalidDocument(format!(
                "$set must be an object, got {other}"
            ))),
        }
    }

    /// Corrective payload for a document just created by an upsert: copy
    /// its `updatedAt` into `createdAt`.
    ///
    /// The generic update path only ever sets `updatedAt`, so without this
    /// second write an upserted document has no creation time.
    pub fn on_upsert_create(&self, updated_at: &Value) -> Document {
        let mut fields = Map::new();
        fields.insert(self.created_at.clone(), updated_at.clone());
        let mut payload = Map::new();
        payload.insert("$set".to_string(), Value::Object(fields));
        payload
    }

    fn stamp_missing(&self, doc: &mut Document, now: &Value) {
        for field in [&self.created_at, &self.updated_at] {
            match doc.get(field) {
                Some(value) if !value.is_null() => {}
                _ => {
                    doc.insert(field.clone(), now.clone());
                }
            }
        }
    }
}

impl Default for TimestampPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimestampPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimestampPolicy")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Render a timestamp the way it is stored.
pub fn format_timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_policy() -> TimestampPolicy {
        TimestampPolicy::new().with_clock(|| Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("document must be an object"),
        }
    }

    #[test]
    fn insert_stamps_both_fields_with_same_instant() {
        let policy = fixed_policy();
        let mut d = doc(json!({"name": "a"}));
        policy.on_insert(&mut d);
        assert_eq!(d["createdAt"], json!("2024-05-01T12:00:00.000Z"));
        assert_eq!(d["createdAt"], d["updatedAt"]);
        assert_eq!(d["name"], json!("a"));
    }

    #[test]
    fn insert_keeps_existing_values() {
        let policy = fixed_policy();
        let mut d = doc(json!({
            "createdAt": "2020-01-01T00:00:00.000Z",
            "updatedAt": "2021-01-01T00:00:00.000Z"
        }));
        policy.on_insert(&mut d);
        assert_eq!(d["createdAt"], json!("2020-01-01T00:00:00.000Z"));
        assert_eq!(d["updatedAt"], json!("2021-01-01T00:00:00.000Z"));
    }

    #[test]
    fn insert_fills_only_missing_field() {
        let policy = fixed_policy();
        let mut d = doc(json!({"createdAt": "2020-01-01T00:00:00.000Z", "updatedAt": null}));
        policy.on_insert(&mut d);
        assert_eq!(d["createdAt"], json!("2020-01-01T00:00:00.000Z"));
        assert_eq!(d["updatedAt"], json!("2024-05-01T12:00:00.000Z"));
    }

    #[test]
    fn insert_many_stamps_every_document() {
        let policy = fixed_policy();
        let mut docs = vec![doc(json!({"n": 1})), doc(json!({"n": 2}))];
        policy.on_insert_many(&mut docs);
        assert!(docs.iter().all(|d| d["createdAt"] == d["updatedAt"]));
    }

    #[test]
    fn update_merges_into_existing_set() {
        let policy = fixed_policy();
        let mut update = doc(json!({"$set": {"name": "b"}, "$inc": {"n": 1}}));
        let stamped = policy.on_update(&mut update).unwrap();
        assert_eq!(
            update,
            doc(json!({
                "$set": {"name": "b", "updatedAt": "2024-05-01T12:00:00.000Z"},
                "$inc": {"n": 1}
            }))
        );
        assert_eq!(stamped, json!("2024-05-01T12:00:00.000Z"));
    }

    #[test]
    fn update_creates_set_clause() {
        let policy = fixed_policy();
        let mut update = doc(json!({"$unset": {"tmp": ""}}));
        policy.on_update(&mut update).unwrap();
        assert_eq!(update["$set"]["updatedAt"], json!("2024-05-01T12:00:00.000Z"));
    }

    #[test]
    fn update_rejects_non_object_set() {
        let policy = fixed_policy();
        let mut update = doc(json!({"$set": 3}));
        assert!(matches!(
            policy.on_update(&mut update),
            Err(MuninnError::InvalidDocument(_))
        ));
    }

    #[test]
    fn upsert_correction_copies_updated_at() {
        let policy = fixed_policy();
        let payload = policy.on_upsert_create(&json!("2024-05-01T12:00:00.000Z"));
        assert_eq!(
            payload,
            doc(json!({"$set": {"createdAt": "2024-05-01T12:00:00.000Z"}}))
        );
    }

    #[test]
    fn custom_field_names() {
        let config = CollectionConfig::new()
            .created_at_field("created")
            .updated_at_field("modified");
        let policy = TimestampPolicy::from_config(&config);
        let mut d = Document::new();
        policy.on_insert(&mut d);
        assert!(d.contains_key("created"));
        assert!(d.contains_key("modified"));
    }

    #[test]
    fn timestamps_sort_in_time_order() {
        let earlier = format_timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());
        let later = format_timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        assert!(earlier.as_str().unwrap() < later.as_str().unwrap());
    }
}
