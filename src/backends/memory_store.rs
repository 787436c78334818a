//! In-process document store.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Number, Value};
use tokio::sync::RwLock;

use crate::traits::DocumentStore;
use crate::types::{
    DeleteResult, Document, FindAndModifyResult, InsertResult, OperationOptions, Query,
    UpdateResult,
};
use crate::{MuninnError, Result};

/// A single collection held in memory.
///
/// Filters are top-level field equality only. Updates must be expressed
/// with `$set`, `$unset` or `$inc`; replacement documents are rejected.
/// Documents without an id get a sequential integer id on insert. The
/// `limit` option is honoured by `find`.
pub struct MemoryDocumentStore {
    name: String,
    id_field: String,
    docs: RwLock<Vec<Document>>,
    next_id: AtomicU64,
}

impl MemoryDocumentStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_field: "_id".to_string(),
            docs: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Copy of every stored document, in insertion order.
    pub async fn snapshot(&self) -> Vec<Document> {
        self.docs.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn assign_id(&self, doc: &mut Document, existing: &[Document]) -> Result<Value> {
        if let Some(id) = doc.get(&self.id_field).cloned() {
            if existing.iter().any(|d| d.get(&self.id_field) == Some(&id)) {
                return Err(MuninnError::Store(format!(
                    "duplicate key: {}={id}",
                    self.id_field
                )));
            }
            return Ok(id);
        }
        let id = Value::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        doc.insert(self.id_field.clone(), id.clone());
        Ok(id)
    }

    /// Build the document an upsert creates: equality fields of the filter
    /// with the update applied on top.
    fn upsert_seed(&self, filter: &Query, update: &Document) -> Result<Document> {
        let mut doc: Document = filter
            .iter()
            .filter(|(k, _)| !k.starts_with('$'))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        apply_update(&mut doc, update)?;
        Ok(doc)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, query: &Query, options: &OperationOptions) -> Result<Vec<Document>> {
        let limit = options
            .extra
            .get("limit")
            .and_then(Value::as_u64)
            .filter(|n| *n > 0)
            .unwrap_or(u64::MAX);
        check_filter(query)?;
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|doc| matches(doc, query))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn find_one(
        &self,
        query: &Query,
        _options: &OperationOptions,
    ) -> Result<Option<Document>> {
        let docs = self.docs.read().await;
        Ok(position(&docs, query)?.map(|index| docs[index].clone()))
    }

    async fn insert_one(&self, doc: Document, options: &OperationOptions) -> Result<InsertResult> {
        self.insert_many(vec![doc], options).await
    }

    async fn insert_many(
        &self,
        docs: Vec<Document>,
        _options: &OperationOptions,
    ) -> Result<InsertResult> {
        let mut stored = self.docs.write().await;
        let mut inserted_ids = Vec::with_capacity(docs.len());
        for mut doc in docs {
            inserted_ids.push(self.assign_id(&mut doc, &stored)?);
            stored.push(doc);
        }
        Ok(InsertResult {
            inserted_count: inserted_ids.len() as u64,
            inserted_ids,
        })
    }

    async fn update_one(
        &self,
        filter: &Query,
        update: &Document,
        options: &OperationOptions,
    ) -> Result<UpdateResult> {
        update_matching(self, filter, update, options, false).await
    }

    async fn update_many(
        &self,
        filter: &Query,
        update: &Document,
        options: &OperationOptions,
    ) -> Result<UpdateResult> {
        update_matching(self, filter, update, options, true).await
    }

    async fn find_one_and_update(
        &self,
        filter: &Query,
        update: &Document,
        options: &OperationOptions,
    ) -> Result<FindAndModifyResult> {
        let mut docs = self.docs.write().await;
        if let Some(index) = position(&docs, filter)? {
            let before = docs[index].clone();
            apply_update(&mut docs[index], update)?;
            let value = if options.returns_updated_document() {
                docs[index].clone()
            } else {
                before
            };
            return Ok(FindAndModifyResult {
                value: Some(value),
                matched_count: 1,
                updated_existing: true,
                upserted_id: None,
            });
        }

        if !options.is_upsert() {
            return Ok(FindAndModifyResult::default());
        }

        let mut created = self.upsert_seed(filter, update)?;
        let id = self.assign_id(&mut created, &docs)?;
        docs.push(created.clone());
        Ok(FindAndModifyResult {
            value: options.returns_updated_document().then_some(created),
            matched_count: 1,
            updated_existing: false,
            upserted_id: Some(id),
        })
    }

    async fn find_one_and_delete(
        &self,
        filter: &Query,
        _options: &OperationOptions,
    ) -> Result<Option<Document>> {
        let mut docs = self.docs.write().await;
        Ok(position(&docs, filter)?.map(|index| docs.remove(index)))
    }

    async fn remove(&self, filter: &Query, _options: &OperationOptions) -> Result<DeleteResult> {
        check_filter(filter)?;
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|doc| !matches(doc, filter));
        Ok(DeleteResult {
            deleted_count: (before - docs.len()) as u64,
        })
    }
}

async fn update_matching(
    store: &MemoryDocumentStore,
    filter: &Query,
    update: &Document,
    options: &OperationOptions,
    multi: bool,
) -> Result<UpdateResult> {
    check_filter(filter)?;
    let mut docs = store.docs.write().await;
    let mut result = UpdateResult::default();

    // Nothing is written back unless every matching document takes the update.
    let mut staged = Vec::new();
    for (index, doc) in docs.iter().enumerate() {
        if !matches(doc, filter) {
            continue;
        }
        let mut updated = doc.clone();
        if apply_update(&mut updated, update)? {
            result.modified_count += 1;
        }
        staged.push((index, updated));
        if !multi {
            break;
        }
    }
    result.matched_count = staged.len() as u64;
    for (index, updated) in staged {
        docs[index] = updated;
    }

    if result.matched_count > 0 {
        result.updated_existing = true;
    } else if options.is_upsert() {
        let mut created = store.upsert_seed(filter, update)?;
        result.upserted_id = Some(store.assign_id(&mut created, &docs)?);
        docs.push(created);
    }
    Ok(result)
}

fn position(docs: &[Document], filter: &Query) -> Result<Option<usize>> {
    check_filter(filter)?;
    Ok(docs.iter().position(|doc| matches(doc, filter)))
}

/// Reject filters using query operators.
fn check_filter(filter: &Query) -> Result<()> {
    for (field, expected) in filter {
        if field.starts_with('$') {
            return Err(MuninnError::UnsupportedOperator(field.clone()));
        }
        if let Value::Object(inner) = expected
            && let Some(op) = inner.keys().find(|k| k.starts_with('$'))
        {
            return Err(MuninnError::UnsupportedOperator(op.clone()));
        }
    }
    Ok(())
}

/// Top-level equality match. The filter must have passed [`check_filter`].
fn matches(doc: &Document, filter: &Query) -> bool {
    filter
        .iter()
        .all(|(field, expected)| doc.get(field) == Some(expected))
}

/// Apply an operator update. Returns whether the document changed; on
/// error `doc` is left untouched.
fn apply_update(target: &mut Document, update: &Document) -> Result<bool> {
    let mut next = target.clone();
    let doc = &mut next;
    for (op, fields) in update {
        let fields = fields.as_object().ok_or_else(|| {
            MuninnError::InvalidDocument(format!("{op} expects an object"))
        })?;
        match op.as_str() {
            "$set" => {
                for (field, value) in fields {
                    doc.insert(field.clone(), value.clone());
                }
            }
            "$unset" => {
                for field in fields.keys() {
                    doc.remove(field);
                }
            }
            "$inc" => {
                for (field, delta) in fields {
                    let current = doc.get(field).cloned().unwrap_or(Value::from(0));
                    doc.insert(field.clone(), increment(field, &current, delta)?);
                }
            }
            other if other.starts_with('$') => {
                return Err(MuninnError::UnsupportedOperator(other.to_string()));
            }
            other => {
                return Err(MuninnError::InvalidDocument(format!(
                    "replacement documents are not supported (field {other})"
                )));
            }
        }
    }
    let changed = next != *target;
    *target = next;
    Ok(changed)
}

fn increment(field: &str, current: &Value, delta: &Value) -> Result<Value> {
    let not_numeric = || MuninnError::InvalidDocument(format!("$inc on non-numeric field {field}"));
    let (Value::Number(a), Value::Number(b)) = (current, delta) else {
        return Err(not_numeric());
    };
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64())
        && let Some(sum) = a.checked_add(b)
    {
        return Ok(Value::from(sum));
    }
    let sum = a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default();
    Number::from_f64(sum).map(Value::Number).ok_or_else(not_numeric)
}
