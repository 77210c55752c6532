//! In-memory document backend
//!
//! Evaluates the condition documents the renderer emits: equality (with
//! array membership), `$in`, `$ne`, `$regex`/`$options`, `$gte`/`$lte`
//! (extended-JSON dates compare as instants), `$exists`, `$and`, `$or`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use futures_util::future::BoxFuture;
use regex::RegexBuilder;
use serde_json::{Map, Value};

use super::backend::{BulkOp, DocumentBackend, PageWindow};
use super::dates::parse_instant;
use super::query::DocumentQuery;
use super::update::DocumentUpdate;
use crate::store::values::{add_numbers, compare_values, get_path, key_matches, project, set_path};
use crate::store::{Row, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Collection {
    unique: Vec<String>,
    documents: Vec<Row>,
}

impl Collection {
    fn unique_key(&self, document: &Row) -> Row {
        self.unique
            .iter()
            .filter_map(|k| document.get(k).map(|v| (k.clone(), v.clone())))
            .collect()
    }

    fn position(&self, filter: &Row) -> Option<usize> {
        self.documents.iter().position(|doc| key_matches(doc, filter))
    }

    fn apply(&mut self, update: &DocumentUpdate) -> StoreResult<Option<Row>> {
        let index = match self.position(&update.filter) {
            Some(i) => i,
            None if update.upsert => {
                self.documents.push(update.filter.clone());
                self.documents.len() - 1
            }
            None => return Ok(None),
        };

        let mut document = self.documents[index].clone();
        for (path, value) in &update.set {
            set_path(&mut document, &split(path), value.clone())?;
        }
        for (path, delta) in &update.inc {
            let path = split(path);
            let next = add_numbers(get_path(&document, &path), delta, false)?;
            set_path(&mut document, &path, next)?;
        }
        self.documents[index] = document.clone();
        Ok(Some(document))
    }
}

/// In-memory document store for tests
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a collection and its unique key fields
    pub fn with_collection(self, name: &str, unique: &[&str]) -> Self {
        if let Ok(mut collections) = self.collections.write() {
            collections.insert(
                name.to_string(),
                Collection {
                    unique: unique.iter().map(|k| k.to_string()).collect(),
                    documents: Vec::new(),
                },
            );
        }
        self
    }

    pub fn seed(&self, collection: &str, documents: impl IntoIterator<Item = Row>) -> StoreResult<()> {
        let mut collections = self.collections.write().map_err(|e| StoreError::backend(e.to_string()))?;
        let collection = collections.get_mut(collection).ok_or_else(|| not_found(collection))?;
        collection.documents.extend(documents);
        Ok(())
    }

    /// Documents in insertion order
    pub fn documents(&self, collection: &str) -> Vec<Row> {
        self.collections
            .read()
            .ok()
            .and_then(|c| c.get(collection).map(|c| c.documents.clone()))
            .unwrap_or_default()
    }

    fn matching(&self, collection: &str, query: &DocumentQuery) -> StoreResult<Vec<Row>> {
        let collections = self.collections.read().map_err(|e| StoreError::backend(e.to_string()))?;
        let collection = collections.get(collection).ok_or_else(|| not_found(collection))?;

        let mut found = Vec::new();
        for document in &collection.documents {
            if matches(document, &query.conditions)? {
                found.push(document.clone());
            }
        }

        if let Some(sort) = &query.sort {
            let path = split(&sort.field);
            found.sort_by(|a, b| compare_values(get_path(a, &path), get_path(b, &path)));
            if sort.descending {
                found.reverse();
            }
        }
        Ok(found)
    }
}

fn not_found(collection: &str) -> StoreError {
    StoreError::backend(format!("collection '{}' not found", collection))
}

fn split(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// Evaluate a condition document against a document
fn matches(document: &Row, conditions: &Map<String, Value>) -> StoreResult<bool> {
    for (key, condition) in conditions {
        let ok = match key.as_str() {
            "$and" | "$or" => {
                let clauses = condition
                    .as_array()
                    .ok_or_else(|| StoreError::backend(format!("{} expects an array", key)))?;
                let mut results = Vec::with_capacity(clauses.len());
                for clause in clauses {
                    let clause = clause
                        .as_object()
                        .ok_or_else(|| StoreError::backend(format!("{} clause must be a document", key)))?;
                    results.push(matches(document, clause)?);
                }
                if key == "$and" {
                    results.iter().all(|r| *r)
                } else {
                    results.iter().any(|r| *r)
                }
            }
            path => matches_field(get_path(document, &split(path)), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_operator_document(condition: &Value) -> bool {
    match condition.as_object() {
        Some(map) => !map.is_empty() && !map.contains_key("$date") && map.keys().all(|k| k.starts_with('$')),
        None => false,
    }
}

fn matches_field(value: Option<&Value>, condition: &Value) -> StoreResult<bool> {
    if !is_operator_document(condition) {
        return Ok(equals(value, condition));
    }

    let Some(operators) = condition.as_object() else {
        return Ok(false);
    };
    for (op, operand) in operators {
        let ok = match op.as_str() {
            "$regex" => {
                let insensitive = operators
                    .get("$options")
                    .and_then(Value::as_str)
                    .is_some_and(|o| o.contains('i'));
                let pattern = operand.as_str().unwrap_or_default();
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(insensitive)
                    .build()
                    .map_err(|e| StoreError::backend(e.to_string()))?;
                value.and_then(Value::as_str).is_some_and(|s| regex.is_match(s))
            }
            "$options" => true,
            "$in" => operand
                .as_array()
                .is_some_and(|candidates| candidates.iter().any(|c| equals(value, c))),
            "$ne" => !equals(value, operand),
            "$gte" => compare_bound(value, operand).is_some_and(|o| o != Ordering::Less),
            "$lte" => compare_bound(value, operand).is_some_and(|o| o != Ordering::Greater),
            "$exists" => value.is_some() == operand.as_bool().unwrap_or(true),
            other => return Err(StoreError::backend(format!("unsupported operator '{}'", other))),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Equality; an array field matches when it holds the value
fn equals(value: Option<&Value>, expected: &Value) -> bool {
    match value {
        Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
        Some(v) => v == expected,
        None => expected.is_null(),
    }
}

fn compare_bound(value: Option<&Value>, bound: &Value) -> Option<Ordering> {
    let value = value?;
    if bound.get("$date").is_some() {
        let (v, b) = (parse_instant(value)?, parse_instant(bound)?);
        return Some(v.cmp(&b));
    }
    Some(compare_values(Some(value), Some(bound)))
}

impl DocumentBackend for MemoryDocumentStore {
    fn find<'a>(
        &'a self,
        collection: &'a str,
        query: &'a DocumentQuery,
        window: Option<PageWindow>,
    ) -> BoxFuture<'a, StoreResult<Vec<Row>>> {
        Box::pin(async move {
            let found = self.matching(collection, query)?;
            let fields = (!query.projection.is_empty()).then_some(query.projection.as_slice());
            let (skip, limit) = window.map_or((0, usize::MAX), |w| (w.skip, w.limit));
            Ok(found
                .iter()
                .skip(skip)
                .take(limit)
                .map(|doc| project(doc, fields))
                .collect())
        })
    }

    fn count<'a>(&'a self, collection: &'a str, query: &'a DocumentQuery) -> BoxFuture<'a, StoreResult<usize>> {
        Box::pin(async move { Ok(self.matching(collection, query)?.len()) })
    }

    fn find_one<'a>(&'a self, collection: &'a str, filter: &'a Row) -> BoxFuture<'a, StoreResult<Option<Row>>> {
        Box::pin(async move {
            let collections = self.collections.read().map_err(|e| StoreError::backend(e.to_string()))?;
            let collection = collections.get(collection).ok_or_else(|| not_found(collection))?;
            for document in &collection.documents {
                if matches(document, filter)? {
                    return Ok(Some(document.clone()));
                }
            }
            Ok(None)
        })
    }

    fn insert_one<'a>(&'a self, collection: &'a str, document: Row) -> BoxFuture<'a, StoreResult<Row>> {
        Box::pin(async move {
            let mut collections = self.collections.write().map_err(|e| StoreError::backend(e.to_string()))?;
            let stored = collections.get_mut(collection).ok_or_else(|| not_found(collection))?;
            let key = stored.unique_key(&document);
            if stored.position(&key).is_some() {
                return Err(StoreError::backend(format!(
                    "duplicate key {} in '{}'",
                    Value::Object(key),
                    collection
                )));
            }
            stored.documents.push(document.clone());
            Ok(document)
        })
    }

    fn update_one<'a>(
        &'a self,
        collection: &'a str,
        update: &'a DocumentUpdate,
    ) -> BoxFuture<'a, StoreResult<Option<Row>>> {
        Box::pin(async move {
            let mut collections = self.collections.write().map_err(|e| StoreError::backend(e.to_string()))?;
            let stored = collections.get_mut(collection).ok_or_else(|| not_found(collection))?;
            stored.apply(update)
        })
    }

    fn delete_one<'a>(&'a self, collection: &'a str, filter: &'a Row) -> BoxFuture<'a, StoreResult<Option<Row>>> {
        Box::pin(async move {
            let mut collections = self.collections.write().map_err(|e| StoreError::backend(e.to_string()))?;
            let stored = collections.get_mut(collection).ok_or_else(|| not_found(collection))?;
            Ok(stored.position(filter).map(|i| stored.documents.remove(i)))
        })
    }

    fn bulk_write<'a>(&'a self, collection: &'a str, ops: Vec<BulkOp>) -> BoxFuture<'a, StoreResult<usize>> {
        Box::pin(async move {
            let mut collections = self.collections.write().map_err(|e| StoreError::backend(e.to_string()))?;
            let stored = collections.get_mut(collection).ok_or_else(|| not_found(collection))?;

            let mut touched = 0;
            for op in ops {
                let hit = match op {
                    BulkOp::Update(update) => stored.apply(&update)?.is_some(),
                    BulkOp::Delete(filter) => match stored.position(&filter) {
                        Some(i) => {
                            stored.documents.remove(i);
                            true
                        }
                        None => false,
                    },
                };
                if hit {
                    touched += 1;
                }
            }
            Ok(touched)
        })
    }
}
