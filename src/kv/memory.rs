//! In-memory key-value backend
//!
//! Honors paging (`Limit`), cursors, scan segments, index ordering and
//! direction, and batch semantics. Key conditions and filter expressions
//! are not evaluated; every row of the table is a candidate. Writes can be
//! scripted to come back unprocessed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use futures_util::future::BoxFuture;

use super::backend::KvBackend;
use super::filter::KvFilter;
use super::requests::{projected_fields, BatchGetRequest, DeleteRequest, GetRequest};
use super::update::{AdjustOp, Assignment, ReturnValues, UpdateStatement};
use crate::pagination::{KvCursor, Page};
use crate::schema::GLOBAL_INDEX_SUFFIX;
use crate::store::values::{add_numbers, compare_values, get_path, key_matches, project, set_path};
use crate::store::{Row, StoreError, StoreResult, WriteRequest};

#[derive(Debug, Default)]
struct MemoryTable {
    key_fields: Vec<String>,
    rows: Vec<Row>,
}

impl MemoryTable {
    fn key_of(&self, row: &Row) -> Row {
        self.key_fields
            .iter()
            .filter_map(|k| row.get(k).map(|v| (k.clone(), v.clone())))
            .collect()
    }

    fn position(&self, key: &Row) -> Option<usize> {
        self.rows.iter().position(|row| key_matches(row, key))
    }

    fn upsert(&mut self, row: Row) {
        let key = self.key_of(&row);
        match self.position(&key) {
            Some(i) => self.rows[i] = row,
            None => self.rows.push(row),
        }
    }
}

/// In-memory key-value store for tests
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
    deferred: Mutex<Vec<(Row, u32)>>,
    submissions: Mutex<Vec<usize>>,
    fetches: AtomicUsize,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table and its primary key fields
    pub fn with_table(self, name: &str, key_fields: &[&str]) -> Self {
        if let Ok(mut tables) = self.tables.write() {
            tables.insert(
                name.to_string(),
                MemoryTable {
                    key_fields: key_fields.iter().map(|k| k.to_string()).collect(),
                    rows: Vec::new(),
                },
            );
        }
        self
    }

    /// Upsert rows directly
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Row>) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|e| StoreError::backend(e.to_string()))?;
        let table = tables.get_mut(table).ok_or_else(|| not_found(table))?;
        for row in rows {
            table.upsert(row);
        }
        Ok(())
    }

    /// Rows in insertion order
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .ok()
            .and_then(|tables| tables.get(table).map(|t| t.rows.clone()))
            .unwrap_or_default()
    }

    /// Report batch writes touching `key` as unprocessed the next `times` times
    pub fn defer_writes(&self, key: Row, times: u32) {
        if let Ok(mut deferred) = self.deferred.lock() {
            deferred.push((key, times));
        }
    }

    /// Size of every batch write submission so far
    pub fn batch_submissions(&self) -> Vec<usize> {
        self.submissions.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of query/scan pages served
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn page(&self, filter: &KvFilter) -> StoreResult<Page> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.read().map_err(|e| StoreError::backend(e.to_string()))?;
        let table = tables.get(&filter.table_name).ok_or_else(|| not_found(&filter.table_name))?;

        let mut rows: Vec<&Row> = match (filter.segment, filter.total_segments) {
            (Some(segment), Some(total)) if total > 0 => table
                .rows
                .iter()
                .enumerate()
                .filter(|(i, _)| *i as u32 % total == segment)
                .map(|(_, row)| row)
                .collect(),
            _ => table.rows.iter().collect(),
        };

        let sort_field = filter
            .index_name
            .as_deref()
            .map(|name| name.strip_suffix(GLOBAL_INDEX_SUFFIX).unwrap_or(name));
        if let Some(field) = sort_field {
            rows.sort_by(|a, b| compare_values(a.get(field), b.get(field)));
            if filter.scan_index_forward == Some(false) {
                rows.reverse();
            }
        }

        let start = match &filter.exclusive_start_key {
            Some(cursor) => {
                rows.iter()
                    .position(|row| cursor.matches(row))
                    .ok_or_else(|| StoreError::InvalidCursor("start key not found".into()))?
                    + 1
            }
            None => 0,
        };

        let limit = filter.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let items: Vec<Row> = rows[start..].iter().take(limit).map(|row| (*row).clone()).collect();

        let next_cursor = if start + items.len() < rows.len() {
            let mut keys = table.key_fields.clone();
            keys.extend(sort_field.map(str::to_string));
            items.last().map(|row| KvCursor::from_row(row, &keys))
        } else {
            None
        };

        let projection = projected_fields(
            filter.projection_expression.as_deref(),
            &filter.expression_attribute_names,
        );
        let items = items
            .iter()
            .map(|row| project(row, projection.as_deref()))
            .collect();

        Ok(Page::new(items, next_cursor))
    }

    fn take_deferral(&self, attributes: &Row) -> bool {
        let Ok(mut deferred) = self.deferred.lock() else {
            return false;
        };
        match deferred
            .iter_mut()
            .find(|(key, remaining)| *remaining > 0 && key_matches(attributes, key))
        {
            Some((_, remaining)) => {
                *remaining -= 1;
                true
            }
            None => false,
        }
    }
}

fn not_found(table: &str) -> StoreError {
    StoreError::backend(format!("table '{}' not found", table))
}

fn apply(row: &mut Row, assignment: &Assignment) -> StoreResult<()> {
    match assignment {
        Assignment::Set { path, value } => set_path(row, path, value.clone()),
        Assignment::Adjust { path, op, delta } => {
            let next = add_numbers(get_path(row, path), delta, *op == AdjustOp::Subtract)?;
            set_path(row, path, next)
        }
    }
}

impl KvBackend for MemoryKvStore {
    fn query<'a>(&'a self, filter: &'a KvFilter) -> BoxFuture<'a, StoreResult<Page>> {
        Box::pin(async move { self.page(filter) })
    }

    fn scan<'a>(&'a self, filter: &'a KvFilter) -> BoxFuture<'a, StoreResult<Page>> {
        Box::pin(async move { self.page(filter) })
    }

    fn get_item<'a>(&'a self, request: &'a GetRequest) -> BoxFuture<'a, StoreResult<Option<Row>>> {
        Box::pin(async move {
            let tables = self.tables.read().map_err(|e| StoreError::backend(e.to_string()))?;
            let table = tables.get(&request.table_name).ok_or_else(|| not_found(&request.table_name))?;
            let projection = projected_fields(
                request.projection_expression.as_deref(),
                &request.expression_attribute_names,
            );
            Ok(table
                .position(&request.key)
                .map(|i| project(&table.rows[i], projection.as_deref())))
        })
    }

    fn batch_get<'a>(&'a self, request: &'a BatchGetRequest) -> BoxFuture<'a, StoreResult<Vec<Row>>> {
        Box::pin(async move {
            let tables = self.tables.read().map_err(|e| StoreError::backend(e.to_string()))?;
            let table = tables.get(&request.table_name).ok_or_else(|| not_found(&request.table_name))?;
            let projection = projected_fields(
                request.projection_expression.as_deref(),
                &request.expression_attribute_names,
            );
            Ok(request
                .keys
                .iter()
                .filter_map(|key| table.position(key))
                .map(|i| project(&table.rows[i], projection.as_deref()))
                .collect())
        })
    }

    fn update_item<'a>(&'a self, statement: &'a UpdateStatement) -> BoxFuture<'a, StoreResult<Row>> {
        Box::pin(async move {
            let mut tables = self.tables.write().map_err(|e| StoreError::backend(e.to_string()))?;
            let table = tables
                .get_mut(&statement.table_name)
                .ok_or_else(|| not_found(&statement.table_name))?;

            let index = match table.position(&statement.key) {
                Some(i) => i,
                None => {
                    table.rows.push(statement.key.clone());
                    table.rows.len() - 1
                }
            };

            let mut row = table.rows[index].clone();
            for assignment in statement.assignments() {
                apply(&mut row, assignment)?;
            }
            table.rows[index] = row.clone();

            Ok(match statement.return_values {
                ReturnValues::AllNew => row,
                ReturnValues::UpdatedNew => {
                    let touched: Vec<String> = statement
                        .assignments()
                        .iter()
                        .filter_map(|a| match a {
                            Assignment::Set { path, .. } | Assignment::Adjust { path, .. } => {
                                path.first().cloned()
                            }
                        })
                        .collect();
                    project(&row, Some(&touched))
                }
            })
        })
    }

    fn delete_item<'a>(&'a self, request: &'a DeleteRequest) -> BoxFuture<'a, StoreResult<Option<Row>>> {
        Box::pin(async move {
            let mut tables = self.tables.write().map_err(|e| StoreError::backend(e.to_string()))?;
            let table = tables
                .get_mut(&request.table_name)
                .ok_or_else(|| not_found(&request.table_name))?;
            Ok(table.position(&request.key).map(|i| table.rows.remove(i)))
        })
    }

    fn batch_write<'a>(
        &'a self,
        table: &'a str,
        requests: Vec<WriteRequest>,
    ) -> BoxFuture<'a, StoreResult<Vec<WriteRequest>>> {
        Box::pin(async move {
            if let Ok(mut submissions) = self.submissions.lock() {
                submissions.push(requests.len());
            }

            let mut tables = self.tables.write().map_err(|e| StoreError::backend(e.to_string()))?;
            let stored = tables.get_mut(table).ok_or_else(|| not_found(table))?;

            let mut unprocessed = Vec::new();
            for request in requests {
                if self.take_deferral(request.attributes()) {
                    unprocessed.push(request);
                    continue;
                }
                match request {
                    WriteRequest::Put { item } => stored.upsert(item),
                    WriteRequest::Delete { key } => {
                        if let Some(i) = stored.position(&key) {
                            stored.rows.remove(i);
                        }
                    }
                }
            }
            Ok(unprocessed)
        })
    }
}
