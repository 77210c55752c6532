//! Key-value entity API
//!
//! One `KvEntity` per registered entity type. Reads compile a predicate into
//! a `KvFilter` and hand it to the pagination engine; writes run through the
//! caller's `WriteContext` hooks.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

use super::backend::KvBackend;
use super::filter::KvFilter;
use super::fragment::KvFragment;
use super::requests::{BatchGetRequest, DeleteRequest, GetRequest};
use super::update::{AdjustOp, UpdateStatement};
use crate::config::QueryConfig;
use crate::hooks::{OperationKind, WriteContext};
use crate::pagination::{
    self, KvCursor, Page, PageFetcher, PageRequest, PageResult, SegmentCursor, SegmentedPage,
};
use crate::predicate::{CompileError, CompileOptions, LookupKind, Predicate};
use crate::schema::{KeyLayout, RegisteredSchema, Schema};
use crate::store::values::get_path;
use crate::store::{drive_batch_write, split_chunks, BatchSummary, Row, StoreResult, WriteRequest};

/// Fetches pages of one compiled filter
struct KvPageFetcher<'a> {
    backend: &'a dyn KvBackend,
    filter: KvFilter,
    lookup: LookupKind,
}

impl PageFetcher for KvPageFetcher<'_> {
    fn fetch_page(&self, request: PageRequest) -> BoxFuture<'_, StoreResult<Page>> {
        let mut filter = self.filter.clone().starting_after(request.cursor);
        if let Some(segment) = request.segment {
            filter = filter.in_segment(segment.index, segment.total);
        }

        Box::pin(async move {
            match self.lookup {
                LookupKind::Query => self.backend.query(&filter).await,
                LookupKind::Scan => self.backend.scan(&filter).await,
            }
        })
    }
}

/// Operations on one entity type backed by a key-value store
pub struct KvEntity {
    registered: Arc<RegisteredSchema>,
    backend: Arc<dyn KvBackend>,
    config: QueryConfig,
    table_name: String,
}

impl KvEntity {
    /// Register `schema` and bind it to a backend
    pub fn new(schema: Schema, backend: Arc<dyn KvBackend>, config: QueryConfig) -> StoreResult<Self> {
        let registered = RegisteredSchema::register(schema)?;
        Self::from_registered(Arc::new(registered), backend, config)
    }

    /// Bind an already registered schema
    pub fn from_registered(
        registered: Arc<RegisteredSchema>,
        backend: Arc<dyn KvBackend>,
        config: QueryConfig,
    ) -> StoreResult<Self> {
        config.validate()?;
        let table_name = config.table_name(registered.name());
        Ok(Self {
            registered,
            backend,
            config,
            table_name,
        })
    }

    pub fn name(&self) -> &str {
        self.registered.name()
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn registered(&self) -> &RegisteredSchema {
        &self.registered
    }

    fn layout(&self) -> &KeyLayout {
        self.registered.layout()
    }

    /// Primary key attributes of `row`
    pub fn key_of(&self, row: &Row) -> StoreResult<Row> {
        let (hash_key, range_key) = self.layout().primary_keys();
        let hash_key = hash_key.ok_or_else(|| CompileError::MissingPrimaryKey(self.name().to_string()))?;

        let mut key = Row::new();
        for field in std::iter::once(hash_key).chain(range_key) {
            let value = row
                .get(field)
                .cloned()
                .ok_or_else(|| CompileError::MissingKeyValue(field.to_string()))?;
            key.insert(field.to_string(), value);
        }
        Ok(key)
    }

    // ---------------------------------------------------------------------
    // Point reads
    // ---------------------------------------------------------------------

    /// Read one row. A blank key value reads nothing.
    pub async fn get(&self, key: &Row, fields: Option<&[String]>) -> StoreResult<Option<Row>> {
        if key.values().any(is_blank) {
            return Ok(None);
        }

        let mut request = GetRequest::new(&self.table_name, self.key_of(key)?);
        if let Some(fields) = fields {
            request = request.project(fields);
        }
        self.backend.get_item(&request).await
    }

    /// Read many rows, `batch_get_chunk` keys per round-trip
    pub async fn batch_get(&self, keys: &[Row], fields: Option<&[String]>) -> StoreResult<Vec<Row>> {
        let keys = keys
            .iter()
            .filter(|key| !key.values().any(is_blank))
            .map(|key| self.key_of(key))
            .collect::<StoreResult<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(keys.len());
        for chunk in split_chunks(keys, self.config.batch_get_chunk) {
            let mut request = BatchGetRequest::new(&self.table_name, chunk);
            if let Some(fields) = fields {
                request = request.project(fields);
            }
            rows.extend(self.backend.batch_get(&request).await?);
        }
        Ok(rows)
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Create a row; returns all stored attributes
    pub async fn insert(&self, args: Row, ctx: &WriteContext) -> StoreResult<Option<Row>> {
        self.write(args, ctx, OperationKind::Create).await
    }

    /// Partially update a row; returns all stored attributes
    pub async fn update(&self, args: Row, ctx: &WriteContext) -> StoreResult<Option<Row>> {
        self.write(args, ctx, OperationKind::Update).await
    }

    async fn write(&self, args: Row, ctx: &WriteContext, kind: OperationKind) -> StoreResult<Option<Row>> {
        let args = ctx.before_write(args, kind == OperationKind::Update).await?;
        let statement = UpdateStatement::build(&args, &self.registered, &self.table_name)?;
        if statement.is_noop() {
            tracing::debug!(entity = self.name(), operation = %kind, "update assigns no attributes");
        }

        let stored = match self.backend.update_item(&statement).await {
            Ok(row) => row,
            Err(err) => return ctx.recover(self.name(), kind, err),
        };

        ctx.after_write(self.name(), kind, &args, self.layout().range_key(), Some(&stored))
            .await?;
        Ok(Some(stored))
    }

    /// Delete a row; returns it if it existed
    pub async fn remove(&self, args: Row, ctx: &WriteContext) -> StoreResult<Option<Row>> {
        let request = DeleteRequest {
            table_name: self.table_name.clone(),
            key: self.key_of(&args)?,
        };

        let old = match self.backend.delete_item(&request).await {
            Ok(old) => old,
            Err(err) => return ctx.recover(self.name(), OperationKind::Delete, err),
        };

        ctx.after_write(
            self.name(),
            OperationKind::Delete,
            &args,
            self.layout().range_key(),
            old.as_ref(),
        )
        .await?;
        Ok(old)
    }

    /// Put many rows in chunks, re-submitting unprocessed items
    pub async fn batch_put(&self, items: Vec<Row>, ctx: &WriteContext) -> StoreResult<Option<BatchSummary>> {
        let mut prepared = Vec::with_capacity(items.len());
        for item in items {
            let item = ctx.before_write(item, false).await?;
            self.key_of(&item)?;
            prepared.push(item);
        }

        let requests = prepared
            .iter()
            .map(|item| WriteRequest::Put { item: item.clone() })
            .collect();
        let summary = match self.submit(requests).await {
            Ok(summary) => summary,
            Err(err) => return ctx.recover(self.name(), OperationKind::BatchPut, err),
        };

        if ctx.has_post() {
            for item in &prepared {
                ctx.after_write(
                    self.name(),
                    OperationKind::BatchPut,
                    item,
                    self.layout().range_key(),
                    Some(item),
                )
                .await?;
            }
        }
        Ok(Some(summary))
    }

    /// Delete many rows in chunks, re-submitting unprocessed items
    pub async fn batch_remove(&self, keys: Vec<Row>, ctx: &WriteContext) -> StoreResult<Option<BatchSummary>> {
        let keys = keys
            .iter()
            .map(|key| self.key_of(key))
            .collect::<StoreResult<Vec<_>>>()?;

        let requests = keys
            .iter()
            .map(|key| WriteRequest::Delete { key: key.clone() })
            .collect();
        let summary = match self.submit(requests).await {
            Ok(summary) => summary,
            Err(err) => return ctx.recover(self.name(), OperationKind::Delete, err),
        };

        if ctx.has_post() {
            for key in &keys {
                ctx.after_write(self.name(), OperationKind::Delete, key, self.layout().range_key(), None)
                    .await?;
            }
        }
        Ok(Some(summary))
    }

    /// Submit raw write requests without hooks
    pub async fn batch_write(&self, requests: Vec<WriteRequest>) -> StoreResult<BatchSummary> {
        self.submit(requests).await
    }

    async fn submit(&self, requests: Vec<WriteRequest>) -> StoreResult<BatchSummary> {
        let summary = drive_batch_write(
            requests,
            self.config.batch_write_chunk,
            &self.config.retry,
            |chunk| self.backend.batch_write(&self.table_name, chunk),
        )
        .await?;

        tracing::debug!(
            entity = self.name(),
            items = summary.items,
            submissions = summary.submissions,
            "batch write drained"
        );
        Ok(summary)
    }

    /// `field += by`; returns the new value
    pub async fn increment(&self, key: &Row, field: &str, by: impl Into<Value>) -> StoreResult<Option<Value>> {
        self.adjust(key, vec![field.to_string()], AdjustOp::Add, by.into()).await
    }

    /// `field -= by`; returns the new value
    pub async fn decrement(&self, key: &Row, field: &str, by: impl Into<Value>) -> StoreResult<Option<Value>> {
        self.adjust(key, vec![field.to_string()], AdjustOp::Subtract, by.into()).await
    }

    /// `map.field += by` on a map attribute; returns the new value
    pub async fn increment_map(
        &self,
        key: &Row,
        map: &str,
        field: &str,
        by: impl Into<Value>,
    ) -> StoreResult<Option<Value>> {
        self.adjust(key, vec![map.to_string(), field.to_string()], AdjustOp::Add, by.into())
            .await
    }

    async fn adjust(&self, key: &Row, path: Vec<String>, op: AdjustOp, delta: Value) -> StoreResult<Option<Value>> {
        let statement = UpdateStatement::adjust(&self.table_name, self.key_of(key)?, path.clone(), op, delta);
        let updated = self.backend.update_item(&statement).await?;
        Ok(get_path(&updated, &path).cloned())
    }

    // ---------------------------------------------------------------------
    // Retrieval
    // ---------------------------------------------------------------------

    /// Fill in what the lookup kind and configuration decide
    fn options(&self, options: CompileOptions, lookup: LookupKind) -> CompileOptions {
        let strict = options.strict || self.config.strict_predicates;
        let page_size = options.page_size.or(Some(self.config.page_size));
        CompileOptions {
            lookup,
            strict,
            page_size,
            ..options
        }
    }

    fn fetcher(
        &self,
        predicate: &Predicate,
        options: &CompileOptions,
        extra: Option<&KvFragment>,
    ) -> StoreResult<KvPageFetcher<'_>> {
        let filter = KvFilter::compile(predicate, &self.registered, options, &self.table_name, extra)?;
        Ok(KvPageFetcher {
            backend: self.backend.as_ref(),
            filter,
            lookup: options.lookup,
        })
    }

    fn cursor_keys(&self, options: &CompileOptions) -> Vec<String> {
        self.layout()
            .cursor_keys(options.sort.as_ref().map(|sort| sort.index.as_str()))
    }

    /// Every matching row of a narrowing lookup
    pub async fn query_all(
        &self,
        predicate: &Predicate,
        options: CompileOptions,
        extra: Option<&KvFragment>,
    ) -> StoreResult<Vec<Row>> {
        let options = self.options(options, LookupKind::Query);
        let fetcher = self.fetcher(predicate, &options, extra)?;
        pagination::query_all(&fetcher).await
    }

    /// Up to `limit` rows of a narrowing lookup, resuming after `start`
    pub async fn query_pagination(
        &self,
        predicate: &Predicate,
        options: CompileOptions,
        extra: Option<&KvFragment>,
        start: Option<KvCursor>,
        limit: usize,
    ) -> StoreResult<PageResult> {
        let options = self.options(options, LookupKind::Query);
        let fetcher = self.fetcher(predicate, &options, extra)?;
        pagination::query_pagination(&fetcher, start, limit, &self.cursor_keys(&options)).await
    }

    /// Number of rows a narrowing lookup matches
    pub async fn total_count(
        &self,
        predicate: &Predicate,
        options: CompileOptions,
        extra: Option<&KvFragment>,
    ) -> StoreResult<usize> {
        let options = self.options(options, LookupKind::Query);
        let fetcher = self.fetcher(predicate, &options, extra)?;
        pagination::total_count(&fetcher).await
    }

    /// Every matching row of a segmented scan
    pub async fn search_all(
        &self,
        predicate: &Predicate,
        options: CompileOptions,
        extra: Option<&KvFragment>,
    ) -> StoreResult<Vec<Row>> {
        let options = self.options(options, LookupKind::Scan);
        let fetcher = self.fetcher(predicate, &options, extra)?;
        pagination::search_all(&fetcher, self.config.total_segments).await
    }

    /// Up to `limit` rows of a segmented scan; `start` holds one cursor per
    /// segment when resuming
    pub async fn search_pagination(
        &self,
        predicate: &Predicate,
        options: CompileOptions,
        extra: Option<&KvFragment>,
        start: Option<&[SegmentCursor]>,
        limit: usize,
    ) -> StoreResult<SegmentedPage> {
        let options = self.options(options, LookupKind::Scan);
        let fetcher = self.fetcher(predicate, &options, extra)?;
        pagination::search_pagination(
            &fetcher,
            start,
            self.config.total_segments,
            limit,
            &self.cursor_keys(&options),
        )
        .await
    }
}

impl std::fmt::Debug for KvEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvEntity")
            .field("name", &self.name())
            .field("table_name", &self.table_name)
            .field("config", &self.config)
            .finish()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
