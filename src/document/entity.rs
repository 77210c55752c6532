//! Document entity API
//!
//! Same surface as the key-value entity. Pagination is page-number based:
//! the continuation token is the next page, and scans are plain finds.

use std::sync::Arc;

use serde_json::Value;

use super::backend::{BulkOp, DocumentBackend, PageWindow};
use super::fragment::DocumentFragment;
use super::query::DocumentQuery;
use super::update::{unique_key, DocumentUpdate};
use crate::config::QueryConfig;
use crate::hooks::{OperationKind, WriteContext};
use crate::pagination::Termination;
use crate::predicate::{CompileOptions, Predicate};
use crate::schema::{RegisteredSchema, Schema};
use crate::store::values::{get_path, project};
use crate::store::{Row, StoreError, StoreResult};

/// One page of a document query
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPage {
    pub items: Vec<Row>,
    /// Page to request next; `None` once the last page was returned
    pub next_page: Option<u64>,
    pub termination: Termination,
}

/// Operations on one entity type backed by a document store
pub struct DocumentEntity {
    registered: Arc<RegisteredSchema>,
    backend: Arc<dyn DocumentBackend>,
    config: QueryConfig,
    collection: String,
}

impl DocumentEntity {
    pub fn new(schema: Schema, backend: Arc<dyn DocumentBackend>, config: QueryConfig) -> StoreResult<Self> {
        let registered = RegisteredSchema::register(schema)?;
        Self::from_registered(Arc::new(registered), backend, config)
    }

    pub fn from_registered(
        registered: Arc<RegisteredSchema>,
        backend: Arc<dyn DocumentBackend>,
        config: QueryConfig,
    ) -> StoreResult<Self> {
        config.validate()?;
        let collection = config.table_name(registered.name());
        Ok(Self {
            registered,
            backend,
            config,
            collection,
        })
    }

    pub fn name(&self) -> &str {
        self.registered.name()
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn range_key(&self) -> Option<&str> {
        self.registered.layout().range_key()
    }

    /// First document matching `filter`
    pub async fn get(&self, filter: &Row, fields: Option<&[String]>) -> StoreResult<Option<Row>> {
        if filter.values().any(|v| v.is_null() || v.as_str() == Some("")) {
            return Ok(None);
        }
        let found = self.backend.find_one(&self.collection, filter).await?;
        Ok(found.map(|doc| project(&doc, fields)))
    }

    /// One lookup per filter; misses are omitted
    pub async fn batch_get(&self, filters: &[Row], fields: Option<&[String]>) -> StoreResult<Vec<Row>> {
        let mut found = Vec::with_capacity(filters.len());
        for filter in filters {
            if let Some(doc) = self.get(filter, fields).await? {
                found.push(doc);
            }
        }
        Ok(found)
    }

    pub async fn insert(&self, args: Row, ctx: &WriteContext) -> StoreResult<Option<Row>> {
        let args = ctx.before_write(args, false).await?;
        let stored = match self.backend.insert_one(&self.collection, args.clone()).await {
            Ok(doc) => doc,
            Err(err) => return ctx.recover(self.name(), OperationKind::Create, err),
        };
        ctx.after_write(self.name(), OperationKind::Create, &args, self.range_key(), Some(&stored))
            .await?;
        Ok(Some(stored))
    }

    /// `$set` the change-set on the document with the same unique key;
    /// `None` when no document matched
    pub async fn update(&self, args: Row, ctx: &WriteContext) -> StoreResult<Option<Row>> {
        let args = ctx.before_write(args, true).await?;
        let update = DocumentUpdate::build(&args, &self.registered)?;
        let stored = match self.backend.update_one(&self.collection, &update).await {
            Ok(doc) => doc,
            Err(err) => return ctx.recover(self.name(), OperationKind::Update, err),
        };
        ctx.after_write(self.name(), OperationKind::Update, &args, self.range_key(), stored.as_ref())
            .await?;
        Ok(stored)
    }

    pub async fn remove(&self, args: Row, ctx: &WriteContext) -> StoreResult<Option<Row>> {
        let filter = unique_key(&args, &self.registered)?;
        let old = match self.backend.delete_one(&self.collection, &filter).await {
            Ok(old) => old,
            Err(err) => return ctx.recover(self.name(), OperationKind::Delete, err),
        };

        let input = if old.is_some() { args } else { Row::new() };
        ctx.after_write(self.name(), OperationKind::Delete, &input, self.range_key(), old.as_ref())
            .await?;
        Ok(old)
    }

    /// Upsert every item in one bulk write
    pub async fn batch_put(&self, items: Vec<Row>, ctx: &WriteContext) -> StoreResult<Option<usize>> {
        let mut prepared = Vec::with_capacity(items.len());
        let mut ops = Vec::with_capacity(items.len());
        for item in items {
            let item = ctx.before_write(item, false).await?;
            let update = DocumentUpdate::build(&item, &self.registered)?.upserting();
            ops.push(BulkOp::Update(update));
            prepared.push(item);
        }

        let touched = match self.backend.bulk_write(&self.collection, ops).await {
            Ok(touched) => touched,
            Err(err) => return ctx.recover(self.name(), OperationKind::BatchPut, err),
        };

        for item in &prepared {
            ctx.after_write(self.name(), OperationKind::BatchPut, item, self.range_key(), Some(item))
                .await?;
        }
        Ok(Some(touched))
    }

    pub async fn batch_remove(&self, keys: Vec<Row>, ctx: &WriteContext) -> StoreResult<Option<usize>> {
        let ops = keys
            .iter()
            .map(|key| unique_key(key, &self.registered).map(BulkOp::Delete))
            .collect::<Result<Vec<_>, _>>()?;

        let touched = match self.backend.bulk_write(&self.collection, ops).await {
            Ok(touched) => touched,
            Err(err) => return ctx.recover(self.name(), OperationKind::Delete, err),
        };

        for key in &keys {
            ctx.after_write(self.name(), OperationKind::Delete, key, self.range_key(), Some(key))
                .await?;
        }
        Ok(Some(touched))
    }

    pub async fn increment(&self, key: &Row, field: &str, by: impl Into<Value>) -> StoreResult<Option<Value>> {
        self.inc(key, vec![field.to_string()], by.into()).await
    }

    pub async fn decrement(&self, key: &Row, field: &str, by: impl Into<Value>) -> StoreResult<Option<Value>> {
        let by = by.into();
        let negated = match by.as_i64() {
            Some(n) => Value::from(-n),
            None => by
                .as_f64()
                .map(|f| Value::from(-f))
                .ok_or_else(|| StoreError::backend("decrement by a non-numeric value"))?,
        };
        self.inc(key, vec![field.to_string()], negated).await
    }

    /// `$inc` on `map.field`
    pub async fn increment_map(
        &self,
        key: &Row,
        map: &str,
        field: &str,
        by: impl Into<Value>,
    ) -> StoreResult<Option<Value>> {
        self.inc(key, vec![map.to_string(), field.to_string()], by.into()).await
    }

    async fn inc(&self, key: &Row, path: Vec<String>, delta: Value) -> StoreResult<Option<Value>> {
        let update = DocumentUpdate::increment(unique_key(key, &self.registered)?, &path, delta);
        let updated = self.backend.update_one(&self.collection, &update).await?;
        Ok(updated.and_then(|doc| get_path(&doc, &path).cloned()))
    }

    fn compile(
        &self,
        predicate: &Predicate,
        options: CompileOptions,
        extra: Option<&DocumentFragment>,
    ) -> StoreResult<DocumentQuery> {
        let options = CompileOptions {
            strict: options.strict || self.config.strict_predicates,
            ..options
        };
        Ok(DocumentQuery::compile(predicate, &self.registered, &options, extra)?)
    }

    pub async fn query_all(
        &self,
        predicate: &Predicate,
        options: CompileOptions,
        extra: Option<&DocumentFragment>,
    ) -> StoreResult<Vec<Row>> {
        let query = self.compile(predicate, options, extra)?;
        self.backend.find(&self.collection, &query, None).await
    }

    /// Page `page` (1-based, default 1) of `limit` documents
    pub async fn query_pagination(
        &self,
        predicate: &Predicate,
        options: CompileOptions,
        extra: Option<&DocumentFragment>,
        page: Option<u64>,
        limit: usize,
    ) -> StoreResult<DocumentPage> {
        if limit == 0 {
            return Err(StoreError::InvalidLimit(limit));
        }
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(StoreError::InvalidCursor("pages start at 1".into()));
        }

        let query = self.compile(predicate, options, extra)?;
        let window = PageWindow::page(page, limit);
        let items = self.backend.find(&self.collection, &query, Some(window)).await?;
        let total = self.backend.count(&self.collection, &query).await?;

        let has_next = window.skip + items.len() < total;
        tracing::debug!(entity = self.name(), page, total, has_next, "fetched document page");

        Ok(DocumentPage {
            items,
            next_page: has_next.then_some(page + 1),
            termination: if has_next {
                Termination::LimitReached
            } else {
                Termination::Done
            },
        })
    }

    pub async fn total_count(
        &self,
        predicate: &Predicate,
        options: CompileOptions,
        extra: Option<&DocumentFragment>,
    ) -> StoreResult<usize> {
        let query = self.compile(predicate, options, extra)?;
        self.backend.count(&self.collection, &query).await
    }

    /// Same as `query_all`; the document store has no segmented scan
    pub async fn search_all(
        &self,
        predicate: &Predicate,
        options: CompileOptions,
        extra: Option<&DocumentFragment>,
    ) -> StoreResult<Vec<Row>> {
        self.query_all(predicate, options, extra).await
    }

    /// Same as `query_pagination`
    pub async fn search_pagination(
        &self,
        predicate: &Predicate,
        options: CompileOptions,
        extra: Option<&DocumentFragment>,
        page: Option<u64>,
        limit: usize,
    ) -> StoreResult<DocumentPage> {
        self.query_pagination(predicate, options, extra, page, limit).await
    }
}

impl std::fmt::Debug for DocumentEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentEntity")
            .field("name", &self.name())
            .field("collection", &self.collection)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocumentStore;
    use crate::predicate::{MatchMode, SortSpec};
    use crate::schema::FieldDescriptor;
    use serde_json::json;
    use std::sync::Mutex;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn users(store: Arc<MemoryDocumentStore>) -> DocumentEntity {
        let schema = Schema::new("users")
            .with_field("id", FieldDescriptor::string().hash_key())
            .with_field("name", FieldDescriptor::string())
            .with_field("age", FieldDescriptor::number().local_index())
            .with_field("tags", FieldDescriptor::list())
            .with_field("counts", FieldDescriptor::map());
        DocumentEntity::new(schema, store, QueryConfig::default().with_table_prefix("t_")).unwrap()
    }

    fn seeded() -> Arc<MemoryDocumentStore> {
        let store = MemoryDocumentStore::new().with_collection("t_users", &["id"]);
        store
            .seed(
                "t_users",
                (1..=5).map(|n| row(json!({"id": format!("u{}", n), "name": format!("User{}", n), "age": 50 - n}))),
            )
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_pagination_by_page_number() {
        let users = users(seeded());
        let options = CompileOptions::default().with_sort(Some(SortSpec::asc("age")));

        let first = users
            .query_pagination(&Predicate::new(), options.clone(), None, None, 2)
            .await
            .unwrap();
        assert_eq!(first.items[0]["id"], json!("u5"));
        assert_eq!(first.next_page, Some(2));

        let last = users
            .search_pagination(&Predicate::new(), options, None, Some(3), 2)
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.next_page, None);
        assert_eq!(last.termination, Termination::Done);
    }

    #[tokio::test]
    async fn test_contains_query_and_count() {
        let users = users(seeded());
        let options = CompileOptions::default().with_match_mode(MatchMode::Contains);
        let predicate = Predicate::new().eq("name", "user");

        assert_eq!(users.query_all(&predicate, options.clone(), None).await.unwrap().len(), 5);
        assert_eq!(
            users
                .total_count(&Predicate::new().eq("id", "u2"), CompileOptions::default(), None)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_write_cycle_with_hooks() {
        let store = seeded();
        let users = users(Arc::clone(&store));
        let kinds: Arc<Mutex<Vec<OperationKind>>> = Arc::default();
        let sink = Arc::clone(&kinds);
        let ctx = WriteContext::new().with_post(move |event| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(event.kind);
                Ok(())
            }
        });

        users.insert(row(json!({"id": "u9", "name": "Nine"})), &ctx).await.unwrap();
        let updated = users
            .update(row(json!({"id": "u9", "name": "Nein", "tags": ["x"]})), &ctx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["name"], json!("Nein"));
        users.remove(row(json!({"id": "u9"})), &ctx).await.unwrap();

        assert_eq!(
            *kinds.lock().unwrap(),
            vec![OperationKind::Create, OperationKind::Update, OperationKind::Delete]
        );
    }

    #[tokio::test]
    async fn test_duplicate_insert_goes_to_error_hook() {
        let users = users(seeded());
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        let ctx = WriteContext::new().with_error(move |_| *counter.lock().unwrap() += 1);

        let out = users.insert(row(json!({"id": "u1"})), &ctx).await.unwrap();
        assert!(out.is_none());
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_batch_put_upserts_and_counters() {
        let store = seeded();
        let users = users(Arc::clone(&store));

        let touched = users
            .batch_put(
                vec![row(json!({"id": "u1", "name": "One"})), row(json!({"id": "u7", "name": "Seven"}))],
                &WriteContext::new(),
            )
            .await
            .unwrap();
        assert_eq!(touched, Some(2));
        assert_eq!(store.documents("t_users").len(), 6);

        let key = row(json!({"id": "u7"}));
        assert_eq!(users.increment(&key, "visits", 3).await.unwrap(), Some(json!(3)));
        assert_eq!(users.decrement(&key, "visits", 1).await.unwrap(), Some(json!(2)));
        assert_eq!(users.increment_map(&key, "counts", "likes", 1).await.unwrap(), Some(json!(1)));

        users
            .batch_remove(vec![row(json!({"id": "u1"})), key], &WriteContext::new())
            .await
            .unwrap();
        assert_eq!(store.documents("t_users").len(), 4);
    }
}
