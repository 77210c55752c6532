//! Document store backend trait

use futures_util::future::BoxFuture;

use super::query::DocumentQuery;
use super::update::DocumentUpdate;
use crate::store::{Row, StoreResult};

/// Skip/limit window of a paged find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub skip: usize,
    pub limit: usize,
}

impl PageWindow {
    /// Window of 1-based page `page` with `per_page` documents
    pub fn page(page: u64, per_page: usize) -> Self {
        Self {
            skip: (page.saturating_sub(1) as usize).saturating_mul(per_page),
            limit: per_page,
        }
    }
}

/// One operation of a bulk write
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOp {
    Update(DocumentUpdate),
    Delete(Row),
}

/// Document store round-trips
pub trait DocumentBackend: Send + Sync {
    /// Matching documents in query order, optionally windowed
    fn find<'a>(
        &'a self,
        collection: &'a str,
        query: &'a DocumentQuery,
        window: Option<PageWindow>,
    ) -> BoxFuture<'a, StoreResult<Vec<Row>>>;

    /// Number of matching documents
    fn count<'a>(&'a self, collection: &'a str, query: &'a DocumentQuery) -> BoxFuture<'a, StoreResult<usize>>;

    /// First document matching an equality filter
    fn find_one<'a>(&'a self, collection: &'a str, filter: &'a Row) -> BoxFuture<'a, StoreResult<Option<Row>>>;

    /// Insert a new document; a duplicate unique key is an error
    fn insert_one<'a>(&'a self, collection: &'a str, document: Row) -> BoxFuture<'a, StoreResult<Row>>;

    /// Apply an update; returns the document after the update, `None` when
    /// nothing matched and the update does not upsert
    fn update_one<'a>(
        &'a self,
        collection: &'a str,
        update: &'a DocumentUpdate,
    ) -> BoxFuture<'a, StoreResult<Option<Row>>>;

    /// Delete the first match, returning it
    fn delete_one<'a>(&'a self, collection: &'a str, filter: &'a Row) -> BoxFuture<'a, StoreResult<Option<Row>>>;

    /// Apply operations in order; returns how many touched a document
    fn bulk_write<'a>(&'a self, collection: &'a str, ops: Vec<BulkOp>) -> BoxFuture<'a, StoreResult<usize>>;
}
