//! Key-value store backend trait
//!
//! The thin SDK surface the entity API drives. Each method is one backend
//! round-trip.

use futures_util::future::BoxFuture;

use super::filter::KvFilter;
use super::requests::{BatchGetRequest, DeleteRequest, GetRequest};
use super::update::UpdateStatement;
use crate::pagination::Page;
use crate::store::{Row, StoreResult, WriteRequest};

/// Key-value store round-trips
pub trait KvBackend: Send + Sync {
    /// One page of a narrowing lookup
    fn query<'a>(&'a self, filter: &'a KvFilter) -> BoxFuture<'a, StoreResult<Page>>;

    /// One page of a (possibly segmented) scan
    fn scan<'a>(&'a self, filter: &'a KvFilter) -> BoxFuture<'a, StoreResult<Page>>;

    /// Read one row; `None` when absent
    fn get_item<'a>(&'a self, request: &'a GetRequest) -> BoxFuture<'a, StoreResult<Option<Row>>>;

    /// Read many rows; absent keys are omitted
    fn batch_get<'a>(&'a self, request: &'a BatchGetRequest) -> BoxFuture<'a, StoreResult<Vec<Row>>>;

    /// Apply an update, creating the row if needed. Returns the attributes
    /// selected by the statement's `ReturnValues`.
    fn update_item<'a>(&'a self, statement: &'a UpdateStatement) -> BoxFuture<'a, StoreResult<Row>>;

    /// Delete one row, returning it if it existed
    fn delete_item<'a>(&'a self, request: &'a DeleteRequest) -> BoxFuture<'a, StoreResult<Option<Row>>>;

    /// Submit one chunk; returns the requests left unprocessed
    fn batch_write<'a>(
        &'a self,
        table: &'a str,
        requests: Vec<WriteRequest>,
    ) -> BoxFuture<'a, StoreResult<Vec<WriteRequest>>>;
}
