//! Pages, fetch requests and accumulated results

use futures_util::future::BoxFuture;

use super::cursor::{KvCursor, SegmentCursor};
use crate::store::{Row, StoreResult};

/// One backend round-trip's worth of rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Row>,
    /// Continuation token; `None` once the retrieval is exhausted
    pub next_cursor: Option<KvCursor>,
}

impl Page {
    pub fn new(items: Vec<Row>, next_cursor: Option<KvCursor>) -> Self {
        Self { items, next_cursor }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }
}

/// Scan partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub index: u32,
    pub total: u32,
}

/// Parameters of a single page fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRequest {
    /// Scan partition, `None` for narrowing lookups
    pub segment: Option<Segment>,
    /// Exclusive start key
    pub cursor: Option<KvCursor>,
}

/// Fetch-page primitive driven by the pagination engine
pub trait PageFetcher: Send + Sync {
    /// Fetch one page with the fixed compiled filter
    fn fetch_page(&self, request: PageRequest) -> BoxFuture<'_, StoreResult<Page>>;
}

/// How a pagination call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Backend reported no further cursor
    Done,
    /// Stopped at the caller's limit; a cursor resumes the rest
    LimitReached,
}

/// Result of a narrowing-lookup pagination call
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub items: Vec<Row>,
    /// Resume point, `None` when done
    pub last_key: Option<KvCursor>,
    pub termination: Termination,
}

/// Result of a segmented scan pagination call
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedPage {
    /// Items in segment order, each segment's own order preserved
    pub items: Vec<Row>,
    /// One cursor per segment
    pub cursors: Vec<SegmentCursor>,
    pub termination: Termination,
}

impl SegmentedPage {
    pub fn is_done(&self) -> bool {
        self.termination == Termination::Done
    }
}
