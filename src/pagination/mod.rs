//! Pagination and aggregation engine
//!
//! Drives a `PageFetcher` with a fixed compiled filter:
//! - `query_pagination` / `query_all` / `total_count`: sequential pages
//!   of a narrowing lookup
//! - `search_pagination` / `search_all`: scans fanned out across parallel
//!   segments under one shared row budget
//!
//! Per call: START, FETCHING (repeat with the previous cursor), then DONE
//! (no cursor) or LIMIT_REACHED (cursor to resume from).

mod cursor;
mod page;
mod segmented;
mod sequential;

pub use cursor::{KvCursor, SegmentCursor};
pub use page::{Page, PageFetcher, PageRequest, PageResult, Segment, SegmentedPage, Termination};
pub use segmented::{search_all, search_pagination};
pub use sequential::{query_all, query_pagination, total_count};
