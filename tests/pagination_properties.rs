//! Pagination Properties
//!
//! Tests for the pagination engine over both lookup shapes:
//! - Resuming from a returned cursor continues right after the last row
//! - Segmented scans stop fetching once the shared total reaches the limit
//! - Exhausted segments stay exhausted across resumes

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use polyquery::pagination::{self, Page, PageFetcher, PageRequest};
use polyquery::{
    CompileOptions, FieldDescriptor, KvCursor, KvEntity, MemoryKvStore, Predicate, QueryConfig, Row, Schema,
    SegmentCursor, SortSpec, StoreResult, Termination,
};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}

fn events_schema() -> Schema {
    Schema::new("events")
        .with_field("id", FieldDescriptor::string().hash_key())
        .with_field("ts", FieldDescriptor::number().range_key())
        .with_field("status", FieldDescriptor::string().local_index())
}

fn seeded_entity(count: i64, config: QueryConfig) -> KvEntity {
    let store = MemoryKvStore::new().with_table("events", &["id", "ts"]);
    store
        .seed(
            "events",
            (0..count).map(|n| row(json!({"id": "a", "ts": n, "status": format!("s{:02}", (n * 7) % count)}))),
        )
        .unwrap();
    KvEntity::new(events_schema(), Arc::new(store), config).unwrap()
}

/// Serves `per_segment` rows per segment in pages of `page_size`. Records
/// the segment and the number of rows served so far at the moment each
/// fetch is issued. A yielding fetcher hands control back to the scheduler
/// before each page; an immediate one resolves on first poll.
struct SegmentFetcher {
    per_segment: u64,
    page_size: usize,
    yields: bool,
    served: AtomicUsize,
    issued_at: Mutex<Vec<(u32, usize)>>,
}

impl SegmentFetcher {
    fn yielding(per_segment: u64, page_size: usize) -> Self {
        Self {
            per_segment,
            page_size,
            yields: true,
            served: AtomicUsize::new(0),
            issued_at: Mutex::new(Vec::new()),
        }
    }

    fn immediate(per_segment: u64, page_size: usize) -> Self {
        Self {
            yields: false,
            ..Self::yielding(per_segment, page_size)
        }
    }

    fn issued(&self) -> Vec<(u32, usize)> {
        self.issued_at.lock().unwrap().clone()
    }
}

impl PageFetcher for SegmentFetcher {
    fn fetch_page(&self, request: PageRequest) -> BoxFuture<'_, StoreResult<Page>> {
        let segment = request.segment.unwrap();
        self.issued_at
            .lock()
            .unwrap()
            .push((segment.index, self.served.load(Ordering::SeqCst)));

        Box::pin(async move {
            if self.yields {
                tokio::task::yield_now().await;
            }

            let ids: Vec<u64> = (0..self.per_segment)
                .map(|n| n * segment.total as u64 + segment.index as u64)
                .collect();
            let start = match &request.cursor {
                None => 0,
                Some(cursor) => {
                    let after = cursor.get("id").and_then(Value::as_u64).unwrap();
                    ids.iter().position(|id| *id == after).unwrap() + 1
                }
            };
            let end = (start + self.page_size).min(ids.len());
            let items: Vec<Row> = ids[start..end].iter().map(|id| row(json!({"id": id}))).collect();
            let next = (end < ids.len())
                .then(|| KvCursor::from_row(items.last().unwrap(), &["id".to_string()]));

            self.served.fetch_add(items.len(), Ordering::SeqCst);
            Ok(Page::new(items, next))
        })
    }
}

fn ids(rows: &[Row]) -> Vec<u64> {
    rows.iter().map(|r| r["id"].as_u64().unwrap()).collect()
}

// =============================================================================
// Cursor Round-Trip
// =============================================================================

/// Walking a local-index query page by page reproduces the full result.
#[tokio::test]
async fn test_cursor_round_trip_on_local_index() {
    let events = seeded_entity(11, QueryConfig::default().with_page_size(3));
    let predicate = Predicate::new().eq("id", "a");
    let options = CompileOptions::query().with_sort(Some(SortSpec::desc("status")));

    let all = events.query_all(&predicate, options.clone(), None).await.unwrap();
    assert_eq!(all.len(), 11);

    let mut collected = Vec::new();
    let mut cursor = None;
    for _ in 0..20 {
        let page = events
            .query_pagination(&predicate, options.clone(), None, cursor.take(), 4)
            .await
            .unwrap();
        assert!(page.items.len() <= 4);
        collected.extend(page.items);

        match (page.termination, page.last_key) {
            (Termination::LimitReached, Some(key)) => cursor = Some(key),
            _ => break,
        }
    }

    assert_eq!(collected, all);
}

/// The cursor for a truncated page holds the sort field alongside the keys.
#[tokio::test]
async fn test_truncated_cursor_carries_sort_field() {
    let events = seeded_entity(6, QueryConfig::default().with_page_size(4));
    let options = CompileOptions::query().with_sort(Some(SortSpec::asc("status")));

    let page = events
        .query_pagination(&Predicate::new().eq("id", "a"), options, None, None, 2)
        .await
        .unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.termination, Termination::LimitReached);
    let last = page.items.last().unwrap();
    let cursor = page.last_key.unwrap();
    assert_eq!(cursor.get("status"), last.get("status"));
    assert_eq!(cursor.get("ts"), last.get("ts"));
}

// =============================================================================
// Segmented Early Stop
// =============================================================================

/// Four segments, limit 50, pages of 20: exactly 50 rows come back and no
/// fetch is issued once 50 rows have been served.
#[tokio::test]
async fn test_segmented_scan_stops_at_limit() {
    let fetcher = SegmentFetcher::yielding(100, 20);
    let keys = vec!["id".to_string()];

    let page = pagination::search_pagination(&fetcher, None, 4, 50, &keys).await.unwrap();

    assert_eq!(page.items.len(), 50);
    assert_eq!(page.cursors.len(), 4);
    assert_eq!(page.termination, Termination::LimitReached);
    assert!(page.cursors.iter().all(|c| !c.is_exhausted()));

    let issued = fetcher.issued();
    assert!(issued.iter().all(|(_, served)| *served < 50), "issued at: {issued:?}");

    // Rows from each segment keep their segment order
    for segment in 0..4u64 {
        let from_segment: Vec<u64> = ids(&page.items).into_iter().filter(|id| id % 4 == segment).collect();
        assert!(from_segment.windows(2).all(|w| w[0] < w[1]));
    }
}

/// A backend that resolves without yielding lets one segment spend the
/// whole budget; the remaining segments then issue no fetch at all.
#[tokio::test]
async fn test_immediate_backend_stops_other_segments() {
    let fetcher = SegmentFetcher::immediate(100, 20);
    let keys = vec!["id".to_string()];

    let page = pagination::search_pagination(&fetcher, None, 4, 50, &keys).await.unwrap();

    assert_eq!(page.items.len(), 50);
    assert_eq!(page.termination, Termination::LimitReached);
    assert_eq!(fetcher.issued(), vec![(0, 0), (0, 20), (0, 40)]);
    assert_eq!(&page.cursors[1..], &[SegmentCursor::Start, SegmentCursor::Start, SegmentCursor::Start]);
}

/// Resuming from the returned cursors yields the remaining rows with no
/// duplicates and no gaps, whether or not the backend yields.
#[tokio::test]
async fn test_segmented_resume_covers_everything_once() {
    let keys = vec!["id".to_string()];

    for fetcher in [SegmentFetcher::yielding(100, 20), SegmentFetcher::immediate(100, 20)] {
        let mut seen = BTreeSet::new();
        let mut cursors: Option<Vec<SegmentCursor>> = None;
        for _ in 0..20 {
            let page = pagination::search_pagination(&fetcher, cursors.as_deref(), 4, 50, &keys)
                .await
                .unwrap();
            for id in ids(&page.items) {
                assert!(seen.insert(id), "duplicate id {id}");
            }
            if page.is_done() {
                break;
            }
            cursors = Some(page.cursors);
        }
        assert_eq!(seen, (0..400).collect::<BTreeSet<u64>>());
    }
}

/// Resuming an entity scan in small steps visits every row once; segments
/// that finish report exhausted and are never fetched again.
#[tokio::test]
async fn test_entity_scan_resume_with_exhausted_segments() {
    let config = QueryConfig::default().with_total_segments(3).with_page_size(2);
    let events = seeded_entity(10, config);
    let predicate = Predicate::new();

    let mut seen = BTreeSet::new();
    let mut cursors: Option<Vec<SegmentCursor>> = None;
    for _ in 0..20 {
        let page = events
            .search_pagination(&predicate, CompileOptions::scan(), None, cursors.as_deref(), 3)
            .await
            .unwrap();
        assert!(page.items.len() <= 3);
        for item in &page.items {
            assert!(seen.insert(item["ts"].as_i64().unwrap()), "row returned twice: {item:?}");
        }

        if let Some(previous) = &cursors {
            for (before, after) in previous.iter().zip(&page.cursors) {
                if before.is_exhausted() {
                    assert!(after.is_exhausted());
                }
            }
        }

        if page.is_done() {
            break;
        }
        cursors = Some(page.cursors);
    }

    assert_eq!(seen, (0..10).collect::<BTreeSet<i64>>());
}

/// A resume with the wrong number of cursors is rejected.
#[tokio::test]
async fn test_resume_with_wrong_cursor_count_fails() {
    let config = QueryConfig::default().with_total_segments(3);
    let events = seeded_entity(4, config);

    let err = events
        .search_pagination(
            &Predicate::new(),
            CompileOptions::scan(),
            None,
            Some(&[SegmentCursor::Start][..]),
            5,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "STORE_INVALID_CURSOR");
}
