//! Segmented parallel scan pagination
//!
//! All segments run concurrently, each continuing sequentially with its own
//! cursor. A shared atomic counter holds the number of rows fetched across
//! segments; a segment reads it before every fetch, its first included, and
//! issues no further request once the total has reached the limit. Rows already fetched are kept until the central merge,
//! which truncates to exactly `limit` rows in segment order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future::try_join_all;

use super::cursor::{KvCursor, SegmentCursor};
use super::page::{PageFetcher, PageRequest, Segment, SegmentedPage, Termination};
use crate::store::{Row, StoreError, StoreResult};

/// What one segment fetched and where it stands
#[derive(Debug)]
struct SegmentRun {
    started_from: SegmentCursor,
    items: Vec<Row>,
    next: SegmentCursor,
}

/// Scan `total_segments` partitions until `limit` rows are gathered.
///
/// `start` supplies one cursor per segment when resuming; exhausted
/// segments are skipped and stay exhausted.
pub async fn search_pagination<F>(
    fetcher: &F,
    start: Option<&[SegmentCursor]>,
    total_segments: u32,
    limit: usize,
    cursor_keys: &[String],
) -> StoreResult<SegmentedPage>
where
    F: PageFetcher + ?Sized,
{
    if limit == 0 {
        return Err(StoreError::InvalidLimit(limit));
    }
    let starts = segment_starts(start, total_segments)?;

    let budget = Arc::new(AtomicUsize::new(0));
    let runs = try_join_all(starts.into_iter().enumerate().map(|(index, from)| {
        let segment = Segment {
            index: index as u32,
            total: total_segments,
        };
        run_segment(fetcher, segment, from, limit, Arc::clone(&budget))
    }))
    .await?;

    tracing::debug!(
        segments = total_segments,
        fetched = budget.load(Ordering::SeqCst),
        limit,
        "segmented scan finished"
    );

    Ok(merge_runs(runs, limit, cursor_keys))
}

/// Scan every segment to exhaustion
pub async fn search_all<F>(fetcher: &F, total_segments: u32) -> StoreResult<Vec<Row>>
where
    F: PageFetcher + ?Sized,
{
    let starts = segment_starts(None, total_segments)?;
    let runs = try_join_all(starts.into_iter().enumerate().map(|(index, _)| {
        let segment = Segment {
            index: index as u32,
            total: total_segments,
        };
        drain_segment(fetcher, segment)
    }))
    .await?;

    Ok(runs.into_iter().flatten().collect())
}

fn segment_starts(start: Option<&[SegmentCursor]>, total_segments: u32) -> StoreResult<Vec<SegmentCursor>> {
    if total_segments == 0 {
        return Err(StoreError::invalid_config("total_segments must be positive"));
    }

    match start {
        None => Ok(vec![SegmentCursor::Start; total_segments as usize]),
        Some(cursors) if cursors.len() == total_segments as usize => Ok(cursors.to_vec()),
        Some(cursors) => Err(StoreError::InvalidCursor(format!(
            "expected {} segment cursors, got {}",
            total_segments,
            cursors.len()
        ))),
    }
}

async fn run_segment<F>(
    fetcher: &F,
    segment: Segment,
    started_from: SegmentCursor,
    limit: usize,
    budget: Arc<AtomicUsize>,
) -> StoreResult<SegmentRun>
where
    F: PageFetcher + ?Sized,
{
    let mut cursor = match &started_from {
        SegmentCursor::Exhausted => {
            return Ok(SegmentRun {
                started_from,
                items: Vec::new(),
                next: SegmentCursor::Exhausted,
            })
        }
        SegmentCursor::Start => None,
        SegmentCursor::Resume(key) => Some(key.clone()),
    };
    let mut items = Vec::new();

    loop {
        // Other segments may have spent the budget while this one waited.
        if budget.load(Ordering::SeqCst) >= limit {
            let next = match cursor {
                Some(key) => SegmentCursor::Resume(key),
                None => started_from.clone(),
            };
            tracing::debug!(segment = segment.index, fetched = items.len(), "limit reached before fetch");
            return Ok(SegmentRun {
                started_from,
                items,
                next,
            });
        }

        let page = fetcher
            .fetch_page(PageRequest {
                segment: Some(segment),
                cursor: cursor.take(),
            })
            .await?;
        let fetched = page.items.len();
        let total = budget.fetch_add(fetched, Ordering::SeqCst) + fetched;
        items.extend(page.items);

        tracing::debug!(segment = segment.index, fetched, total, "fetched scan page");

        match page.next_cursor {
            None => {
                return Ok(SegmentRun {
                    started_from,
                    items,
                    next: SegmentCursor::Exhausted,
                })
            }
            Some(next) => cursor = Some(next),
        }
    }
}

async fn drain_segment<F>(fetcher: &F, segment: Segment) -> StoreResult<Vec<Row>>
where
    F: PageFetcher + ?Sized,
{
    let mut items = Vec::new();
    let mut cursor = None;

    loop {
        let page = fetcher
            .fetch_page(PageRequest {
                segment: Some(segment),
                cursor: cursor.take(),
            })
            .await?;
        items.extend(page.items);

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(items),
        }
    }
}

/// Concatenate runs in segment order and cut at `limit`.
///
/// The segment that crosses the limit resumes after its last kept row. A
/// segment cut entirely resumes from where it started.
fn merge_runs(runs: Vec<SegmentRun>, limit: usize, cursor_keys: &[String]) -> SegmentedPage {
    let mut items = Vec::with_capacity(limit);
    let mut cursors = Vec::with_capacity(runs.len());
    let mut truncated = false;

    for run in runs {
        if truncated {
            cursors.push(run.started_from);
            continue;
        }

        let room = limit - items.len();
        if run.items.len() > room {
            let mut kept = run.items;
            kept.truncate(room);
            let cursor = match kept.last() {
                Some(last) => SegmentCursor::Resume(KvCursor::from_row(last, cursor_keys)),
                None => run.started_from,
            };
            items.extend(kept);
            cursors.push(cursor);
            truncated = true;
            continue;
        }

        items.extend(run.items);
        cursors.push(run.next);
    }

    let termination = if cursors.iter().all(SegmentCursor::is_exhausted) {
        Termination::Done
    } else {
        Termination::LimitReached
    };

    SegmentedPage {
        items,
        cursors,
        termination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::testing::ListFetcher;

    fn keys() -> Vec<String> {
        vec!["id".to_string()]
    }

    fn ids(rows: &[Row]) -> Vec<u64> {
        rows.iter().map(|r| r["id"].as_u64().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_single_segment_matches_sequential_shape() {
        let fetcher = ListFetcher::new(12, 5);
        let page = search_pagination(&fetcher, None, 1, 7, &keys()).await.unwrap();

        assert_eq!(ids(&page.items), (0..7).collect::<Vec<_>>());
        assert_eq!(page.cursors, vec![SegmentCursor::Resume(KvCursor::new().with("id", 6))]);
        assert_eq!(page.termination, Termination::LimitReached);
    }

    #[tokio::test]
    async fn test_all_segments_exhausted_is_done() {
        let fetcher = ListFetcher::new(9, 10);
        let page = search_pagination(&fetcher, None, 3, 100, &keys()).await.unwrap();

        assert_eq!(page.items.len(), 9);
        assert!(page.is_done());
        assert!(page.cursors.iter().all(SegmentCursor::is_exhausted));
    }

    #[tokio::test]
    async fn test_exhausted_segments_are_skipped_on_resume() {
        let fetcher = ListFetcher::new(9, 10);
        let start = vec![
            SegmentCursor::Exhausted,
            SegmentCursor::Start,
            SegmentCursor::Exhausted,
        ];
        let page = search_pagination(&fetcher, Some(&start), 3, 100, &keys())
            .await
            .unwrap();

        assert_eq!(ids(&page.items), vec![1, 4, 7]);
        assert_eq!(fetcher.fetches(), 1);
        assert_eq!(page.cursors[0], SegmentCursor::Exhausted);
    }

    #[tokio::test]
    async fn test_fully_cut_segment_resumes_from_its_start() {
        let fetcher = ListFetcher::new(40, 10);
        let page = search_pagination(&fetcher, None, 2, 10, &keys()).await.unwrap();

        assert_eq!(page.items.len(), 10);
        assert_eq!(page.cursors[1], SegmentCursor::Start);

        // resuming never skips a row
        let mut seen = ids(&page.items);
        let mut cursors = page.cursors;
        while !cursors.iter().all(SegmentCursor::is_exhausted) {
            let next = search_pagination(&fetcher, Some(&cursors), 2, 10, &keys())
                .await
                .unwrap();
            seen.extend(ids(&next.items));
            cursors = next.cursors;
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..40).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_spent_budget_stops_segments_before_their_first_fetch() {
        let fetcher = ListFetcher::new(400, 20);
        let page = search_pagination(&fetcher, None, 4, 50, &keys()).await.unwrap();

        // segment 0 resolves three pages before the others are polled
        assert_eq!(fetcher.fetches(), 3);
        assert_eq!(page.items.len(), 50);
        assert_eq!(
            page.cursors,
            vec![
                SegmentCursor::Resume(KvCursor::new().with("id", 196)),
                SegmentCursor::Start,
                SegmentCursor::Start,
                SegmentCursor::Start,
            ]
        );
        assert_eq!(page.termination, Termination::LimitReached);
    }

    #[tokio::test]
    async fn test_cursor_count_must_match_segments() {
        let fetcher = ListFetcher::new(5, 10);
        let err = search_pagination(&fetcher, Some(&[SegmentCursor::Start]), 2, 10, &keys())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "STORE_INVALID_CURSOR");
    }

    #[tokio::test]
    async fn test_search_all_concatenates_in_segment_order() {
        let fetcher = ListFetcher::new(6, 1);
        let rows = search_all(&fetcher, 2).await.unwrap();
        assert_eq!(ids(&rows), vec![0, 2, 4, 1, 3, 5]);
    }
}
