//! Narrowing-lookup pagination
//!
//! Pages are fetched strictly in sequence: each request carries the cursor
//! returned by the previous one.

use super::cursor::KvCursor;
use super::page::{PageFetcher, PageRequest, PageResult, Termination};
use crate::store::{Row, StoreError, StoreResult};

/// Fetch pages until exhausted or until at least `limit` rows are held.
///
/// Overshoot is truncated to exactly `limit` rows and the cursor is rebuilt
/// from `cursor_keys` of the last row kept, so resuming continues right
/// after the last row returned.
pub async fn query_pagination<F>(
    fetcher: &F,
    start: Option<KvCursor>,
    limit: usize,
    cursor_keys: &[String],
) -> StoreResult<PageResult>
where
    F: PageFetcher + ?Sized,
{
    if limit == 0 {
        return Err(StoreError::InvalidLimit(limit));
    }

    let mut items: Vec<Row> = Vec::new();
    let mut cursor = start;
    let mut pages = 0;

    loop {
        let page = fetcher
            .fetch_page(PageRequest {
                segment: None,
                cursor: cursor.take(),
            })
            .await?;
        pages += 1;
        items.extend(page.items);
        cursor = page.next_cursor;

        tracing::debug!(page = pages, total = items.len(), limit, "fetched query page");

        if cursor.is_none() || items.len() >= limit {
            break;
        }
    }

    if items.len() > limit {
        items.truncate(limit);
        let last_key = items.last().map(|row| KvCursor::from_row(row, cursor_keys));
        return Ok(PageResult {
            items,
            last_key,
            termination: Termination::LimitReached,
        });
    }

    let termination = if cursor.is_some() {
        Termination::LimitReached
    } else {
        Termination::Done
    };

    Ok(PageResult {
        items,
        last_key: cursor,
        termination,
    })
}

/// Fetch every page and concatenate the rows
pub async fn query_all<F>(fetcher: &F) -> StoreResult<Vec<Row>>
where
    F: PageFetcher + ?Sized,
{
    let mut items = Vec::new();
    let mut cursor = None;

    loop {
        let page = fetcher
            .fetch_page(PageRequest {
                segment: None,
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

/// Walk every page, counting rows without keeping them
pub async fn total_count<F>(fetcher: &F) -> StoreResult<usize>
where
    F: PageFetcher + ?Sized,
{
    let mut total = 0;
    let mut cursor = None;

    loop {
        let page = fetcher
            .fetch_page(PageRequest {
                segment: None,
                cursor: cursor.take(),
            })
            .await?;
        total += page.count();

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(total),
        }
    }
}
