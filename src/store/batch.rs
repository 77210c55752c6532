//! Chunked batch writes
//!
//! Requests are submitted in fixed-size chunks. Whatever the backend reports
//! as unprocessed is re-submitted after a capped exponential delay until the
//! chunk drains or the retry policy runs out, at which point the leftovers
//! (plus every chunk not yet submitted) are surfaced to the caller.

use std::collections::VecDeque;
use std::future::Future;

use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use super::retry::RetryPolicy;
use super::Row;

/// One item of a batch write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WriteRequest {
    #[serde(rename = "PutRequest")]
    Put {
        #[serde(rename = "Item")]
        item: Row,
    },
    #[serde(rename = "DeleteRequest")]
    Delete {
        #[serde(rename = "Key")]
        key: Row,
    },
}

impl WriteRequest {
    /// Attributes carried by the request (item or key)
    pub fn attributes(&self) -> &Row {
        match self {
            WriteRequest::Put { item } => item,
            WriteRequest::Delete { key } => key,
        }
    }
}

/// Outcome of a fully drained batch write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Requests written
    pub items: usize,
    /// Backend submissions, retries included
    pub submissions: u32,
}

/// Split requests into chunks and submit each until drained.
///
/// `submit` returns the requests the backend left unprocessed.
pub async fn drive_batch_write<F, Fut>(
    requests: Vec<WriteRequest>,
    chunk_size: usize,
    policy: &RetryPolicy,
    mut submit: F,
) -> StoreResult<BatchSummary>
where
    F: FnMut(Vec<WriteRequest>) -> Fut,
    Fut: Future<Output = StoreResult<Vec<WriteRequest>>>,
{
    let items = requests.len();
    let mut chunks = split_chunks(requests, chunk_size);
    let max_attempts = policy.max_attempts.max(1);
    let mut submissions = 0;

    while let Some(chunk) = chunks.pop_front() {
        let mut pending = chunk;
        let mut attempt = 1;

        loop {
            submissions += 1;
            let unprocessed = submit(pending).await?;
            if unprocessed.is_empty() {
                break;
            }

            if attempt >= max_attempts {
                let mut leftovers = unprocessed;
                leftovers.extend(chunks.into_iter().flatten());
                tracing::error!(
                    attempts = attempt,
                    remaining = leftovers.len(),
                    "batch write gave up with unprocessed items"
                );
                return Err(StoreError::UnprocessedItems {
                    attempts: attempt,
                    items: leftovers,
                });
            }

            let delay = policy.delay(attempt - 1);
            tracing::warn!(
                attempt,
                unprocessed = unprocessed.len(),
                delay_ms = delay.as_millis() as u64,
                "re-submitting unprocessed batch items"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            attempt += 1;
            pending = unprocessed;
        }
    }

    Ok(BatchSummary { items, submissions })
}

/// Split into chunks of at most `chunk_size` (minimum 1), preserving order
pub fn split_chunks<T>(items: Vec<T>, chunk_size: usize) -> VecDeque<Vec<T>> {
    let size = chunk_size.max(1);
    let mut chunks = VecDeque::new();
    let mut current = Vec::with_capacity(size);

    for item in items {
        current.push(item);
        if current.len() == size {
            chunks.push_back(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        chunks.push_back(current);
    }

    chunks
}
