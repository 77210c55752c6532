//! Store subsystem
//!
//! Backend-facing types shared by the key-value and document entities: the
//! row type, the store error, and the chunked batch write driver with
//! bounded retry.

mod batch;
mod errors;
mod retry;
pub(crate) mod values;

use serde_json::{Map, Value};

pub use batch::{drive_batch_write, split_chunks, BatchSummary, WriteRequest};
pub use errors::{StoreError, StoreResult};
pub use retry::RetryPolicy;

/// A stored row: attribute name to value
pub type Row = Map<String, Value>;
