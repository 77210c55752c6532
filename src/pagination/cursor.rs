//! Continuation cursors
//!
//! A key-value cursor is the key tuple of the row to resume after. Parallel
//! scans carry one `SegmentCursor` per segment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Row;

/// Key tuple identifying the row after which a retrieval resumes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KvCursor(BTreeMap<String, Value>);

impl KvCursor {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Cursor built from the given key fields of a row. Fields the row
    /// lacks are left out.
    pub fn from_row(row: &Row, keys: &[String]) -> Self {
        let map = keys
            .iter()
            .filter_map(|k| row.get(k).map(|v| (k.clone(), v.clone())))
            .collect();
        Self(map)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every cursor field equals the row's value
    pub fn matches(&self, row: &Row) -> bool {
        !self.0.is_empty() && self.0.iter().all(|(k, v)| row.get(k) == Some(v))
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl From<BTreeMap<String, Value>> for KvCursor {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

/// Per-segment position of a parallel scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "key", rename_all = "lowercase")]
pub enum SegmentCursor {
    /// Segment has not been read yet
    Start,
    /// Resume after this key
    Resume(KvCursor),
    /// Segment finished; it is skipped on resume
    Exhausted,
}

impl SegmentCursor {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, SegmentCursor::Exhausted)
    }

    /// Exclusive start key to send, if any
    pub fn start_key(&self) -> Option<&KvCursor> {
        match self {
            SegmentCursor::Resume(key) => Some(key),
            _ => None,
        }
    }

    /// Cursor from a backend continuation token
    pub fn from_next(next: Option<KvCursor>) -> Self {
        next.map(SegmentCursor::Resume).unwrap_or(SegmentCursor::Exhausted)
    }
}
