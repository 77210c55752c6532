//! Compilation options shared by both backends

use serde::{Deserialize, Serialize};

use super::ast::{Comparison, MatchMode, SortSpec};

/// Retrieval shape the predicate is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupKind {
    /// Narrowing lookup over a key/index range
    Query,
    /// Unconstrained scan with post-filtering
    Scan,
}

/// Options controlling how a predicate is compiled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Join for per-field conditions on one side
    pub comparison: Comparison,
    /// String matching mode
    pub match_mode: MatchMode,
    /// Index to sort/narrow by
    pub sort: Option<SortSpec>,
    /// Query or scan
    pub lookup: LookupKind,
    /// Reject unsupported predicate fields instead of skipping them
    pub strict: bool,
    /// Page-size hint passed to the backend
    pub page_size: Option<u32>,
}

impl CompileOptions {
    /// Options for a narrowing lookup
    pub fn query() -> Self {
        Self {
            comparison: Comparison::And,
            match_mode: MatchMode::Eq,
            sort: None,
            lookup: LookupKind::Query,
            strict: false,
            page_size: None,
        }
    }

    /// Options for an unconstrained scan
    pub fn scan() -> Self {
        Self {
            lookup: LookupKind::Scan,
            ..Self::query()
        }
    }

    pub fn with_comparison(mut self, comparison: Comparison) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    pub fn with_sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    /// True for narrowing lookups
    pub fn is_narrowing(&self) -> bool {
        self.lookup == LookupKind::Query
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::query()
    }
}
