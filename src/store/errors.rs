//! Store errors
//!
//! Everything an entity operation can fail with. Compilation and schema
//! errors are wrapped so callers propagate with `?`.

use thiserror::Error;

use super::batch::WriteRequest;
use crate::predicate::CompileError;
use crate::schema::SchemaError;

/// Result type for entity and backend operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Predicate or change-set compilation failed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Schema registration failed
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Transport or backend-side failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Batch write gave up with items still unprocessed
    #[error("{} batch items still unprocessed after {attempts} attempts", items.len())]
    UnprocessedItems {
        attempts: u32,
        items: Vec<WriteRequest>,
    },

    /// Pagination limit must be positive
    #[error("Invalid pagination limit: {0}")]
    InvalidLimit(usize),

    /// Supplied cursor does not fit the retrieval
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pre or post hook failed
    #[error("Hook failed: {0}")]
    Hook(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn hook(msg: impl Into<String>) -> Self {
        Self::Hook(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Compile(e) => e.code(),
            Self::Schema(e) => e.code(),
            Self::Backend(_) => "STORE_BACKEND",
            Self::UnprocessedItems { .. } => "STORE_UNPROCESSED_ITEMS",
            Self::InvalidLimit(_) => "STORE_INVALID_LIMIT",
            Self::InvalidCursor(_) => "STORE_INVALID_CURSOR",
            Self::InvalidConfig(_) => "STORE_INVALID_CONFIG",
            Self::Hook(_) => "STORE_HOOK",
        }
    }

    /// Configuration errors fail fast and are never retried
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Compile(e) => e.is_configuration(),
            Self::Schema(e) => e.is_configuration(),
            Self::InvalidConfig(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_wrapped_errors_keep_codes() {
        let err: StoreError = CompileError::UnknownIndex("x".into()).into();
        assert_eq!(err.code(), "COMPILE_UNKNOWN_INDEX");
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Unknown sort index 'x'");
    }

    #[test]
    fn test_unprocessed_display() {
        let err = StoreError::UnprocessedItems {
            attempts: 8,
            items: vec![WriteRequest::Put { item: Map::new() }],
        };
        assert_eq!(err.code(), "STORE_UNPROCESSED_ITEMS");
        assert_eq!(err.to_string(), "1 batch items still unprocessed after 8 attempts");
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_backend_not_configuration() {
        assert!(!StoreError::backend("throttled").is_configuration());
        assert!(StoreError::invalid_config("page_size").is_configuration());
    }
}
