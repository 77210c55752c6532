//! Predicate compilation errors
//!
//! Compilation errors are raised synchronously, before any backend call.

use thiserror::Error;

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors raised while compiling predicates or change-sets
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Sort references a global index whose hash key has no value
    #[error("No hash key value for global index '{index}' (hash key: '{hash_key}')")]
    MissingIndexHashKey { index: String, hash_key: String },

    /// Sort names an index the schema does not declare
    #[error("Unknown sort index '{0}'")]
    UnknownIndex(String),

    /// Predicate field could not be compiled (strict mode only)
    #[error("Unsupported predicate field '{field}': declared {declared}, got {actual}")]
    UnsupportedField {
        field: String,
        declared: &'static str,
        actual: &'static str,
    },

    /// Date bound is neither epoch milliseconds nor a parseable date
    #[error("Invalid date bound for '{field}': {value}")]
    InvalidDate { field: String, value: String },

    /// Entity has no hash key, so rows cannot be addressed
    #[error("Entity '{0}' declares no hash key")]
    MissingPrimaryKey(String),

    /// Change-set or key lacks a value for a required key field
    #[error("Missing value for key field '{0}'")]
    MissingKeyValue(String),
}

impl CompileError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::MissingIndexHashKey { .. } => "COMPILE_MISSING_INDEX_HASH_KEY",
            CompileError::UnknownIndex(_) => "COMPILE_UNKNOWN_INDEX",
            CompileError::UnsupportedField { .. } => "COMPILE_UNSUPPORTED_FIELD",
            CompileError::InvalidDate { .. } => "COMPILE_INVALID_DATE",
            CompileError::MissingPrimaryKey(_) => "COMPILE_MISSING_PRIMARY_KEY",
            CompileError::MissingKeyValue(_) => "COMPILE_MISSING_KEY_VALUE",
        }
    }

    /// Configuration errors come from schema/sort mismatches rather than
    /// from the caller's data
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CompileError::MissingIndexHashKey { .. }
                | CompileError::UnknownIndex(_)
                | CompileError::MissingPrimaryKey(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(CompileError::UnknownIndex("x".into()).is_configuration());
        assert!(CompileError::MissingPrimaryKey("users".into()).is_configuration());
        assert!(!CompileError::MissingKeyValue("id".into()).is_configuration());
    }

    #[test]
    fn test_codes_and_display() {
        let err = CompileError::MissingIndexHashKey {
            index: "createdAt_global".into(),
            hash_key: "owner".into(),
        };
        assert_eq!(err.code(), "COMPILE_MISSING_INDEX_HASH_KEY");
        assert!(err.to_string().contains("owner"));
    }
}
