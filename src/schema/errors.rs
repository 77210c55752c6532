//! Schema error types
//!
//! Every schema error is a configuration error: it is raised once, when an
//! entity type is registered, and never degrades into a weaker query.

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema registration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two fields flagged as hash key
    #[error("Schema '{schema}' declares more than one hash key: '{first}' and '{second}'")]
    DuplicateHashKey {
        schema: String,
        first: String,
        second: String,
    },

    /// Two fields flagged as range key
    #[error("Schema '{schema}' declares more than one range key: '{first}' and '{second}'")]
    DuplicateRangeKey {
        schema: String,
        first: String,
        second: String,
    },

    /// A field is both hash and range key
    #[error("Field '{field}' cannot be both hash key and range key")]
    HashAndRangeKey { field: String },

    /// Global index names a hash key that is not a declared field
    #[error("Global index on '{field}' references undeclared hash key '{hash_key}'")]
    UnknownIndexHashKey { field: String, hash_key: String },

    /// Field name is empty
    #[error("Schema '{0}' contains an empty field name")]
    EmptyFieldName(String),

    /// Same field name declared twice
    #[error("Field '{0}' is declared more than once")]
    DuplicateField(String),

    /// Schema document could not be parsed
    #[error("Malformed schema '{name}': {reason}")]
    Malformed { name: String, reason: String },
}

impl SchemaError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::DuplicateHashKey { .. } => "SCHEMA_DUPLICATE_HASH_KEY",
            SchemaError::DuplicateRangeKey { .. } => "SCHEMA_DUPLICATE_RANGE_KEY",
            SchemaError::HashAndRangeKey { .. } => "SCHEMA_HASH_AND_RANGE_KEY",
            SchemaError::UnknownIndexHashKey { .. } => "SCHEMA_UNKNOWN_INDEX_HASH_KEY",
            SchemaError::EmptyFieldName(_) => "SCHEMA_EMPTY_FIELD_NAME",
            SchemaError::DuplicateField(_) => "SCHEMA_DUPLICATE_FIELD",
            SchemaError::Malformed { .. } => "SCHEMA_MALFORMED",
        }
    }

    /// Schema errors are always configuration errors
    pub fn is_configuration(&self) -> bool {
        true
    }

    pub(crate) fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::Malformed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
