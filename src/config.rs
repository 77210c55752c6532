//! Query layer configuration
//!
//! Defaults for page sizes, scan fan-out, batch chunking and retry. Loaded
//! from JSON or built in code; every field has a default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::store::{RetryPolicy, StoreError, StoreResult};

/// Query layer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Prefix prepended to every entity's table/collection name (default: "")
    #[serde(default)]
    pub table_prefix: String,

    /// Page-size hint sent with each fetch (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Parallel scan segments (default: 1)
    #[serde(default = "default_total_segments")]
    pub total_segments: u32,

    /// Items per batch write submission (default: 25)
    #[serde(default = "default_batch_write_chunk")]
    pub batch_write_chunk: usize,

    /// Keys per batch get submission (default: 100)
    #[serde(default = "default_batch_get_chunk")]
    pub batch_get_chunk: usize,

    /// Reject unsupported predicate fields instead of skipping them
    #[serde(default)]
    pub strict_predicates: bool,

    /// Retry policy for unprocessed batch items
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_page_size() -> u32 {
    100
}

fn default_total_segments() -> u32 {
    1
}

fn default_batch_write_chunk() -> usize {
    25
}

fn default_batch_get_chunk() -> usize {
    100
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            table_prefix: String::new(),
            page_size: default_page_size(),
            total_segments: default_total_segments(),
            batch_write_chunk: default_batch_write_chunk(),
            batch_get_chunk: default_batch_get_chunk(),
            strict_predicates: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl QueryConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> StoreResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StoreError::invalid_config(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            StoreError::invalid_config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_total_segments(mut self, total_segments: u32) -> Self {
        self.total_segments = total_segments;
        self
    }

    pub fn with_batch_write_chunk(mut self, chunk: usize) -> Self {
        self.batch_write_chunk = chunk;
        self
    }

    pub fn with_strict_predicates(mut self, strict: bool) -> Self {
        self.strict_predicates = strict;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Physical table/collection name for an entity
    pub fn table_name(&self, entity: &str) -> String {
        format!("{}{}", self.table_prefix, entity)
    }

    /// Reject zero sizes
    pub fn validate(&self) -> StoreResult<()> {
        if self.page_size == 0 {
            return Err(StoreError::invalid_config("page_size must be positive"));
        }
        if self.total_segments == 0 {
            return Err(StoreError::invalid_config("total_segments must be positive"));
        }
        if self.batch_write_chunk == 0 {
            return Err(StoreError::invalid_config("batch_write_chunk must be positive"));
        }
        if self.batch_get_chunk == 0 {
            return Err(StoreError::invalid_config("batch_get_chunk must be positive"));
        }
        if self.retry.max_attempts == 0 {
            return Err(StoreError::invalid_config("retry.max_attempts must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QueryConfig::default();
        assert_eq!(config.page_size, 100);
        assert_eq!(config.total_segments, 1);
        assert_eq!(config.batch_write_chunk, 25);
        assert_eq!(config.batch_get_chunk, 100);
        assert!(!config.strict_predicates);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            QueryConfig::from_json_str(r#"{"table_prefix": "dev_", "retry": {"max_attempts": 2}}"#)
                .unwrap();
        assert_eq!(config.table_name("users"), "dev_users");
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.max_backoff_ms, 2000);
        assert_eq!(config.batch_write_chunk, 25);
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let err = QueryConfig::from_json_str(r#"{"total_segments": 0}"#).unwrap_err();
        assert_eq!(err.code(), "STORE_INVALID_CONFIG");
        assert!(QueryConfig::default().with_page_size(0).validate().is_err());
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = QueryConfig::from_json_str("{").unwrap_err();
        assert!(err.is_configuration());
    }
}
