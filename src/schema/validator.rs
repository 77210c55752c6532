//! Registration-time schema validation
//!
//! Descriptors are checked once when an entity type is registered:
//! - at most one hash key and at most one range key
//! - no field is both hash and range key
//! - every global index hash key is a declared field
//!
//! A schema without a hash key is accepted here. Writes against it fail
//! later with a missing-primary-key error.

use super::errors::{SchemaError, SchemaResult};
use super::types::Schema;

/// Validates schema structure
pub struct SchemaValidator;

impl SchemaValidator {
    /// Validate a schema, returning the first violation found
    pub fn validate(schema: &Schema) -> SchemaResult<()> {
        let mut hash_key: Option<&str> = None;
        let mut range_key: Option<&str> = None;

        for (name, descriptor) in schema.fields() {
            if name.is_empty() {
                return Err(SchemaError::EmptyFieldName(schema.name().to_string()));
            }

            if descriptor.is_hash_key && descriptor.is_range_key {
                return Err(SchemaError::HashAndRangeKey {
                    field: name.to_string(),
                });
            }

            if descriptor.is_hash_key {
                if let Some(first) = hash_key {
                    return Err(SchemaError::DuplicateHashKey {
                        schema: schema.name().to_string(),
                        first: first.to_string(),
                        second: name.to_string(),
                    });
                }
                hash_key = Some(name);
            }

            if descriptor.is_range_key {
                if let Some(first) = range_key {
                    return Err(SchemaError::DuplicateRangeKey {
                        schema: schema.name().to_string(),
                        first: first.to_string(),
                        second: name.to_string(),
                    });
                }
                range_key = Some(name);
            }

            if let Some(index) = &descriptor.global_index {
                if schema.field(&index.hash_key).is_none() {
                    return Err(SchemaError::UnknownIndexHashKey {
                        field: name.to_string(),
                        hash_key: index.hash_key.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
