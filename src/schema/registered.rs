//! Registered entity schema
//!
//! Pairs a validated schema with its derived key layout. Built once when an
//! entity type is registered and shared read-only by every operation.

use super::errors::SchemaResult;
use super::layout::KeyLayout;
use super::types::Schema;
use super::validator::SchemaValidator;

/// A validated schema and its key layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredSchema {
    schema: Schema,
    layout: KeyLayout,
}

impl RegisteredSchema {
    /// Validate the schema and derive its key layout
    pub fn register(schema: Schema) -> SchemaResult<Self> {
        SchemaValidator::validate(&schema)?;
        let layout = KeyLayout::from_schema(&schema);
        Ok(Self { schema, layout })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// Entity name
    pub fn name(&self) -> &str {
        self.schema.name()
    }
}
