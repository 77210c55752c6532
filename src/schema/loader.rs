//! Schema loader
//!
//! Builds a validated `Schema` from an already-parsed JSON description.
//! Two shapes are accepted:
//!
//! ```json
//! { "id": { "type": "String", "isHashKey": true }, "ts": { "type": "Number" } }
//! ```
//!
//! ```json
//! [ { "name": "id", "type": "String", "isHashKey": true }, { "name": "ts", "type": "Number" } ]
//! ```
//!
//! The array form preserves declaration order; the object form follows the
//! key order of the parsed map.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};
use super::types::{FieldDescriptor, Schema};
use super::validator::SchemaValidator;

#[derive(Deserialize)]
struct NamedField {
    name: String,
    #[serde(flatten)]
    descriptor: FieldDescriptor,
}

/// Loads schemas from JSON values
pub struct SchemaLoader;

impl SchemaLoader {
    /// Parse and validate a schema description
    pub fn from_value(name: &str, value: &Value) -> SchemaResult<Schema> {
        let schema = match value {
            Value::Object(map) => {
                let mut schema = Schema::new(name);
                for (field, raw) in map {
                    let descriptor: FieldDescriptor = serde_json::from_value(raw.clone())
                        .map_err(|e| SchemaError::malformed(name, format!("field '{}': {}", field, e)))?;
                    schema = schema.with_field(field.clone(), descriptor);
                }
                schema
            }
            Value::Array(items) => {
                let mut seen = HashSet::new();
                let mut schema = Schema::new(name);
                for raw in items {
                    let field: NamedField = serde_json::from_value(raw.clone())
                        .map_err(|e| SchemaError::malformed(name, e.to_string()))?;
                    if !seen.insert(field.name.clone()) {
                        return Err(SchemaError::DuplicateField(field.name));
                    }
                    schema = schema.with_field(field.name, field.descriptor);
                }
                schema
            }
            other => {
                return Err(SchemaError::malformed(
                    name,
                    format!("expected object or array, got {}", json_kind(other)),
                ))
            }
        };

        SchemaValidator::validate(&schema)?;
        Ok(schema)
    }

    /// Parse and validate a schema from JSON text
    pub fn from_json_str(name: &str, json: &str) -> SchemaResult<Schema> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| SchemaError::malformed(name, e.to_string()))?;
        Self::from_value(name, &value)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use serde_json::json;

    #[test]
    fn test_load_object_form() {
        let schema = SchemaLoader::from_value(
            "users",
            &json!({
                "id": { "type": "String", "isHashKey": true },
                "ts": { "type": "Number", "isRangeKey": true },
                "tags": { "type": "List" }
            }),
        )
        .unwrap();

        assert_eq!(schema.name(), "users");
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.field("tags").unwrap().field_type, FieldType::List);
    }

    #[test]
    fn test_load_array_form_preserves_order() {
        let schema = SchemaLoader::from_value(
            "users",
            &json!([
                { "name": "zeta", "type": "String", "isHashKey": true },
                { "name": "alpha", "type": "Number" }
            ]),
        )
        .unwrap();

        let names: Vec<&str> = schema.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_array_form_rejects_duplicates() {
        let err = SchemaLoader::from_value(
            "users",
            &json!([
                { "name": "id", "type": "String" },
                { "name": "id", "type": "Number" }
            ]),
        )
        .unwrap_err();

        assert_eq!(err, SchemaError::DuplicateField("id".into()));
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let err = SchemaLoader::from_value("users", &json!({ "id": { "type": "Uuid" } })).unwrap_err();
        assert_eq!(err.code(), "SCHEMA_MALFORMED");
    }

    #[test]
    fn test_loader_runs_validation() {
        let err = SchemaLoader::from_json_str(
            "users",
            r#"{ "a": { "type": "String", "isHashKey": true }, "b": { "type": "String", "isHashKey": true } }"#,
        )
        .unwrap_err();

        assert_eq!(err.code(), "SCHEMA_DUPLICATE_HASH_KEY");
    }

    #[test]
    fn test_scalar_document_rejected() {
        let err = SchemaLoader::from_value("users", &json!("nope")).unwrap_err();
        assert!(err.to_string().contains("string"));
    }
}
