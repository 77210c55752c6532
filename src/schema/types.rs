//! Schema type definitions
//!
//! A schema is an ordered list of field descriptors. Each descriptor carries
//! the declared field type plus optional key and index flags:
//! - `isHashKey`: partition key of the primary key
//! - `isRangeKey`: ordering key within a partition
//! - `isLocalIndex`: local secondary index sharing the primary hash key
//! - `globalIndex`: global secondary index with its own hash key

use serde::{Deserialize, Serialize};

/// Declared field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// Integer or floating point number
    Number,
    /// Boolean
    Boolean,
    /// Timestamp, queried with `{begin, end}` ranges
    Date,
    /// Nested object
    Map,
    /// List of scalars
    List,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "String",
            FieldType::Number => "Number",
            FieldType::Boolean => "Boolean",
            FieldType::Date => "Date",
            FieldType::Map => "Map",
            FieldType::List => "List",
        }
    }
}

/// Global secondary index declaration attached to its sort field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalIndexSpec {
    /// Field acting as the index's hash key
    pub hash_key: String,
}

/// Per-field descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Declared type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Primary hash key flag
    #[serde(default)]
    pub is_hash_key: bool,
    /// Primary range key flag
    #[serde(default)]
    pub is_range_key: bool,
    /// Local secondary index flag
    #[serde(default)]
    pub is_local_index: bool,
    /// Global secondary index, if this field is the sort key of one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_index: Option<GlobalIndexSpec>,
}

impl FieldDescriptor {
    /// Create a plain descriptor of the given type
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            is_hash_key: false,
            is_range_key: false,
            is_local_index: false,
            global_index: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn date() -> Self {
        Self::new(FieldType::Date)
    }

    pub fn map() -> Self {
        Self::new(FieldType::Map)
    }

    pub fn list() -> Self {
        Self::new(FieldType::List)
    }

    /// Mark as primary hash key
    pub fn hash_key(mut self) -> Self {
        self.is_hash_key = true;
        self
    }

    /// Mark as primary range key
    pub fn range_key(mut self) -> Self {
        self.is_range_key = true;
        self
    }

    /// Mark as locally indexed
    pub fn local_index(mut self) -> Self {
        self.is_local_index = true;
        self
    }

    /// Declare a global index sorted by this field and partitioned by `hash_key`
    pub fn global_index(mut self, hash_key: impl Into<String>) -> Self {
        self.global_index = Some(GlobalIndexSpec {
            hash_key: hash_key.into(),
        });
        self
    }

    /// Returns true if this field addresses a row (hash or range key)
    pub fn is_primary_key(&self) -> bool {
        self.is_hash_key || self.is_range_key
    }
}

/// Entity schema: name plus fields in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    fields: Vec<(String, FieldDescriptor)>,
}

impl Schema {
    /// Create an empty schema for the named entity
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field. A field declared twice keeps its first position and the
    /// last descriptor; `SchemaValidator` rejects duplicates from the loader.
    pub fn with_field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = descriptor,
            None => self.fields.push((name, descriptor)),
        }
        self
    }

    /// Entity name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a field descriptor
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    /// Iterate fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_builders() {
        let d = FieldDescriptor::string().hash_key();
        assert!(d.is_hash_key);
        assert!(d.is_primary_key());
        assert_eq!(d.field_type, FieldType::String);

        let g = FieldDescriptor::date().local_index().global_index("owner");
        assert!(g.is_local_index);
        assert_eq!(g.global_index.unwrap().hash_key, "owner");
    }

    #[test]
    fn test_descriptor_deserializes_camel_case() {
        let d: FieldDescriptor = serde_json::from_value(json!({
            "type": "Date",
            "isLocalIndex": true,
            "globalIndex": { "hashKey": "owner" }
        }))
        .unwrap();

        assert_eq!(d.field_type, FieldType::Date);
        assert!(d.is_local_index);
        assert!(!d.is_hash_key);
        assert_eq!(d.global_index.unwrap().hash_key, "owner");
    }

    #[test]
    fn test_schema_preserves_declaration_order() {
        let schema = Schema::new("users")
            .with_field("id", FieldDescriptor::string().hash_key())
            .with_field("ts", FieldDescriptor::number().range_key())
            .with_field("name", FieldDescriptor::string());

        let names: Vec<&str> = schema.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["id", "ts", "name"]);
        assert_eq!(schema.len(), 3);
        assert!(schema.field("ts").unwrap().is_range_key);
        assert!(schema.field("missing").is_none());
    }

    #[test]
    fn test_redeclared_field_replaces_descriptor() {
        let schema = Schema::new("users")
            .with_field("id", FieldDescriptor::string())
            .with_field("id", FieldDescriptor::string().hash_key());

        assert_eq!(schema.len(), 1);
        assert!(schema.field("id").unwrap().is_hash_key);
    }

    #[test]
    fn test_field_type_names() {
        assert_eq!(FieldType::String.type_name(), "String");
        assert_eq!(FieldType::Date.type_name(), "Date");
        assert_eq!(FieldType::List.type_name(), "List");
    }
}
