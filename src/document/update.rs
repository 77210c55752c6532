//! Partial updates for the document store
//!
//! `$set` replaces only the supplied fields of the document addressed by
//! its unique key (hash + range). `$inc` adjusts a possibly dotted path.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::predicate::{CompileError, CompileResult};
use crate::schema::RegisteredSchema;
use crate::store::Row;

/// Update addressed by a filter document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentUpdate {
    #[serde(skip)]
    pub filter: Row,
    #[serde(rename = "$set", skip_serializing_if = "Map::is_empty")]
    pub set: Row,
    #[serde(rename = "$inc", skip_serializing_if = "Map::is_empty")]
    pub inc: Row,
    /// Create the document when nothing matches
    #[serde(skip)]
    pub upsert: bool,
}

impl DocumentUpdate {
    /// `$set` every non-key, non-empty field of the change-set
    pub fn build(change_set: &Row, registered: &RegisteredSchema) -> CompileResult<Self> {
        let filter = unique_key(change_set, registered)?;
        let layout = registered.layout();

        let set = change_set
            .iter()
            .filter(|(field, _)| !filter.contains_key(field.as_str()))
            .filter(|(_, value)| !is_empty_value(value))
            .filter(|(field, value)| !(layout.is_locally_indexed(field) && value.as_str() == Some("")))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();

        Ok(Self {
            filter,
            set,
            inc: Row::new(),
            upsert: false,
        })
    }

    /// `$inc` one path by `delta`
    pub fn increment(filter: Row, path: &[String], delta: Value) -> Self {
        let mut inc = Row::new();
        inc.insert(path.join("."), delta);
        Self {
            filter,
            set: Row::new(),
            inc,
            upsert: false,
        }
    }

    pub fn upserting(mut self) -> Self {
        self.upsert = true;
        self
    }
}

/// Hash and range key values of a row
pub fn unique_key(row: &Row, registered: &RegisteredSchema) -> CompileResult<Row> {
    let (hash_key, range_key) = registered.layout().primary_keys();
    let hash_key = hash_key.ok_or_else(|| CompileError::MissingPrimaryKey(registered.name().to_string()))?;

    let mut key = Row::new();
    for field in std::iter::once(hash_key).chain(range_key) {
        let value = row
            .get(field)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| CompileError::MissingKeyValue(field.to_string()))?;
        key.insert(field.to_string(), value);
    }
    Ok(key)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
