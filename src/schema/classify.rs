//! Type classification for predicate values and declared fields
//!
//! Both sides are reduced to a `ValueKind` so the predicate planner can pick
//! a condition shape from the (declared, runtime) pair.

use serde_json::Value;

use super::types::{FieldDescriptor, FieldType};

/// Classified kind of a value or field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    /// `{begin, end}` object, either bound optional
    DateRange,
    Map,
    List,
    Unknown,
}

impl ValueKind {
    /// Kind name for logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "String",
            ValueKind::Number => "Number",
            ValueKind::Boolean => "Boolean",
            ValueKind::DateRange => "DateRange",
            ValueKind::Map => "Map",
            ValueKind::List => "List",
            ValueKind::Unknown => "Unknown",
        }
    }

    /// True for string, number and boolean
    pub fn is_scalar(&self) -> bool {
        matches!(self, ValueKind::String | ValueKind::Number | ValueKind::Boolean)
    }
}

/// Classify a runtime value.
///
/// An object whose keys are a non-empty subset of `begin`/`end` is a date
/// range; any other object is a map. `null` is unknown.
pub fn classify_value(value: &Value) -> ValueKind {
    match value {
        Value::String(_) => ValueKind::String,
        Value::Number(_) => ValueKind::Number,
        Value::Bool(_) => ValueKind::Boolean,
        Value::Array(_) => ValueKind::List,
        Value::Object(map) => {
            let is_range = !map.is_empty() && map.keys().all(|k| k == "begin" || k == "end");
            if is_range {
                ValueKind::DateRange
            } else {
                ValueKind::Map
            }
        }
        Value::Null => ValueKind::Unknown,
    }
}

/// Classify a declared field type
pub fn classify_type(field_type: FieldType) -> ValueKind {
    match field_type {
        FieldType::String => ValueKind::String,
        FieldType::Number => ValueKind::Number,
        FieldType::Boolean => ValueKind::Boolean,
        FieldType::Date => ValueKind::DateRange,
        FieldType::Map => ValueKind::Map,
        FieldType::List => ValueKind::List,
    }
}

/// Classify a declared field; undeclared fields are unknown
pub fn classify_field(descriptor: Option<&FieldDescriptor>) -> ValueKind {
    descriptor
        .map(|d| classify_type(d.field_type))
        .unwrap_or(ValueKind::Unknown)
}
