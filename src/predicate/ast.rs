//! Backend-agnostic predicate value
//!
//! A predicate maps field names to desired values:
//! - scalar: equality (or substring under `MatchMode::Contains`)
//! - list: "IN" for scalar fields, ignored shape for list fields
//! - `{begin, end}`: date range, either bound optional
//! - nested object: per-leaf conditions on dotted paths
//! - `"!value"` on a list field: "does not contain"
//!
//! Fields absent from the predicate are unconstrained.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix marking a negated list-membership value
pub const NEGATION_MARKER: char = '!';

/// Field/value mapping compiled into backend filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Predicate(Map<String, Value>);

impl Predicate {
    /// Empty, fully unconstrained predicate
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Equality on a field
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Any-of on a scalar field
    pub fn any_of<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let list = values.into_iter().map(Into::into).collect();
        self.0.insert(field.into(), Value::Array(list));
        self
    }

    /// Two-sided date range
    pub fn between(
        self,
        field: impl Into<String>,
        begin: impl Into<Value>,
        end: impl Into<Value>,
    ) -> Self {
        let mut range = Map::new();
        range.insert("begin".into(), begin.into());
        range.insert("end".into(), end.into());
        self.eq(field, Value::Object(range))
    }

    /// Negated membership on a list field
    pub fn not_contains(self, field: impl Into<String>, value: &str) -> Self {
        self.eq(field, format!("{}{}", NEGATION_MARKER, value))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Iterate fields in map order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Predicate {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// How per-field conditions on the same side are joined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    #[default]
    And,
    Or,
}

impl Comparison {
    /// Lowercase keyword used in key-value expressions
    pub fn keyword(&self) -> &'static str {
        match self {
            Comparison::And => "and",
            Comparison::Or => "or",
        }
    }
}

/// String matching mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Eq,
    Contains,
}

/// Requested sort: an index name plus direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Local index field name or `{field}_global`
    pub index: String,
    /// Descending order flag
    #[serde(default)]
    pub descending: bool,
}

impl SortSpec {
    pub fn asc(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            descending: false,
        }
    }

    pub fn desc(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            descending: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_predicate_builder() {
        let predicate = Predicate::new()
            .eq("name", "alice")
            .any_of("status", ["active", "pending"])
            .between("createdAt", 10, 20)
            .not_contains("tags", "spam");

        assert_eq!(predicate.len(), 4);
        assert_eq!(predicate.get("name"), Some(&json!("alice")));
        assert_eq!(predicate.get("status"), Some(&json!(["active", "pending"])));
        assert_eq!(predicate.get("createdAt"), Some(&json!({"begin": 10, "end": 20})));
        assert_eq!(predicate.get("tags"), Some(&json!("!spam")));
    }

    #[test]
    fn test_predicate_deserializes_from_object() {
        let predicate: Predicate = serde_json::from_value(json!({"id": "u1", "age": 3})).unwrap();
        assert!(predicate.contains_field("id"));
        assert!(!predicate.is_empty());
    }

    #[test]
    fn test_comparison_keywords() {
        assert_eq!(Comparison::And.keyword(), "and");
        assert_eq!(Comparison::Or.keyword(), "or");
        assert_eq!(Comparison::default(), Comparison::And);
        assert_eq!(MatchMode::default(), MatchMode::Eq);
    }

    #[test]
    fn test_sort_spec() {
        assert!(SortSpec::desc("createdAt_global").descending);
        assert!(!SortSpec::asc("status").descending);
    }
}
