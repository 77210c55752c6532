//! Caller-supplied condition document merged into a compiled query

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::predicate::Comparison;

/// Extra conditions and projection appended to a compiled query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFragment {
    /// Condition document, field path to condition
    #[serde(default)]
    pub conditions: Map<String, Value>,
    /// How the fragment joins the compiled conditions
    #[serde(default)]
    pub comparison: Comparison,
    #[serde(default)]
    pub projection: Vec<String>,
}

impl DocumentFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn condition(mut self, path: impl Into<String>, condition: impl Into<Value>) -> Self {
        self.conditions.insert(path.into(), condition.into());
        self
    }

    pub fn with_comparison(mut self, comparison: Comparison) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection.extend(fields.into_iter().map(Into::into));
        self
    }

    /// `{"$and"|"$or": [compiled, own]}`; either side alone when the other is empty
    pub(crate) fn merge(&self, compiled: Map<String, Value>) -> Map<String, Value> {
        if self.conditions.is_empty() {
            return compiled;
        }
        if compiled.is_empty() {
            return self.conditions.clone();
        }

        let keyword = match self.comparison {
            Comparison::And => "$and",
            Comparison::Or => "$or",
        };
        let mut merged = Map::new();
        merged.insert(
            keyword.to_string(),
            Value::Array(vec![Value::Object(compiled), Value::Object(self.conditions.clone())]),
        );
        merged
    }
}
