//! Caller-supplied expression fragment merged into a compiled filter

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::bindings::Bindings;
use crate::predicate::Comparison;

/// Extra key/filter conditions and projection, written directly in the
/// key-value expression syntax
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KvFragment {
    /// Overrides the entity's table name
    #[serde(default)]
    pub table_name: Option<String>,
    /// AND-ed together, then AND-ed onto the compiled key condition
    #[serde(default)]
    pub key_conditions: Vec<String>,
    /// Joined with `comparison`, then joined onto the compiled filter
    #[serde(default)]
    pub filter_expressions: Vec<String>,
    #[serde(default)]
    pub comparison: Comparison,
    /// Attributes to return
    #[serde(default)]
    pub projection: Vec<String>,
    /// Placeholders used by the raw expressions above
    #[serde(default)]
    pub names: BTreeMap<String, String>,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

impl KvFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_table(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }

    pub fn key_condition(mut self, expression: impl Into<String>) -> Self {
        self.key_conditions.push(expression.into());
        self
    }

    pub fn filter(mut self, expression: impl Into<String>) -> Self {
        self.filter_expressions.push(expression.into());
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

    pub fn bind_name(mut self, placeholder: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.names.insert(placeholder.into(), attribute.into());
        self
    }

    pub fn bind_value(mut self, placeholder: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(placeholder.into(), value.into());
        self
    }

    /// Bindings seeded with this fragment's placeholders
    pub(crate) fn bindings(&self) -> Bindings {
        Bindings::seeded(self.names.clone(), self.values.clone())
    }

    /// Key conditions AND-ed onto `existing` (parenthesized)
    pub(crate) fn merge_key_condition(&self, existing: Option<String>) -> Option<String> {
        if self.key_conditions.is_empty() {
            return existing;
        }
        let own = self.key_conditions.join(" and ");
        Some(match existing {
            Some(existing) => format!("{} and ({})", own, existing),
            None => own,
        })
    }

    /// Filter expressions joined onto `existing` (parenthesized)
    pub(crate) fn merge_filter(&self, existing: Option<String>) -> Option<String> {
        if self.filter_expressions.is_empty() {
            return existing;
        }
        let keyword = self.comparison.keyword();
        let own = self.filter_expressions.join(&format!(" {} ", keyword));
        Some(match existing {
            Some(existing) => format!("{} {} ({})", own, keyword, existing),
            None => own,
        })
    }
}
