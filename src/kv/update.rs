//! Partial-update statements
//!
//! A sparse change-set becomes `set #a= :a, #b= :b` addressed by the row's
//! hash/range key. Key fields are never assigned, and a locally indexed
//! field cannot be blanked to an empty string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::bindings::Bindings;
use crate::predicate::{CompileError, CompileResult};
use crate::schema::RegisteredSchema;
use crate::store::Row;

/// Which attributes the backend returns after the update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnValues {
    AllNew,
    UpdatedNew,
}

/// Numeric adjustment direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustOp {
    Add,
    Subtract,
}

/// One structured assignment of an update statement
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// Replace the attribute at `path`
    Set { path: Vec<String>, value: Value },
    /// `path = path +/- delta`
    Adjust {
        path: Vec<String>,
        op: AdjustOp,
        delta: Value,
    },
}

/// Update request for one row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateStatement {
    pub table_name: String,
    pub key: Row,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_expression: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_names: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_values: BTreeMap<String, Value>,
    pub return_values: ReturnValues,
    #[serde(skip)]
    assignments: Vec<Assignment>,
}

impl UpdateStatement {
    /// Build a `set` statement from a change-set
    pub fn build(change_set: &Row, registered: &RegisteredSchema, table_name: &str) -> CompileResult<Self> {
        let layout = registered.layout();
        let (hash_key, range_key) = layout.primary_keys();
        let hash_key = hash_key.ok_or_else(|| CompileError::MissingPrimaryKey(registered.name().to_string()))?;

        let args: Row = change_set
            .iter()
            .filter(|(_, value)| !is_empty_value(value))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut key = Row::new();
        for field in std::iter::once(hash_key).chain(range_key) {
            let value = args
                .get(field)
                .cloned()
                .ok_or_else(|| CompileError::MissingKeyValue(field.to_string()))?;
            key.insert(field.to_string(), value);
        }

        let assignments: Vec<Assignment> = args
            .iter()
            .filter(|(field, _)| field.as_str() != hash_key && Some(field.as_str()) != range_key)
            .filter(|(field, value)| !(layout.is_locally_indexed(field) && value.as_str() == Some("")))
            .map(|(field, value)| Assignment::Set {
                path: vec![field.clone()],
                value: value.clone(),
            })
            .collect();

        Ok(Self::from_assignments(table_name, key, assignments, ReturnValues::AllNew))
    }

    /// `set #t = #t + :v` (or `- :v`) on a possibly nested attribute
    pub fn adjust(table_name: &str, key: Row, path: Vec<String>, op: AdjustOp, delta: Value) -> Self {
        Self::from_assignments(
            table_name,
            key,
            vec![Assignment::Adjust { path, op, delta }],
            ReturnValues::UpdatedNew,
        )
    }

    fn from_assignments(
        table_name: &str,
        key: Row,
        assignments: Vec<Assignment>,
        return_values: ReturnValues,
    ) -> Self {
        let mut bindings = Bindings::new();
        let clauses: Vec<String> = assignments
            .iter()
            .map(|assignment| match assignment {
                Assignment::Set { path, value } => {
                    let name = bindings.path(path);
                    let placeholder = bindings.value(&path.join("_"), value.clone());
                    format!("{}= {}", name, placeholder)
                }
                Assignment::Adjust { path, op, delta } => {
                    let name = bindings.path(path);
                    let placeholder = bindings.value("v", delta.clone());
                    let sign = match op {
                        AdjustOp::Add => "+",
                        AdjustOp::Subtract => "-",
                    };
                    format!("{} = {} {} {}", name, name, sign, placeholder)
                }
            })
            .collect();

        let (names, values) = bindings.into_parts();
        UpdateStatement {
            table_name: table_name.to_string(),
            key,
            update_expression: (!clauses.is_empty()).then(|| format!("set {}", clauses.join(", "))),
            expression_attribute_names: names,
            expression_attribute_values: values,
            return_values,
            assignments,
        }
    }

    /// Structured form of the update expression
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Nothing to assign; the backend call only touches the key
    pub fn is_noop(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Null and empty objects are dropped. `false`, `0`, `""` and `[]` are kept.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
