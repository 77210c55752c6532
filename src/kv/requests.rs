//! Point-read and delete requests

use std::collections::BTreeMap;

use serde::Serialize;

use super::bindings::Bindings;
use crate::store::Row;

/// Projection as a placeholder list plus its name map
fn projection(fields: &[String]) -> (Option<String>, BTreeMap<String, String>) {
    if fields.is_empty() {
        return (None, BTreeMap::new());
    }
    let mut bindings = Bindings::new();
    let expression = fields
        .iter()
        .map(|field| bindings.name(field))
        .collect::<Vec<_>>()
        .join(",");
    (Some(expression), bindings.into_parts().0)
}

/// Single-row read by primary key
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetRequest {
    pub table_name: String,
    pub key: Row,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_names: BTreeMap<String, String>,
}

impl GetRequest {
    pub fn new(table_name: impl Into<String>, key: Row) -> Self {
        Self {
            table_name: table_name.into(),
            key,
            projection_expression: None,
            expression_attribute_names: BTreeMap::new(),
        }
    }

    /// Return only the given attributes
    pub fn project(mut self, fields: &[String]) -> Self {
        let (expression, names) = projection(fields);
        self.projection_expression = expression;
        self.expression_attribute_names = names;
        self
    }
}

/// Multi-row read by primary keys
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchGetRequest {
    pub table_name: String,
    pub keys: Vec<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_names: BTreeMap<String, String>,
}

impl BatchGetRequest {
    pub fn new(table_name: impl Into<String>, keys: Vec<Row>) -> Self {
        Self {
            table_name: table_name.into(),
            keys,
            projection_expression: None,
            expression_attribute_names: BTreeMap::new(),
        }
    }

    pub fn project(mut self, fields: &[String]) -> Self {
        let (expression, names) = projection(fields);
        self.projection_expression = expression;
        self.expression_attribute_names = names;
        self
    }
}

/// Single-row delete returning the old row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteRequest {
    pub table_name: String,
    pub key: Row,
}

/// Resolve a projection back to attribute names
pub(crate) fn projected_fields(
    expression: Option<&str>,
    names: &BTreeMap<String, String>,
) -> Option<Vec<String>> {
    expression.map(|expr| {
        expr.split(',')
            .map(|placeholder| {
                names
                    .get(placeholder.trim())
                    .cloned()
                    .unwrap_or_else(|| placeholder.trim().to_string())
            })
            .collect()
    })
}
