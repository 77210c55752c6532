//! Document-store condition renderer
//!
//! Renders a `PredicatePlan` into a single condition document. Placement
//! does not matter here: every condition lands in the same document, joined
//! by field (AND) or under `$or`. The hash key equality is always a
//! top-level sibling.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::dates::extended_json;
use super::fragment::DocumentFragment;
use crate::predicate::{
    Comparison, CompileOptions, CompileResult, ConditionOp, FieldCondition, LookupKind, Predicate,
    PredicatePlan, PredicatePlanner,
};
use crate::schema::RegisteredSchema;

/// Sort order of a document query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSort {
    pub field: String,
    #[serde(default)]
    pub descending: bool,
}

/// Compiled document-store query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentQuery {
    pub conditions: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<DocumentSort>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projection: Vec<String>,
}

impl DocumentQuery {
    /// Plan and render a predicate in one step
    pub fn compile(
        predicate: &Predicate,
        registered: &RegisteredSchema,
        options: &CompileOptions,
        extra: Option<&DocumentFragment>,
    ) -> CompileResult<Self> {
        // Contains applies to every string field, key fields included.
        let options = CompileOptions {
            lookup: LookupKind::Scan,
            ..options.clone()
        };
        let plan = PredicatePlanner::new(registered).plan(predicate, &options)?;
        let query = Self::render(&plan, extra)?;

        let conditions = Value::Object(query.conditions.clone());
        tracing::debug!(
            entity = registered.name(),
            conditions = %conditions,
            sort = ?query.sort,
            "compiled document query"
        );

        Ok(query)
    }

    /// Render a plan. Fails only on a date bound that is not a date.
    pub fn render(plan: &PredicatePlan, extra: Option<&DocumentFragment>) -> CompileResult<Self> {
        let mut rendered = Vec::with_capacity(plan.conditions.len());
        for condition in &plan.conditions {
            rendered.push((condition.dotted_path(), render_condition(condition)?));
        }

        let mut conditions = match plan.comparison {
            Comparison::And => rendered.into_iter().collect::<Map<_, _>>(),
            Comparison::Or if rendered.is_empty() => Map::new(),
            Comparison::Or => {
                let clauses = rendered
                    .into_iter()
                    .map(|(path, condition)| {
                        let mut clause = Map::new();
                        clause.insert(path, condition);
                        Value::Object(clause)
                    })
                    .collect();
                let mut or = Map::new();
                or.insert("$or".to_string(), Value::Array(clauses));
                or
            }
        };

        if let Some(hash) = &plan.hash_key {
            conditions.insert(hash.field.clone(), hash.value.clone());
        }

        let (conditions, projection) = match extra {
            Some(extra) => (extra.merge(conditions), extra.projection.clone()),
            None => (conditions, Vec::new()),
        };

        Ok(DocumentQuery {
            conditions,
            sort: plan.index.as_ref().map(|index| DocumentSort {
                field: index.sort_field.clone(),
                descending: plan.descending,
            }),
            projection,
        })
    }
}

fn render_condition(condition: &FieldCondition) -> CompileResult<Value> {
    Ok(match &condition.op {
        ConditionOp::Eq(value) | ConditionOp::ListContains(value) => value.clone(),
        ConditionOp::Contains(value) => {
            let needle = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            json!({ "$regex": regex::escape(&needle), "$options": "i" })
        }
        ConditionOp::In(values) => json!({ "$in": values }),
        ConditionOp::ListNotContains(value) => json!({ "$ne": value }),
        ConditionOp::Range { begin, end } => {
            let field = condition.dotted_path();
            let mut range = Map::new();
            if let Some(begin) = begin {
                range.insert("$gte".to_string(), extended_json(&field, begin)?);
            }
            if let Some(end) = end {
                range.insert("$lte".to_string(), extended_json(&field, end)?);
            }
            if range.is_empty() {
                range.insert("$exists".to_string(), Value::Bool(true));
            }
            Value::Object(range)
        }
    })
}
