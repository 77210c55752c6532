//! Key-value expression renderer
//!
//! Renders a `PredicatePlan` into key-condition and filter expressions with
//! their placeholder maps. Conditions placed on the key side are only
//! emitted as a key condition for narrowing lookups; scans have no key
//! condition, so they fold into the filter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::bindings::Bindings;
use super::fragment::KvFragment;
use crate::pagination::KvCursor;
use crate::predicate::{
    Comparison, CompileOptions, CompileResult, ConditionOp, FieldCondition, LookupKind, Placement,
    Predicate, PredicatePlan, PredicatePlanner, SENTINEL_FIELD,
};
use crate::schema::RegisteredSchema;

/// Compiled query/scan request for the key-value store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KvFilter {
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_condition_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_names: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_values: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_start_key: Option<KvCursor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_segments: Option<u32>,
}

impl KvFilter {
    /// Plan and render a predicate in one step
    pub fn compile(
        predicate: &Predicate,
        registered: &RegisteredSchema,
        options: &CompileOptions,
        table_name: &str,
        extra: Option<&KvFragment>,
    ) -> CompileResult<Self> {
        let plan = PredicatePlanner::new(registered).plan(predicate, options)?;
        let filter = Self::render(&plan, table_name, options.page_size, extra);

        tracing::debug!(
            table = %filter.table_name,
            key_condition = ?filter.key_condition_expression,
            filter = ?filter.filter_expression,
            index = ?filter.index_name,
            "compiled key-value filter"
        );

        Ok(filter)
    }

    /// Render a plan. Pure: equal plans render to equal filters.
    pub fn render(
        plan: &PredicatePlan,
        table_name: &str,
        page_size: Option<u32>,
        extra: Option<&KvFragment>,
    ) -> Self {
        let mut bindings = extra.map(KvFragment::bindings).unwrap_or_default();

        let hash = plan.hash_key.as_ref().map(|binding| {
            let name = bindings.name(&binding.field);
            let value = bindings.value(&binding.field, binding.value.clone());
            format!("{} = {}", name, value)
        });

        let narrowing = plan.lookup == LookupKind::Query;
        let mut key_parts = Vec::new();
        let mut filter_parts = Vec::new();
        for condition in &plan.conditions {
            let expression = render_condition(condition, &mut bindings);
            if narrowing && condition.placement == Placement::KeyCondition {
                key_parts.push(expression);
            } else {
                filter_parts.push(expression);
            }
        }

        let (key_expr, filter_expr) = if narrowing {
            (
                with_hash(hash, &key_parts, plan.comparison),
                join(&filter_parts, plan.comparison),
            )
        } else {
            (None, with_hash(hash, &filter_parts, plan.comparison))
        };

        let (key_expr, mut filter_expr, projection) = match extra {
            Some(extra) => {
                let projection = (!extra.projection.is_empty()).then(|| {
                    extra
                        .projection
                        .iter()
                        .map(|field| bindings.name(field))
                        .collect::<Vec<_>>()
                        .join(",")
                });
                (
                    extra.merge_key_condition(key_expr),
                    extra.merge_filter(filter_expr),
                    projection,
                )
            }
            None => (key_expr, filter_expr, None),
        };

        let (mut names, mut values) = bindings.into_parts();
        if filter_expr.is_none() {
            if key_expr.is_none() {
                values.clear();
                if projection.is_none() {
                    names.clear();
                }
            }
            if !narrowing {
                filter_expr = Some(format!("attribute_not_exists({})", SENTINEL_FIELD));
            }
        }

        let table_name = extra
            .and_then(|e| e.table_name.clone())
            .unwrap_or_else(|| table_name.to_string());

        KvFilter {
            table_name,
            key_condition_expression: key_expr,
            filter_expression: filter_expr,
            projection_expression: projection,
            expression_attribute_names: names,
            expression_attribute_values: values,
            index_name: plan.index.as_ref().map(|index| index.name.clone()),
            scan_index_forward: plan.index.as_ref().map(|_| !plan.descending),
            exclusive_start_key: None,
            limit: page_size,
            segment: None,
            total_segments: None,
        }
    }

    /// Same filter, resuming after `cursor`
    pub fn starting_after(mut self, cursor: Option<KvCursor>) -> Self {
        self.exclusive_start_key = cursor;
        self
    }

    /// Same filter, restricted to one scan segment
    pub fn in_segment(mut self, segment: u32, total_segments: u32) -> Self {
        self.segment = Some(segment);
        self.total_segments = Some(total_segments);
        self
    }
}

fn render_condition(condition: &FieldCondition, bindings: &mut Bindings) -> String {
    let name = bindings.path(&condition.path);
    let hint = condition.path.join("_");

    match &condition.op {
        ConditionOp::Eq(value) => format!("{} = {}", name, bindings.value(&hint, value.clone())),
        ConditionOp::Contains(value) | ConditionOp::ListContains(value) => {
            format!("contains({}, {})", name, bindings.value(&hint, value.clone()))
        }
        ConditionOp::ListNotContains(value) => {
            format!("not contains({}, {})", name, bindings.value(&hint, value.clone()))
        }
        ConditionOp::In(values) => {
            let placeholders: Vec<String> = values
                .iter()
                .enumerate()
                .map(|(i, value)| bindings.value(&format!("{}{}", hint, i), value.clone()))
                .collect();
            format!("{} IN ({})", name, placeholders.join(","))
        }
        ConditionOp::Range { begin, end } => {
            let begin = begin
                .as_ref()
                .map(|v| bindings.value(&format!("{}Begin", hint), v.clone()));
            let end = end
                .as_ref()
                .map(|v| bindings.value(&format!("{}End", hint), v.clone()));
            match (begin, end) {
                (Some(begin), Some(end)) => format!("{} between {} and {}", name, begin, end),
                (Some(begin), None) => format!("{} >= {}", name, begin),
                (None, Some(end)) => format!("{} <= {}", name, end),
                (None, None) => format!("attribute_exists({})", name),
            }
        }
    }
}

fn join(parts: &[String], comparison: Comparison) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&format!(" {} ", comparison.keyword())))
    }
}

/// AND the hash equality onto the joined parts, parenthesizing a disjunction
fn with_hash(hash: Option<String>, parts: &[String], comparison: Comparison) -> Option<String> {
    let joined = join(parts, comparison);
    match (hash, joined) {
        (Some(hash), Some(rest)) if comparison == Comparison::Or && parts.len() > 1 => {
            Some(format!("{} and ({})", hash, rest))
        }
        (Some(hash), Some(rest)) => Some(format!("{} and {}", hash, rest)),
        (Some(hash), None) => Some(hash),
        (None, rest) => rest,
    }
}
