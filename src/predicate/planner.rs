//! Predicate planner
//!
//! Lowers a predicate into a `PredicatePlan`:
//!
//! 1. Resolve the effective hash key (the sort index's hash key for a global
//!    index, otherwise the primary hash key) and pull its value out.
//! 2. Classify each remaining field by declared type and runtime value.
//! 3. Place a condition on the key side only for narrowing lookups on a
//!    field of the active key set. Everything else is post-filtered.
//!
//! Unsupported fields are skipped unless strict mode is on.

use serde_json::Value;

use super::ast::{MatchMode, Predicate, NEGATION_MARKER};
use super::errors::{CompileError, CompileResult};
use super::options::CompileOptions;
use super::plan::{
    ConditionOp, FieldCondition, HashKeyBinding, Placement, PredicatePlan, ResolvedIndex,
};
use crate::schema::{classify_field, classify_value, IndexRef, RegisteredSchema, ValueKind};

/// Reserved field name ignored in predicates and used by the trivially-true
/// scan filter
pub const SENTINEL_FIELD: &str = "dummy";

/// Plans predicates against one registered schema
pub struct PredicatePlanner<'a> {
    registered: &'a RegisteredSchema,
}

impl<'a> PredicatePlanner<'a> {
    pub fn new(registered: &'a RegisteredSchema) -> Self {
        Self { registered }
    }

    /// Lower a predicate. The predicate itself is never mutated.
    pub fn plan(&self, predicate: &Predicate, options: &CompileOptions) -> CompileResult<PredicatePlan> {
        let layout = self.registered.layout();

        let index = match &options.sort {
            Some(sort) => Some(
                layout
                    .resolve_index(&sort.index)
                    .ok_or_else(|| CompileError::UnknownIndex(sort.index.clone()))?,
            ),
            None => None,
        };

        let hash_field = match index {
            Some(IndexRef::Global(global)) => Some(global.hash_key.as_str()),
            _ => layout.hash_key(),
        };

        let hash_key = hash_field.and_then(|field| {
            let value = predicate.get(field).filter(|v| is_concrete(v))?;
            let value = match classify_field(self.registered.schema().field(field)) {
                ValueKind::String => stringify(value).unwrap_or_else(|| value.clone()),
                _ => value.clone(),
            };
            Some(HashKeyBinding {
                field: field.to_string(),
                value,
            })
        });

        if let (Some(IndexRef::Global(global)), None) = (index, &hash_key) {
            return Err(CompileError::MissingIndexHashKey {
                index: global.name.clone(),
                hash_key: global.hash_key.clone(),
            });
        }

        let key_fields: Vec<&str> = match index {
            Some(IndexRef::Global(global)) => vec![global.indexed_field.as_str()],
            Some(IndexRef::Local(field)) => layout.hash_key().into_iter().chain([field]).collect(),
            None => layout
                .hash_key()
                .into_iter()
                .chain(layout.range_key())
                .collect(),
        };

        let sort_index_name = index.map(|i| i.name());

        let mut conditions = Vec::new();
        let mut skipped = Vec::new();

        for (name, value) in predicate.iter() {
            if Some(name.as_str()) == hash_field || name == SENTINEL_FIELD || value.is_null() {
                continue;
            }

            let declared = classify_field(self.registered.schema().field(name));
            let actual = classify_value(value);
            let key_side = options.is_narrowing() && key_fields.contains(&name.as_str());

            // A date range on the locally indexed field currently sorted by is
            // narrowed even on scans.
            let date_on_sort_index =
                layout.is_locally_indexed(name) && sort_index_name == Some(name.as_str());

            let lowered = lower_field(
                name,
                value,
                declared,
                actual,
                key_side,
                date_on_sort_index,
                options.match_mode,
            );

            match lowered {
                Some(mut lowered) => conditions.append(&mut lowered),
                None if options.strict => {
                    return Err(CompileError::UnsupportedField {
                        field: name.clone(),
                        declared: declared.as_str(),
                        actual: actual.as_str(),
                    })
                }
                None => {
                    tracing::warn!(
                        entity = self.registered.name(),
                        field = %name,
                        declared = declared.as_str(),
                        actual = actual.as_str(),
                        "skipping unsupported predicate field"
                    );
                    skipped.push(name.clone());
                }
            }
        }

        Ok(PredicatePlan {
            hash_key,
            conditions,
            comparison: options.comparison,
            lookup: options.lookup,
            index: index.map(|i| ResolvedIndex {
                name: i.name().to_string(),
                sort_field: i.sort_field().to_string(),
                global: matches!(i, IndexRef::Global(_)),
            }),
            descending: options.sort.as_ref().map(|s| s.descending).unwrap_or(false),
            skipped,
        })
    }
}

/// Null and empty string do not count as a hash key value
fn is_concrete(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn lower_field(
    name: &str,
    value: &Value,
    declared: ValueKind,
    actual: ValueKind,
    key_side: bool,
    date_on_sort_index: bool,
    match_mode: MatchMode,
) -> Option<Vec<FieldCondition>> {
    let single = |op: ConditionOp, placement: Placement| {
        Some(vec![FieldCondition {
            path: vec![name.to_string()],
            op,
            placement,
        }])
    };
    let side = if key_side {
        Placement::KeyCondition
    } else {
        Placement::Filter
    };

    match (declared, actual) {
        (ValueKind::String, ValueKind::List) => {
            let items = value.as_array()?;
            if items.is_empty() {
                return None;
            }
            let values = items.iter().map(stringify).collect::<Option<Vec<_>>>()?;
            single(ConditionOp::In(values), side)
        }
        (ValueKind::String, kind) if kind.is_scalar() => {
            let text = stringify(value)?;
            let op = if !key_side && match_mode == MatchMode::Contains {
                ConditionOp::Contains(text)
            } else {
                ConditionOp::Eq(text)
            };
            single(op, side)
        }
        (ValueKind::Number, kind) if kind.is_scalar() => single(ConditionOp::Eq(value.clone()), side),
        (ValueKind::Boolean, kind) if kind.is_scalar() => {
            single(ConditionOp::Eq(value.clone()), Placement::Filter)
        }
        (ValueKind::DateRange, ValueKind::DateRange) => {
            let bound = |key: &str| value.get(key).filter(|v| !v.is_null()).cloned();
            let (begin, end) = (bound("begin"), bound("end"));
            if begin.is_none() && end.is_none() {
                return None;
            }
            let placement = if key_side || date_on_sort_index {
                Placement::KeyCondition
            } else {
                Placement::Filter
            };
            single(ConditionOp::Range { begin, end }, placement)
        }
        (ValueKind::Map, ValueKind::Map | ValueKind::DateRange) => {
            let mut leaves = Vec::new();
            flatten(vec![name.to_string()], value, &mut leaves);
            let conditions = leaves
                .into_iter()
                .map(|(path, leaf)| {
                    let op = if leaf.is_string() && match_mode == MatchMode::Contains {
                        ConditionOp::Contains(leaf)
                    } else {
                        ConditionOp::Eq(leaf)
                    };
                    FieldCondition {
                        path,
                        op,
                        placement: Placement::Filter,
                    }
                })
                .collect();
            Some(conditions)
        }
        (ValueKind::List, ValueKind::String) => {
            let text = value.as_str()?;
            match text.strip_prefix(NEGATION_MARKER) {
                Some(rest) => single(
                    ConditionOp::ListNotContains(Value::String(rest.to_string())),
                    Placement::Filter,
                ),
                None => single(ConditionOp::ListContains(value.clone()), Placement::Filter),
            }
        }
        (ValueKind::List, ValueKind::Number) => {
            single(ConditionOp::ListContains(value.clone()), Placement::Filter)
        }
        _ => None,
    }
}

/// Scalars rendered as strings for string-typed fields
fn stringify(value: &Value) -> Option<Value> {
    match value {
        Value::String(_) => Some(value.clone()),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        _ => None,
    }
}

/// Collect non-null leaves of a nested object with their paths. Arrays and
/// empty objects are leaves.
fn flatten(path: Vec<String>, value: &Value, out: &mut Vec<(Vec<String>, Value)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let mut child_path = path.clone();
                child_path.push(key.clone());
                flatten(child_path, child, out);
            }
        }
        Value::Null => {}
        leaf => out.push((path, leaf.clone())),
    }
}
