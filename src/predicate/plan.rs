//! Intermediate representation shared by both renderers
//!
//! The planner decides, once and backend-independently, which conditions
//! exist and on which side they go. Renderers only translate syntax.

use serde_json::Value;

use super::ast::Comparison;
use super::options::LookupKind;

/// Where a condition is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Narrows the partition/range read
    KeyCondition,
    /// Evaluated after retrieval
    Filter,
}

/// Condition shape for one field path
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionOp {
    /// Exact match
    Eq(Value),
    /// Substring match on a string
    Contains(Value),
    /// Value is one of the list
    In(Vec<Value>),
    /// Inclusive range; at least one bound is present
    Range {
        begin: Option<Value>,
        end: Option<Value>,
    },
    /// List field contains the value
    ListContains(Value),
    /// List field does not contain the value
    ListNotContains(Value),
}

/// A condition on a (possibly nested) field path
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    /// Path segments; a top-level field has one segment
    pub path: Vec<String>,
    pub op: ConditionOp,
    pub placement: Placement,
}

impl FieldCondition {
    /// Dotted path for logs and document conditions
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

/// Equality on the effective hash key, always AND-ed
#[derive(Debug, Clone, PartialEq)]
pub struct HashKeyBinding {
    pub field: String,
    pub value: Value,
}

/// The index a plan sorts/narrows by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIndex {
    /// Index name sent to the backend
    pub name: String,
    /// Field the index is ordered by
    pub sort_field: String,
    /// Global (own hash key) or local
    pub global: bool,
}

/// Backend-independent compiled predicate
#[derive(Debug, Clone, PartialEq)]
pub struct PredicatePlan {
    /// Hash-key equality, if the predicate supplied a concrete value
    pub hash_key: Option<HashKeyBinding>,
    /// Field conditions in predicate order
    pub conditions: Vec<FieldCondition>,
    pub comparison: Comparison,
    pub lookup: LookupKind,
    pub index: Option<ResolvedIndex>,
    pub descending: bool,
    /// Fields skipped because their type combination is unsupported
    pub skipped: Vec<String>,
}

impl PredicatePlan {
    /// Conditions placed on one side
    pub fn on(&self, placement: Placement) -> impl Iterator<Item = &FieldCondition> {
        self.conditions.iter().filter(move |c| c.placement == placement)
    }

    /// True when no field-level condition and no hash key exist
    pub fn is_unconstrained(&self) -> bool {
        self.hash_key.is_none() && self.conditions.is_empty()
    }
}
