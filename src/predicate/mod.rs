//! Predicate subsystem
//!
//! One backend-agnostic predicate language, lowered once into a
//! `PredicatePlan`. The key-value and document renderers consume the plan
//! and only translate syntax; classification and key/filter placement live
//! here.
//!
//! # Design Principles
//!
//! - Planning is pure and deterministic
//! - The active hash key is bound exactly once, never as a field condition
//! - Unsupported fields are skipped unless strict mode is on

mod ast;
mod errors;
mod options;
mod plan;
mod planner;

pub use ast::{Comparison, MatchMode, Predicate, SortSpec, NEGATION_MARKER};
pub use errors::{CompileError, CompileResult};
pub use options::{CompileOptions, LookupKind};
pub use plan::{
    ConditionOp, FieldCondition, HashKeyBinding, Placement, PredicatePlan, ResolvedIndex,
};
pub use planner::{PredicatePlanner, SENTINEL_FIELD};
