//! Key-value store backend
//!
//! Renders the shared predicate plan into key-condition and filter
//! expressions, builds partial-update statements, and exposes the
//! per-entity API over a `KvBackend`.
//!
//! # Design Principles
//!
//! - Every name or value referenced by an expression has a placeholder entry
//! - Hash-key equality is AND-ed onto the relevant side, never OR-ed
//! - A scan never carries an empty filter; a query with nothing to bind
//!   carries no placeholder maps
//! - Key fields are never assigned by an update

mod backend;
mod bindings;
mod entity;
mod filter;
mod fragment;
mod memory;
mod requests;
mod update;

pub use backend::KvBackend;
pub use bindings::Bindings;
pub use entity::KvEntity;
pub use filter::KvFilter;
pub use fragment::KvFragment;
pub use memory::MemoryKvStore;
pub use requests::{BatchGetRequest, DeleteRequest, GetRequest};
pub use update::{AdjustOp, Assignment, ReturnValues, UpdateStatement};
