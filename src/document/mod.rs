//! Document store backend
//!
//! Renders the shared predicate plan into one condition document, builds
//! `$set`/`$inc` updates, and exposes the per-entity API over a
//! `DocumentBackend`.
//!
//! # Design Principles
//!
//! - The hash key equality is a top-level sibling of every other condition
//! - Date bounds are normalized instants, never raw caller strings
//! - Continuation is by page number

mod backend;
mod dates;
mod entity;
mod fragment;
mod memory;
mod query;
mod update;

pub use backend::{BulkOp, DocumentBackend, PageWindow};
pub use dates::{extended_json, parse_instant};
pub use entity::{DocumentEntity, DocumentPage};
pub use fragment::DocumentFragment;
pub use memory::MemoryDocumentStore;
pub use query::{DocumentQuery, DocumentSort};
pub use update::{unique_key, DocumentUpdate};
