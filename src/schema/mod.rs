//! Schema subsystem
//!
//! Per-entity field descriptors, registration-time validation and the
//! derived key layout used by predicate compilation, update building and
//! cursor construction.
//!
//! # Design Principles
//!
//! - Schemas are immutable once registered
//! - Descriptors are validated once, never re-inspected per call
//! - Key structure is computed once into a `KeyLayout`

mod classify;
mod errors;
mod layout;
mod loader;
mod registered;
mod types;
mod validator;

pub use classify::{classify_field, classify_type, classify_value, ValueKind};
pub use errors::{SchemaError, SchemaResult};
pub use layout::{GlobalIndex, IndexRef, KeyLayout, GLOBAL_INDEX_SUFFIX};
pub use loader::SchemaLoader;
pub use registered::RegisteredSchema;
pub use types::{FieldDescriptor, FieldType, GlobalIndexSpec, Schema};
pub use validator::SchemaValidator;
