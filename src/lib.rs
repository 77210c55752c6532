//! polyquery - A schema-driven query layer
//!
//! One predicate language compiled to two storage models: a key-value store
//! with hash/range keys and secondary indexes, and a document store queried
//! with condition documents.
//!
//! Flow: predicate -> `PredicatePlanner` (schema layout + type classifier)
//! -> `PredicatePlan` -> backend renderer -> pagination engine -> backend.

pub mod config;
pub mod document;
pub mod hooks;
pub mod kv;
pub mod pagination;
pub mod predicate;
pub mod schema;
pub mod store;

pub use config::QueryConfig;
pub use document::{DocumentEntity, DocumentQuery, MemoryDocumentStore};
pub use hooks::{OperationKind, WriteContext};
pub use kv::{KvEntity, KvFilter, MemoryKvStore};
pub use pagination::{KvCursor, SegmentCursor, Termination};
pub use predicate::{Comparison, CompileOptions, MatchMode, Predicate, SortSpec};
pub use schema::{FieldDescriptor, RegisteredSchema, Schema};
pub use store::{Row, StoreError, StoreResult};
