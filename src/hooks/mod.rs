//! Context hook protocol
//!
//! Every mutating entity operation accepts an optional `WriteContext`. Hooks
//! run around the backend write; they are extension points, not part of the
//! compiled statement.

mod context;
mod operation;

pub use context::{ErrorHook, PostEvent, PostHook, PreEvent, PreHook, WriteContext};
pub use operation::OperationKind;
