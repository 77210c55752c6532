//! Mutating operation kinds reported to post hooks

use serde::{Deserialize, Serialize};

/// Kind of write that triggered a post hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    #[serde(rename = "0")]
    Create,
    #[serde(rename = "1")]
    Update,
    #[serde(rename = "2")]
    Delete,
    #[serde(rename = "3")]
    BatchPut,
}

impl OperationKind {
    /// Wire code ("0".."3")
    pub fn code(&self) -> &'static str {
        match self {
            OperationKind::Create => "0",
            OperationKind::Update => "1",
            OperationKind::Delete => "2",
            OperationKind::BatchPut => "3",
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, OperationKind::Delete)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::BatchPut => "batch_put",
        };
        write!(f, "{}", name)
    }
}
