//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::NodeId;

/// Lookup and invariant violations.
///
/// These signal caller misuse: the referenced node is not a member of the
/// store, or the requested move would break the tree. Out-of-range positions
/// are not errors; they are reported through the `Option`/`bool` results of
/// the store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("node not found in store: {0}")]
    NodeNotFound(NodeId),

    #[error("parent not found in store: {0}")]
    ParentNotFound(NodeId),

    #[error("moving {node} under {parent} would make it its own ancestor")]
    CycleDetected { node: NodeId, parent: NodeId },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
