//! Error types for cbnet-topology.

use thiserror::Error;

use crate::NodeId;

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, TopologyError>;

/// Errors raised while building or checking a topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// An initial edge list names an impossible parent/child connection.
    #[error("invalid edge list at node {node}: {reason}")]
    InvalidEdgeList { node: NodeId, reason: String },

    /// The tree no longer satisfies the binary-search-tree invariant.
    #[error("tree invariant violated at node {node}: {reason}")]
    InvariantViolation { node: NodeId, reason: String },

    /// The wiring mirror disagrees with the logical tree.
    #[error("wiring mirror disagrees with tree at node {node}")]
    MirrorMismatch { node: NodeId },

    /// An id outside `1..=n` (or the super-root where it is not allowed).
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}
