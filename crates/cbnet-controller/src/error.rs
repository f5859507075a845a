//! Error types for cbnet-controller.
//!
//! Every variant here is fatal for the simulation: it means the topology or
//! the locking protocol is no longer in the state the algorithm relies on.
//! Rotations that merely fail the potential or lock test are not errors; see
//! [`crate::RotationOutcome`].

use cbnet_topology::{NodeId, TopologyError};
use thiserror::Error;

/// Result type for controller operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unrecoverable controller failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The tree or its wiring mirror failed the round-start check.
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    /// An in-flight routing announcement overlaps a path already locked.
    #[error("routing from {node} toward {dst} ({hops} hops) overlaps a locked path")]
    ProtocolViolation {
        node: NodeId,
        dst: NodeId,
        hops: usize,
    },

    /// Parent/grandparent links match none of the rotation shapes.
    #[error("unrecognized rotation shape around {node}")]
    UnrecognizedShape { node: NodeId },

    /// An event named an id that is not an addressable node.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}
