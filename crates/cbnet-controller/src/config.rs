//! Controller configuration.

use crate::events::DrainOrder;

/// Potential threshold a rotation must beat to be applied.
pub const DEFAULT_EPSILON: f64 = -1.5;

/// Hops granted to a message whose rotation was rejected.
pub const DEFAULT_FALLBACK_HOPS: usize = 2;

/// Configuration for a [`crate::Controller`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    /// Number of addressable nodes
    pub nodes: usize,
    /// Initial parent of each node (1-based, `nodes + 1` is the super-root).
    /// Ignored unless its length equals `nodes`.
    pub edges: Vec<usize>,
    /// A rotation is applied only if its rank delta is strictly below this
    pub epsilon: f64,
    /// Hop budget for the plain advance after a rejected rotation
    pub fallback_hops: usize,
    /// Order in which each round drains its event queues
    pub drain_order: DrainOrder,
}

impl ControllerConfig {
    /// Default configuration over `nodes` nodes in a balanced tree.
    pub fn with_nodes(nodes: usize) -> Self {
        Self {
            nodes,
            ..Self::default()
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            nodes: 128,
            edges: Vec::new(),
            epsilon: DEFAULT_EPSILON,
            fallback_hops: DEFAULT_FALLBACK_HOPS,
            drain_order: DrainOrder::default(),
        }
    }
}
