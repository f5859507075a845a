//! CBNet Topology
//!
//! Self-adjusting binary-search-tree topology for a circuit-switched network
//! simulation, plus the weighted index used to price restructuring.
//!
//! # Model
//!
//! N addressable nodes carry the ids `1..=N`. They form a binary search tree
//! hanging off a synthetic super-root (id `N + 1`) that never routes traffic.
//! Links are stored in an arena indexed by id, so parent/child relations are
//! plain integers and there are no ownership cycles.
//!
//! # Weights
//!
//! Every node counts how often it was an endpoint of a completed message.
//! The weight of a subtree is the sum of those counters over the subtree's id
//! range. Because a BST subtree always covers a contiguous id range, a single
//! segment-tree range query prices any subtree, real or hypothetical.
//!
//! # Wiring
//!
//! The tree is the single source of truth. Every rewired child slot produces
//! an [`EdgeChange`] that the caller forwards to a [`WiringLayer`]; the
//! [`WiringMirror`] replays them so the two views can be cross-checked.

mod error;
mod node;
mod tree;
mod weight;
mod wiring;

pub use error::{Result, TopologyError};
pub use node::{Links, NodeId, Side};
pub use tree::Tree;
pub use weight::WeightTree;
pub use wiring::{EdgeChange, NullWiring, WiringLayer, WiringMirror};
