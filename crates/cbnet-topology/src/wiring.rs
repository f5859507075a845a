//! Edge-change notifications for the physical wiring layer.
//!
//! The logical [`Tree`] is the single source of truth. Whatever mirrors it
//! physically (switch ports, a GUI, a test double) subscribes through
//! [`WiringLayer`] and is told about every edge the tree gains or loses.
//!
//! [`WiringMirror`] is the reference subscriber: it replays the
//! notifications into its own link table so the controller can cross-check
//! both views at the start of every round.

use crate::error::{Result, TopologyError};
use crate::node::{Links, NodeId, Side};
use crate::tree::Tree;

/// One rewired child slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeChange {
    /// Node whose child slot changed
    pub parent: NodeId,
    /// Which slot
    pub side: Side,
    /// Child held before the change
    pub previous: Option<NodeId>,
    /// Child held after the change; `None` removes the edge
    pub child: Option<NodeId>,
}

impl EdgeChange {
    /// True if the change only removes an edge.
    pub fn is_removal(&self) -> bool {
        self.child.is_none() && self.previous.is_some()
    }
}

/// Subscriber notified of every edge change in the tree.
pub trait WiringLayer {
    /// Called once per rewired child slot, in application order.
    fn edge_changed(&mut self, change: &EdgeChange);

    /// Cross-check this layer's view against the logical tree.
    ///
    /// Layers that keep no state of their own accept any tree.
    fn verify(&self, _tree: &Tree) -> Result<()> {
        Ok(())
    }
}

/// A wiring layer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWiring;

impl WiringLayer for NullWiring {
    fn edge_changed(&mut self, _change: &EdgeChange) {}
}

/// Independent copy of the tree links rebuilt from notifications alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WiringMirror {
    links: Vec<Links>,
    changes: u64,
}

impl WiringMirror {
    /// Mirror for `size` nodes plus the super-root, with no edges.
    pub fn new(size: usize) -> Self {
        Self {
            links: vec![Links::default(); size + 1],
            changes: 0,
        }
    }

    /// Links the mirror currently holds for a node.
    pub fn links(&self, id: NodeId) -> &Links {
        &self.links[id.index()]
    }

    /// Number of notifications applied so far.
    pub fn change_count(&self) -> u64 {
        self.changes
    }
}

impl WiringLayer for WiringMirror {
    fn edge_changed(&mut self, change: &EdgeChange) {
        let parent = change.parent.index();
        *self.links[parent].child_mut(change.side) = change.child;

        if let Some(old) = change.previous {
            let still_child = change.child == Some(old)
                || self.links[parent].child(!change.side) == Some(old);
            if !still_child && self.links[old.index()].parent == Some(change.parent) {
                self.links[old.index()].parent = None;
            }
        }
        if let Some(new) = change.child {
            self.links[new.index()].parent = Some(change.parent);
        }

        self.changes += 1;
    }

    fn verify(&self, tree: &Tree) -> Result<()> {
        // One slot per node plus the super-root
        if self.links.len() != tree.len() + 1 {
            return Err(TopologyError::MirrorMismatch {
                node: tree.super_root(),
            });
        }
        for (index, links) in self.links.iter().enumerate() {
            let id = NodeId::from_index(index);
            if tree.links(id) != links {
                return Err(TopologyError::MirrorMismatch { node: id });
            }
        }
        Ok(())
    }
}
