//! Potential-gated rotations.
//!
//! Every rotation is priced before anything is touched. The rank of a
//! subtree is `log2` of its weight; a rotation is applied only when the sum
//! of ranks over its participants drops by more than `|epsilon|` and the
//! arbiter grants every participant for the round. Either the whole rotation
//! happens or nothing does.
//!
//! Naming follows the classic splay picture: `x` is the lowest of the three
//! rotated nodes, `y` its parent, `z` its grandparent and `w` the node above
//! `z`. `side` is always the side of `y` under `z`.

use cbnet_topology::{NodeId, Side, Tree, WeightTree, WiringLayer};
use tracing::debug;

use crate::arbiter::RoundArbiter;
use crate::error::{Error, Result};
use crate::router::Rotation;

/// Rank of a subtree weight; zero for an empty subtree.
#[inline]
pub fn rank(weight: u64) -> f64 {
    if weight == 0 {
        0.0
    } else {
        (weight as f64).log2()
    }
}

/// Nodes touched by a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Participants {
    pub w: NodeId,
    pub z: NodeId,
    pub y: NodeId,
    pub x: NodeId,
    /// Zig-zag only: the child of `x` on `side`
    pub b: Option<NodeId>,
    /// Zig-zig: child of `y` opposite `side`. Zig-zag: child of `x` opposite `side`.
    pub c: Option<NodeId>,
}

impl Participants {
    fn lock_set(&self) -> [Option<NodeId>; 6] {
        [
            Some(self.w),
            Some(self.z),
            Some(self.y),
            Some(self.x),
            self.b,
            self.c,
        ]
    }
}

/// An applied rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RotationRecord {
    pub rotation: Rotation,
    pub participants: Participants,
    pub delta: f64,
}

/// Why a priced rotation was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RejectReason {
    /// Rank delta not below epsilon
    Potential,
    /// A participant was already held this round
    Locked,
}

/// Result of attempting a rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotationOutcome {
    Applied(RotationRecord),
    Rejected {
        rotation: Rotation,
        reason: RejectReason,
        delta: f64,
    },
}

impl RotationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RotationOutcome::Applied(_))
    }
}

/// Prices and applies rotations against borrowed controller state.
pub struct RotationEngine<'a> {
    tree: &'a mut Tree,
    weights: &'a WeightTree,
    arbiter: &'a mut RoundArbiter,
    wiring: &'a mut dyn WiringLayer,
    epsilon: f64,
}

impl<'a> RotationEngine<'a> {
    pub fn new(
        tree: &'a mut Tree,
        weights: &'a WeightTree,
        arbiter: &'a mut RoundArbiter,
        wiring: &'a mut dyn WiringLayer,
        epsilon: f64,
    ) -> Self {
        Self {
            tree,
            weights,
            arbiter,
            wiring,
            epsilon,
        }
    }

    /// Attempt `rotation` for the message held at `node`.
    ///
    /// `node` is `x` for bottom-up rotations and `z` for top-down ones.
    pub fn apply(&mut self, node: NodeId, rotation: Rotation) -> Result<RotationOutcome> {
        match rotation {
            Rotation::ZigZigBottomUp(_) => self.zig_zig_bottom_up(node),
            Rotation::ZigZagBottomUp(_) => self.zig_zag_bottom_up(node),
            Rotation::ZigZigTopDown(side) => self.zig_zig_top_down(node, side),
            Rotation::ZigZagTopDown(side) => self.zig_zag_top_down(node, side),
        }
    }

    /// Lift `x`'s parent over its grandparent, all three on one line.
    pub fn zig_zig_bottom_up(&mut self, x: NodeId) -> Result<RotationOutcome> {
        let y = self.parent_of(x)?;
        let z = self.parent_of(y)?;
        let side = self.side_under(z, y)?;
        if self.side_under(y, x)? != side {
            return Err(Error::UnrecognizedShape { node: x });
        }

        let participants = Participants {
            w: self.parent_of(z)?,
            z,
            y,
            x,
            b: None,
            c: self.tree.child(y, !side),
        };
        self.zig_zig(Rotation::ZigZigBottomUp(side), participants, side)
    }

    /// Lift `x` over its parent and grandparent when they bend.
    pub fn zig_zag_bottom_up(&mut self, x: NodeId) -> Result<RotationOutcome> {
        let y = self.parent_of(x)?;
        let z = self.parent_of(y)?;
        let side = self.side_under(z, y)?;
        if self.side_under(y, x)? != !side {
            return Err(Error::UnrecognizedShape { node: x });
        }

        let participants = Participants {
            w: self.parent_of(z)?,
            z,
            y,
            x,
            b: self.tree.child(x, side),
            c: self.tree.child(x, !side),
        };
        self.zig_zag(Rotation::ZigZagBottomUp(side), participants, side)
    }

    /// Lift `z`'s `side` child over `z`, with the grandchild on the same side.
    pub fn zig_zig_top_down(&mut self, z: NodeId, side: Side) -> Result<RotationOutcome> {
        let y = self.child_of(z, side)?;
        let x = self.child_of(y, side)?;

        let participants = Participants {
            w: self.parent_of(z)?,
            z,
            y,
            x,
            b: None,
            c: self.tree.child(y, !side),
        };
        self.zig_zig(Rotation::ZigZigTopDown(side), participants, side)
    }

    /// Lift the grandchild of `z` that bends away from `side` over both.
    pub fn zig_zag_top_down(&mut self, z: NodeId, side: Side) -> Result<RotationOutcome> {
        let y = self.child_of(z, side)?;
        let x = self.child_of(y, !side)?;

        let participants = Participants {
            w: self.parent_of(z)?,
            z,
            y,
            x,
            b: self.tree.child(x, side),
            c: self.tree.child(x, !side),
        };
        self.zig_zag(Rotation::ZigZagTopDown(side), participants, side)
    }

    fn zig_zig(&mut self, rotation: Rotation, p: Participants, side: Side) -> Result<RotationOutcome> {
        let tree = &*self.tree;
        let old = rank(tree.weight(self.weights, Some(p.y))) + rank(tree.weight(self.weights, Some(p.z)));
        let new_z = tree.hypothetical_weight(self.weights, p.z, p.c, side);
        let new_y = tree.weight(self.weights, Some(p.z));
        let delta = rank(new_z) + rank(new_y) - old;

        let z_side = self.side_under(p.w, p.z)?;
        if let Some(rejected) = self.gate(rotation, &p, delta) {
            return Ok(rejected);
        }

        self.rewire(p.z, side, p.c);
        self.rewire(p.y, !side, Some(p.z));
        self.rewire(p.w, z_side, Some(p.y));

        Ok(self.applied(rotation, p, delta))
    }

    fn zig_zag(&mut self, rotation: Rotation, p: Participants, side: Side) -> Result<RotationOutcome> {
        let tree = &*self.tree;
        let old = rank(tree.weight(self.weights, Some(p.x)))
            + rank(tree.weight(self.weights, Some(p.y)))
            + rank(tree.weight(self.weights, Some(p.z)));
        let new_y = tree.hypothetical_weight(self.weights, p.y, p.b, !side);
        let new_z = tree.hypothetical_weight(self.weights, p.z, p.c, side);
        let new_x = tree.weight(self.weights, Some(p.z));
        let delta = rank(new_x) + rank(new_y) + rank(new_z) - old;

        let z_side = self.side_under(p.w, p.z)?;
        if let Some(rejected) = self.gate(rotation, &p, delta) {
            return Ok(rejected);
        }

        self.rewire(p.y, !side, p.b);
        self.rewire(p.x, side, Some(p.y));
        self.rewire(p.z, side, p.c);
        self.rewire(p.x, !side, Some(p.z));
        self.rewire(p.w, z_side, Some(p.x));

        Ok(self.applied(rotation, p, delta))
    }

    /// Potential test first, then the all-or-nothing lock.
    fn gate(&mut self, rotation: Rotation, p: &Participants, delta: f64) -> Option<RotationOutcome> {
        let reason = if delta >= self.epsilon {
            RejectReason::Potential
        } else if !self.arbiter.try_lock(p.lock_set()) {
            RejectReason::Locked
        } else {
            return None;
        };

        debug!(
            rotation = rotation.label(),
            node = %p.x,
            delta,
            ?reason,
            "rotation rejected"
        );
        Some(RotationOutcome::Rejected {
            rotation,
            reason,
            delta,
        })
    }

    fn applied(&self, rotation: Rotation, participants: Participants, delta: f64) -> RotationOutcome {
        debug!(
            rotation = rotation.label(),
            x = %participants.x,
            y = %participants.y,
            z = %participants.z,
            delta,
            "rotation applied"
        );
        RotationOutcome::Applied(RotationRecord {
            rotation,
            participants,
            delta,
        })
    }

    fn rewire(&mut self, parent: NodeId, side: Side, child: Option<NodeId>) {
        let change = self.tree.set_child(parent, side, child);
        self.wiring.edge_changed(&change);
    }

    fn parent_of(&self, id: NodeId) -> Result<NodeId> {
        self.tree
            .parent(id)
            .ok_or(Error::UnrecognizedShape { node: id })
    }

    fn child_of(&self, id: NodeId, side: Side) -> Result<NodeId> {
        self.tree
            .child(id, side)
            .ok_or(Error::UnrecognizedShape { node: id })
    }

    fn side_under(&self, parent: NodeId, child: NodeId) -> Result<Side> {
        self.tree
            .side_of(parent, child)
            .ok_or(Error::UnrecognizedShape { node: child })
    }
}
