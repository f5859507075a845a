//! Routing direction and rotation selection.
//!
//! A message at `x` heading for `dst` either climbs toward the root or
//! descends into one of `x`'s subtrees. Climbing messages try to lift `x`
//! two levels (bottom-up rotation); descending messages try to lift the
//! grandchild on their path (top-down rotation). Messages one hop from their
//! destination, or from the lowest common ancestor, just hop.

use cbnet_topology::{NodeId, Side, Tree};

use crate::error::{Error, Result};

/// Where a message at a node has to go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// At the destination, one hop from it, or one hop below the lowest
    /// common ancestor
    Terminal,
    /// Toward the root, past the parent
    Parent,
    /// Into the left subtree, at least two hops deep
    Left,
    /// Into the right subtree, at least two hops deep
    Right,
}

/// One of the rotation variants.
///
/// The side is always the side the middle node `y` occupies under the top
/// node `z`. Bottom-up rotations are entered from the lowest node `x`, which
/// holds the message; top-down rotations from `z`, which holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rotation {
    ZigZigBottomUp(Side),
    ZigZagBottomUp(Side),
    ZigZigTopDown(Side),
    ZigZagTopDown(Side),
}

impl Rotation {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Rotation::ZigZigBottomUp(_) => "zig-zig bottom-up",
            Rotation::ZigZagBottomUp(_) => "zig-zag bottom-up",
            Rotation::ZigZigTopDown(Side::Left) => "zig-zig left top-down",
            Rotation::ZigZigTopDown(Side::Right) => "zig-zig right top-down",
            Rotation::ZigZagTopDown(Side::Left) => "zig-zag left top-down",
            Rotation::ZigZagTopDown(Side::Right) => "zig-zag right top-down",
        }
    }

    /// Side of `y` under `z`.
    pub fn side(&self) -> Side {
        match *self {
            Rotation::ZigZigBottomUp(side)
            | Rotation::ZigZagBottomUp(side)
            | Rotation::ZigZigTopDown(side)
            | Rotation::ZigZagTopDown(side) => side,
        }
    }
}

/// Classify the next move of a message at `x` bound for `dst`.
pub fn direction(tree: &Tree, x: NodeId, dst: NodeId) -> Direction {
    if x == dst {
        return Direction::Terminal;
    }

    let Some(next) = tree.routing_node(x, dst) else {
        return Direction::Terminal;
    };
    if next == dst {
        return Direction::Terminal;
    }

    match tree.side_of(x, next) {
        Some(Side::Left) => Direction::Left,
        Some(Side::Right) => Direction::Right,
        // Climbing: the parent is the lowest common ancestor when it covers dst
        None if tree.contains(next, dst) => Direction::Terminal,
        None => Direction::Parent,
    }
}

/// Choose the rotation to attempt before advancing, `None` for a plain hop.
pub fn plan(tree: &Tree, x: NodeId, dst: NodeId) -> Result<Option<Rotation>> {
    match direction(tree, x, dst) {
        Direction::Terminal => Ok(None),
        Direction::Parent => plan_bottom_up(tree, x),
        Direction::Left | Direction::Right => plan_top_down(tree, x, dst),
    }
}

fn plan_bottom_up(tree: &Tree, x: NodeId) -> Result<Option<Rotation>> {
    let y = tree.parent(x);
    let z = y.and_then(|y| tree.parent(y));
    let (Some(y), Some(z)) = (y, z) else {
        return Ok(None);
    };
    if !tree.is_valid_routing_target(Some(y)) || !tree.is_valid_routing_target(Some(z)) {
        return Ok(None);
    }

    let x_side = tree.side_of(y, x).ok_or(Error::UnrecognizedShape { node: x })?;
    let y_side = tree.side_of(z, y).ok_or(Error::UnrecognizedShape { node: y })?;

    Ok(Some(if x_side == y_side {
        Rotation::ZigZigBottomUp(y_side)
    } else {
        Rotation::ZigZagBottomUp(y_side)
    }))
}

fn plan_top_down(tree: &Tree, x: NodeId, dst: NodeId) -> Result<Option<Rotation>> {
    let child = tree
        .routing_node(x, dst)
        .ok_or(Error::UnrecognizedShape { node: x })?;
    let grandchild = tree
        .routing_node(child, dst)
        .ok_or(Error::UnrecognizedShape { node: child })?;

    let child_side = tree.side_of(x, child).ok_or(Error::UnrecognizedShape { node: x })?;
    let grandchild_side = tree
        .side_of(child, grandchild)
        .ok_or(Error::UnrecognizedShape { node: child })?;

    Ok(Some(if child_side == grandchild_side {
        Rotation::ZigZigTopDown(child_side)
    } else {
        Rotation::ZigZagTopDown(child_side)
    }))
}
