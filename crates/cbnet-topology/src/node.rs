//! Node identifiers and per-node links.
//!
//! Network ids are 1-based. A tree over `n` nodes uses ids `1..=n` for the
//! addressable nodes and `n + 1` for the synthetic super-root that holds the
//! real root as its left child. Absent links are `None`.

use std::fmt;
use std::ops::Not;

/// A 1-based network node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub usize);

impl NodeId {
    /// Create from a raw network id.
    #[inline]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw network id.
    #[inline]
    pub const fn value(&self) -> usize {
        self.0
    }

    /// Zero-based slot of this id, used by the arena and the weight index.
    ///
    /// `NodeId(0)` has no slot; use [`NodeId::checked_index`] for unchecked input.
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 - 1
    }

    /// Zero-based slot, or `None` for `NodeId(0)`.
    #[inline]
    pub const fn checked_index(&self) -> Option<usize> {
        self.0.checked_sub(1)
    }

    /// Id stored at a zero-based slot.
    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Self(index + 1)
    }
}

impl From<usize> for NodeId {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which child slot of a parent a node occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Side a child with id `child` takes under a parent with id `parent`.
    #[inline]
    pub fn of(parent: NodeId, child: NodeId) -> Self {
        if child < parent {
            Side::Left
        } else {
            Side::Right
        }
    }
}

impl Not for Side {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Parent and child links of one arena entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Links {
    pub parent: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
}

impl Links {
    /// Child on the given side.
    #[inline]
    pub fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Mutable slot for the child on the given side.
    #[inline]
    pub fn child_mut(&mut self, side: Side) -> &mut Option<NodeId> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}
