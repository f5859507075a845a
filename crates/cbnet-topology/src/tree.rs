//! Binary-search-tree topology over a fixed node set.
//!
//! The tree owns every node in a single arena indexed by `NodeId::index()`.
//! Slot `n` holds the super-root, whose left child is the real root. Links are
//! plain ids, so rotations only rewrite a handful of `Option<NodeId>` fields.
//!
//! Subtree ranges are computed from the current shape on every query: the
//! minimum id of a subtree is the end of its left spine and the maximum the
//! end of its right spine. Nothing is cached, so a rotation can never leave a
//! stale range behind.

use tracing::warn;

use crate::error::{Result, TopologyError};
use crate::node::{Links, NodeId, Side};
use crate::weight::WeightTree;
use crate::wiring::EdgeChange;

/// Arena binary-search tree over ids `1..=n` plus the super-root `n + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tree {
    nodes: Vec<Links>,
    size: usize,
}

impl Tree {
    fn empty(size: usize) -> Self {
        Self {
            nodes: vec![Links::default(); size + 1],
            size,
        }
    }

    /// Build a balanced tree over `1..=size` by recursive median split.
    ///
    /// ```
    /// use cbnet_topology::{NodeId, Tree};
    ///
    /// let tree = Tree::balanced(7);
    /// assert_eq!(tree.root(), Some(NodeId(4)));
    /// assert_eq!(tree.left(NodeId(4)), Some(NodeId(2)));
    /// assert_eq!(tree.right(NodeId(4)), Some(NodeId(6)));
    /// ```
    pub fn balanced(size: usize) -> Self {
        let mut tree = Self::empty(size);
        let root = tree.build_balanced(1, size);
        let super_root = tree.super_root();
        tree.set_child(super_root, Side::Left, root);
        tree
    }

    fn build_balanced(&mut self, min: usize, max: usize) -> Option<NodeId> {
        if min > max {
            return None;
        }

        let middle = NodeId((min + max) / 2);
        let left = self.build_balanced(min, middle.value() - 1);
        let right = self.build_balanced(middle.value() + 1, max);

        self.set_child(middle, Side::Left, left);
        self.set_child(middle, Side::Right, right);

        Some(middle)
    }

    /// Build a tree from an edge list where `edges[i]` is the parent of node
    /// `i + 1` and `size + 1` names the super-root.
    ///
    /// A list whose length differs from `size` is ignored and a balanced tree
    /// is built instead. A list of the right length is applied verbatim and
    /// must describe a single connected binary-search tree.
    pub fn from_edges(size: usize, edges: &[usize]) -> Result<Self> {
        if edges.len() != size {
            if !edges.is_empty() {
                warn!(
                    expected = size,
                    got = edges.len(),
                    "edge list length mismatch, building balanced tree"
                );
            }
            return Ok(Self::balanced(size));
        }

        let mut tree = Self::empty(size);
        for (i, &parent) in edges.iter().enumerate() {
            let child = NodeId::from_index(i);
            let invalid = |reason: String| TopologyError::InvalidEdgeList { node: child, reason };

            if parent == 0 || parent > size + 1 {
                return Err(invalid(format!("parent {} out of range", parent)));
            }
            let parent = NodeId(parent);
            if parent == child {
                return Err(invalid("node is its own parent".into()));
            }

            let side = Side::of(parent, child);
            if let Some(existing) = tree.child(parent, side) {
                return Err(invalid(format!(
                    "{:?} slot of {} already holds {}",
                    side, parent, existing
                )));
            }
            tree.set_child(parent, side, Some(child));
        }

        tree.validate().map_err(|e| match e {
            TopologyError::InvariantViolation { node, reason } => {
                TopologyError::InvalidEdgeList { node, reason }
            }
            other => other,
        })?;

        Ok(tree)
    }

    /// Number of addressable nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// True when the tree holds no addressable node.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The synthetic node holding the root as its left child.
    #[inline]
    pub fn super_root(&self) -> NodeId {
        NodeId(self.size + 1)
    }

    /// The real root, if the tree is not empty.
    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.nodes[self.size].left
    }

    /// True for `1..=n + 1`.
    #[inline]
    pub fn is_known(&self, id: NodeId) -> bool {
        id.value() >= 1 && id.value() <= self.size + 1
    }

    /// True for an addressable node; false for `None` and the super-root.
    #[inline]
    pub fn is_valid_routing_target(&self, id: Option<NodeId>) -> bool {
        matches!(id, Some(id) if id.value() >= 1 && id.value() <= self.size)
    }

    /// Links of a node.
    ///
    /// Panics if `id` is not known to the tree; callers taking ids from
    /// outside check [`Tree::is_known`] first.
    #[inline]
    pub fn links(&self, id: NodeId) -> &Links {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.links(id).parent
    }

    #[inline]
    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        self.links(id).left
    }

    #[inline]
    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        self.links(id).right
    }

    #[inline]
    pub fn child(&self, id: NodeId, side: Side) -> Option<NodeId> {
        self.links(id).child(side)
    }

    /// Side `child` occupies under `parent`, or `None` if it is not a child.
    pub fn side_of(&self, parent: NodeId, child: NodeId) -> Option<Side> {
        let links = self.links(parent);
        if links.left == Some(child) {
            Some(Side::Left)
        } else if links.right == Some(child) {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// Smallest id in the subtree rooted at `id`.
    pub fn min_id(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(left) = self.left(current) {
            current = left;
        }
        current
    }

    /// Largest id in the subtree rooted at `id`.
    pub fn max_id(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(right) = self.right(current) {
            current = right;
        }
        current
    }

    /// True if `target` lies in the subtree rooted at `id`.
    pub fn contains(&self, id: NodeId, target: NodeId) -> bool {
        self.min_id(id) <= target && target <= self.max_id(id)
    }

    /// Number of edges between `id` and the root.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if parent == self.super_root() {
                break;
            }
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Rewire the `side` child of `parent` to `child`.
    ///
    /// The new child's parent pointer follows; the replaced child is detached
    /// only if it still points back at `parent`. Returns the change so the
    /// caller can forward it to the wiring layer.
    pub fn set_child(&mut self, parent: NodeId, side: Side, child: Option<NodeId>) -> EdgeChange {
        let previous = std::mem::replace(self.nodes[parent.index()].child_mut(side), child);

        if let Some(old) = previous {
            let still_child = child == Some(old) || self.nodes[parent.index()].child(!side) == Some(old);
            if !still_child && self.nodes[old.index()].parent == Some(parent) {
                self.nodes[old.index()].parent = None;
            }
        }
        if let Some(new) = child {
            self.nodes[new.index()].parent = Some(parent);
        }

        EdgeChange {
            parent,
            side,
            previous,
            child,
        }
    }

    /// Every current edge as an addition, super-root edge first.
    pub fn edges(&self) -> Vec<EdgeChange> {
        let mut edges = Vec::with_capacity(self.size);
        let mut stack = vec![self.super_root()];

        while let Some(id) = stack.pop() {
            for side in [Side::Right, Side::Left] {
                if let Some(child) = self.child(id, side) {
                    edges.push(EdgeChange {
                        parent: id,
                        side,
                        previous: None,
                        child: Some(child),
                    });
                    stack.push(child);
                }
            }
        }

        edges
    }

    /// Subtree weight of `id`, zero for an absent subtree.
    pub fn weight(&self, weights: &WeightTree, id: Option<NodeId>) -> u64 {
        match id {
            Some(id) => self.range_weight(weights, self.min_id(id), self.max_id(id)),
            None => 0,
        }
    }

    /// Weight `id` would have if `candidate` replaced its `side` subtree.
    ///
    /// Priced with a single range query: the boundary on `side` extends to
    /// the candidate's own extreme, or collapses to `id` when the candidate
    /// is absent.
    pub fn hypothetical_weight(
        &self,
        weights: &WeightTree,
        id: NodeId,
        candidate: Option<NodeId>,
        side: Side,
    ) -> u64 {
        let (min, max) = match side {
            Side::Left => (candidate.map_or(id, |c| self.min_id(c)), self.max_id(id)),
            Side::Right => (self.min_id(id), candidate.map_or(id, |c| self.max_id(c))),
        };
        self.range_weight(weights, min, max)
    }

    fn range_weight(&self, weights: &WeightTree, min: NodeId, max: NodeId) -> u64 {
        // The super-root carries no counter
        let max = max.min(NodeId(self.size));
        if min > max {
            return 0;
        }
        weights.range_sum(min.index(), max.index())
    }

    /// Next hop from `from` toward `dst`.
    ///
    /// Returns `from` itself when already there, the child whose subtree
    /// holds `dst`, or the parent otherwise. `None` only when `from` has no
    /// parent to climb to.
    pub fn routing_node(&self, from: NodeId, dst: NodeId) -> Option<NodeId> {
        if from == dst {
            return Some(from);
        }

        let links = self.links(from);
        for child in [links.left, links.right].into_iter().flatten() {
            if self.contains(child, dst) {
                return Some(child);
            }
        }

        links.parent
    }

    /// Nodes visited by up to `hops` routing steps from `from` toward `dst`,
    /// starting with `from` itself.
    pub fn path(&self, from: NodeId, dst: NodeId, hops: usize) -> Vec<NodeId> {
        let mut path = Vec::with_capacity(hops.min(self.size) + 1);
        let mut current = from;
        path.push(current);

        for _ in 0..hops {
            match self.routing_node(current, dst) {
                Some(next) if next != current => {
                    path.push(next);
                    current = next;
                }
                _ => break,
            }
        }

        path
    }

    /// Number of hops between two nodes along the tree.
    pub fn distance(&self, from: NodeId, dst: NodeId) -> usize {
        let mut hops = 0;
        let mut current = from;
        while let Some(next) = self.routing_node(current, dst) {
            if next == current {
                break;
            }
            current = next;
            hops += 1;
        }
        hops
    }

    /// Ids in symmetric order.
    pub fn in_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.size);
        let mut stack = Vec::new();
        let mut current = self.root();

        while current.is_some() || !stack.is_empty() {
            while let Some(id) = current {
                stack.push(id);
                current = self.left(id);
            }
            if let Some(id) = stack.pop() {
                out.push(id);
                current = self.right(id);
            }
        }

        out
    }

    /// Check the binary-search-tree invariant and link consistency.
    ///
    /// Every node reachable from the root must lie inside the id window its
    /// ancestors imply, point back at its parent, and every addressable node
    /// must be reachable exactly once.
    pub fn validate(&self) -> Result<()> {
        let super_root = self.super_root();
        let violation = |node: NodeId, reason: String| {
            Err(TopologyError::InvariantViolation { node, reason })
        };

        if self.nodes[self.size].right.is_some() {
            return violation(super_root, "super-root has a right child".into());
        }

        let mut reached = vec![false; self.size];
        let mut seen = 0usize;
        let mut stack = Vec::new();
        if let Some(root) = self.root() {
            stack.push((root, super_root, 1usize, self.size));
        }

        while let Some((id, parent, min, max)) = stack.pop() {
            if id.value() < min || id.value() > max {
                return violation(id, format!("id outside window [{}, {}]", min, max));
            }
            if self.parent(id) != Some(parent) {
                return violation(id, format!("parent pointer does not reference {}", parent));
            }

            if reached[id.index()] {
                return violation(id, "reached twice".into());
            }
            reached[id.index()] = true;
            seen += 1;

            if let Some(left) = self.left(id) {
                stack.push((left, id, min, id.value() - 1));
            }
            if let Some(right) = self.right(id) {
                stack.push((right, id, id.value() + 1, max));
            }
        }

        if seen != self.size {
            let missing = reached
                .iter()
                .position(|&r| !r)
                .map_or(super_root, NodeId::from_index);
            return violation(missing, "node unreachable from root".into());
        }

        Ok(())
    }
}
