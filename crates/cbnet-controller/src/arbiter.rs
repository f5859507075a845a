//! Round-scoped exclusive use of nodes.
//!
//! A physical node can take part in at most one structural change or routing
//! hop per round. The arbiter keeps one flag per arena slot (super-root
//! included) and grants a set of nodes all-or-nothing: either every node in
//! the request was free and is now held, or nothing changes.

use cbnet_topology::NodeId;

/// Per-round lock table.
#[derive(Debug, Clone)]
pub struct RoundArbiter {
    used: Vec<bool>,
}

impl RoundArbiter {
    /// Arbiter over `slots` arena slots, all free.
    pub fn new(slots: usize) -> Self {
        Self {
            used: vec![false; slots],
        }
    }

    /// Release every node. Called once at the start of a round.
    pub fn reset(&mut self) {
        self.used.fill(false);
    }

    /// True if `id` is held this round. Ids without a slot are never held.
    pub fn is_locked(&self, id: NodeId) -> bool {
        self.slot(id).is_some_and(|slot| self.used[slot])
    }

    fn slot(&self, id: NodeId) -> Option<usize> {
        id.checked_index().filter(|&slot| slot < self.used.len())
    }

    /// Number of nodes held this round.
    pub fn locked_count(&self) -> usize {
        self.used.iter().filter(|&&u| u).count()
    }

    /// Lock every present node in `nodes`, or none of them.
    ///
    /// Absent entries are skipped. Returns `false` without side effects if
    /// any present node is already held or has no slot in the table.
    pub fn try_lock<I>(&mut self, nodes: I) -> bool
    where
        I: IntoIterator<Item = Option<NodeId>>,
    {
        let slots: Option<Vec<usize>> = nodes
            .into_iter()
            .flatten()
            .map(|id| self.slot(id))
            .collect();
        let Some(slots) = slots else {
            return false;
        };

        if slots.iter().any(|&slot| self.used[slot]) {
            return false;
        }
        for slot in slots {
            self.used[slot] = true;
        }
        true
    }

    /// Lock a routing path, or none of it.
    pub fn try_lock_path(&mut self, path: &[NodeId]) -> bool {
        self.try_lock(path.iter().copied().map(Some))
    }
}
