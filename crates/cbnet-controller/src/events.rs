//! Per-round events exchanged with the scheduler and the nodes.
//!
//! Nodes report to the controller between rounds; the controller answers
//! with [`RoutingDirective`]s. Reports are buffered in [`EventQueue`]s and
//! drained once, in a deterministic order, when the round runs.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use cbnet_topology::NodeId;

/// A node holds a message and wants a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HasMessage {
    pub node: NodeId,
    pub dst: NodeId,
}

/// A node is still executing an earlier directive and has `hops` to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoutingInfo {
    pub node: NodeId,
    pub dst: NodeId,
    pub hops: usize,
}

/// Tell `node` to forward its message `hops` times, starting toward `next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoutingDirective {
    pub node: NodeId,
    pub dst: NodeId,
    pub next: NodeId,
    pub hops: usize,
}

/// Order in which a round drains its queues.
///
/// Rotation outcomes depend on who asks first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DrainOrder {
    /// Ascending node id, then destination id, then arrival
    #[default]
    ById,
    /// Arrival order
    Arrival,
}

/// Events that can be queued for a round.
pub trait QueuedEvent {
    fn node(&self) -> NodeId;
    fn dst(&self) -> NodeId;
}

impl QueuedEvent for HasMessage {
    fn node(&self) -> NodeId {
        self.node
    }

    fn dst(&self) -> NodeId {
        self.dst
    }
}

impl QueuedEvent for RoutingInfo {
    fn node(&self) -> NodeId {
        self.node
    }

    fn dst(&self) -> NodeId {
        self.dst
    }
}

#[derive(Debug)]
struct Pending<T> {
    key: (usize, usize, u64),
    event: T,
}

impl<T> PartialEq for Pending<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Pending<T> {}

impl<T> PartialOrd for Pending<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Pending<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// Priority queue of reports waiting for the next round.
#[derive(Debug)]
pub struct EventQueue<T> {
    heap: BinaryHeap<Reverse<Pending<T>>>,
    order: DrainOrder,
    seq: u64,
}

impl<T: QueuedEvent> EventQueue<T> {
    pub fn new(order: DrainOrder) -> Self {
        Self {
            heap: BinaryHeap::new(),
            order,
            seq: 0,
        }
    }

    pub fn push(&mut self, event: T) {
        let key = match self.order {
            DrainOrder::ById => (event.node().value(), event.dst().value(), self.seq),
            DrainOrder::Arrival => (0, 0, self.seq),
        };
        self.seq += 1;
        self.heap.push(Reverse(Pending { key, event }));
    }

    pub fn pop(&mut self) -> Option<T> {
        self.heap.pop().map(|Reverse(pending)| pending.event)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
