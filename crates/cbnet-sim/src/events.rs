//! Simulation events for the recorded timeline.

use cbnet_topology::NodeId;
use serde::{Deserialize, Serialize};

/// Identifier of a simulated message, assigned in generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// Events that occur while messages cross the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimEvent {
    /// A message left its source queue
    MessageInjected {
        message: MessageId,
        src: NodeId,
        dst: NodeId,
        round: u64,
    },

    /// The controller restructured the tree
    RotationApplied {
        rotation: String,
        x: NodeId,
        y: NodeId,
        z: NodeId,
        delta: f64,
        round: u64,
    },

    /// A holder was told to forward its message
    DirectiveIssued {
        node: NodeId,
        next: NodeId,
        hops: usize,
        round: u64,
    },

    /// A holder could not lock its next hop this round
    HopDeferred {
        node: NodeId,
        dst: NodeId,
        round: u64,
    },

    /// A message reached its destination
    MessageDelivered {
        message: MessageId,
        src: NodeId,
        dst: NodeId,
        hops: usize,
        latency: u64,
        round: u64,
    },

    /// End-of-round summary
    RoundCompleted {
        round: u64,
        in_flight: usize,
        delivered: u64,
    },
}

impl SimEvent {
    /// Round the event belongs to.
    pub fn round(&self) -> u64 {
        match self {
            SimEvent::MessageInjected { round, .. }
            | SimEvent::RotationApplied { round, .. }
            | SimEvent::DirectiveIssued { round, .. }
            | SimEvent::HopDeferred { round, .. }
            | SimEvent::MessageDelivered { round, .. }
            | SimEvent::RoundCompleted { round, .. } => *round,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = SimEvent::HopDeferred {
            node: NodeId(3),
            dst: NodeId(9),
            round: 4,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"HopDeferred\""), "{json}");

        let back: SimEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.round(), 4);
    }
}
