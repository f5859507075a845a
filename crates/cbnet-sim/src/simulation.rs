//! Round-based message simulation with event recording.

use std::collections::{HashSet, VecDeque};

use cbnet_controller::{Controller, ControllerConfig, RoundReport};
use cbnet_topology::{NodeId, WiringLayer};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::events::{MessageId, SimEvent};
use crate::workload::Workload;

/// Configuration for the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of network nodes
    pub nodes: usize,
    /// Initial parent list; empty for a balanced tree
    pub edges: Vec<usize>,
    /// Seed for deterministic traffic
    pub seed: u64,
    /// Messages to generate
    pub messages: usize,
    pub workload: Workload,
    /// Give up after this many rounds
    pub max_rounds: u64,
    /// Keep every event, not just the counters
    pub record_timeline: bool,
    /// Rotation and drain settings; its node count and edges are overridden
    pub controller: ControllerConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            nodes: 128,
            edges: Vec::new(),
            seed: 42,
            messages: 1000,
            workload: Workload::Uniform,
            max_rounds: 100_000,
            record_timeline: true,
            controller: ControllerConfig::default(),
        }
    }
}

/// Counters for a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimStats {
    pub rounds: u64,
    pub injected: u64,
    pub delivered: u64,
    /// Hops over all delivered messages
    pub total_hops: u64,
    /// Rounds from injection to delivery, summed over delivered messages
    pub total_latency: u64,
    pub rotations: u64,
    pub directives: u64,
    pub deferred: u64,
}

impl SimStats {
    pub fn average_hops(&self) -> f64 {
        if self.delivered == 0 {
            0.0
        } else {
            self.total_hops as f64 / self.delivered as f64
        }
    }

    pub fn average_latency(&self) -> f64 {
        if self.delivered == 0 {
            0.0
        } else {
            self.total_latency as f64 / self.delivered as f64
        }
    }
}

/// A message somewhere in the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub src: NodeId,
    pub dst: NodeId,
    /// Node currently holding the message
    pub at: NodeId,
    /// Hops left on the current directive
    pub remaining: usize,
    /// Hops taken so far
    pub hops: usize,
    pub injected: u64,
}

/// Drives a [`Controller`] with generated traffic and records what happens.
pub struct Simulation {
    config: SimulationConfig,
    controller: Controller,
    /// Messages waiting at their source, one queue per node
    queues: Vec<VecDeque<Message>>,
    in_flight: Vec<Message>,
    events: Vec<SimEvent>,
    stats: SimStats,
}

impl Simulation {
    /// Create a simulation with traffic drawn from the configured workload.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let traffic = config.workload.generate(config.nodes, config.messages, &mut rng);
        Self::with_traffic(config, traffic)
    }

    /// Create a simulation with explicit (src, dst) pairs, queued in order.
    pub fn with_traffic(config: SimulationConfig, traffic: Vec<(NodeId, NodeId)>) -> Result<Self> {
        let controller_config = ControllerConfig {
            nodes: config.nodes,
            edges: config.edges.clone(),
            ..config.controller.clone()
        };
        let controller = Controller::new(controller_config)?;

        let mut queues = vec![VecDeque::new(); config.nodes];
        for (seq, (src, dst)) in traffic.into_iter().enumerate() {
            let Some(queue) = src.checked_index().and_then(|i| queues.get_mut(i)) else {
                return Err(cbnet_controller::Error::UnknownNode(src).into());
            };
            queue.push_back(Message {
                id: MessageId(seq as u64),
                src,
                dst,
                at: src,
                remaining: 0,
                hops: 0,
                injected: 0,
            });
        }

        Ok(Self {
            config,
            controller,
            queues,
            in_flight: Vec::new(),
            events: Vec::new(),
            stats: SimStats::default(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn in_flight(&self) -> &[Message] {
        &self.in_flight
    }

    /// Messages not yet injected.
    pub fn queued(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// True once every message has been delivered.
    pub fn is_finished(&self) -> bool {
        self.in_flight.is_empty() && self.queued() == 0
    }

    /// Run rounds until every message is delivered.
    pub fn run(&mut self) -> Result<SimStats> {
        while !self.is_finished() {
            if self.stats.rounds >= self.config.max_rounds {
                return Err(Error::Stalled {
                    round: self.stats.rounds,
                    in_flight: self.in_flight.len() + self.queued(),
                });
            }
            self.step()?;
        }

        info!(
            rounds = self.stats.rounds,
            delivered = self.stats.delivered,
            rotations = self.stats.rotations,
            average_hops = self.stats.average_hops(),
            "simulation finished"
        );
        Ok(self.stats.clone())
    }

    /// Run one round: inject, report, let the controller decide, move.
    pub fn step(&mut self) -> Result<()> {
        let round = self.controller.round() + 1;
        self.inject(round)?;

        for message in &self.in_flight {
            if message.remaining > 0 {
                self.controller
                    .report_routing_info(message.at, message.dst, message.remaining)?;
            } else {
                self.controller.report_has_message(message.at, message.dst)?;
            }
        }

        let report = self.controller.step()?;
        self.record_report(&report);
        self.assign(&report);
        self.advance(round)?;

        self.stats.rounds += 1;
        self.record(SimEvent::RoundCompleted {
            round,
            in_flight: self.in_flight.len(),
            delivered: self.stats.delivered,
        });
        info!(
            round,
            in_flight = self.in_flight.len(),
            delivered = self.stats.delivered,
            rotations = report.rotations.len(),
            "round complete"
        );
        Ok(())
    }

    /// Cross-check the controller's wiring mirror against its tree.
    pub fn verify(&self) -> Result<()> {
        self.controller
            .wiring()
            .verify(self.controller.tree())
            .map_err(|e| Error::Controller(e.into()))
    }

    /// The recorded timeline, one JSON object per event.
    pub fn timeline_json(&self) -> Result<Vec<String>> {
        self.events
            .iter()
            .map(|event| serde_json::to_string(event).map_err(Error::from))
            .collect()
    }

    /// Release the head of every source queue whose node holds nothing.
    fn inject(&mut self, round: u64) -> Result<()> {
        let occupied: HashSet<NodeId> = self.in_flight.iter().map(|m| m.at).collect();

        for (index, queue) in self.queues.iter_mut().enumerate() {
            if occupied.contains(&NodeId::from_index(index)) {
                continue;
            }
            let Some(mut message) = queue.pop_front() else {
                continue;
            };

            self.controller.message_received(message.src, message.dst)?;
            message.injected = round;
            self.stats.injected += 1;
            if self.config.record_timeline {
                self.events.push(SimEvent::MessageInjected {
                    message: message.id,
                    src: message.src,
                    dst: message.dst,
                    round,
                });
            }
            self.in_flight.push(message);
        }
        Ok(())
    }

    fn record_report(&mut self, report: &RoundReport) {
        self.stats.rotations += report.rotations.len() as u64;
        self.stats.directives += report.directives.len() as u64;
        self.stats.deferred += report.deferred.len() as u64;

        if !self.config.record_timeline {
            return;
        }
        for record in &report.rotations {
            let p = record.participants;
            self.events.push(SimEvent::RotationApplied {
                rotation: record.rotation.label().to_string(),
                x: p.x,
                y: p.y,
                z: p.z,
                delta: record.delta,
                round: report.round,
            });
        }
        for directive in &report.directives {
            self.events.push(SimEvent::DirectiveIssued {
                node: directive.node,
                next: directive.next,
                hops: directive.hops,
                round: report.round,
            });
        }
        for deferred in &report.deferred {
            self.events.push(SimEvent::HopDeferred {
                node: deferred.node,
                dst: deferred.dst,
                round: report.round,
            });
        }
    }

    /// Hand each directive to a waiting message at its node.
    fn assign(&mut self, report: &RoundReport) {
        for directive in &report.directives {
            let waiting = self
                .in_flight
                .iter_mut()
                .find(|m| m.at == directive.node && m.dst == directive.dst && m.remaining == 0);
            match waiting {
                Some(message) => message.remaining = directive.hops,
                None => debug!(node = %directive.node, "directive without a waiting message"),
            }
        }
    }

    /// Move every forwarding message one hop and deliver arrivals.
    fn advance(&mut self, round: u64) -> Result<()> {
        let tree = self.controller.tree();
        for message in self.in_flight.iter_mut().filter(|m| m.remaining > 0) {
            match tree.routing_node(message.at, message.dst) {
                Some(next) if next != message.at => {
                    message.at = next;
                    message.hops += 1;
                    message.remaining -= 1;
                }
                _ => message.remaining = 0,
            }
        }

        let (arrived, moving): (Vec<Message>, Vec<Message>) = std::mem::take(&mut self.in_flight)
            .into_iter()
            .partition(|m| m.at == m.dst);
        self.in_flight = moving;

        for message in arrived {
            self.controller.message_completed(message.src, message.dst)?;
            let latency = round - message.injected + 1;
            self.stats.delivered += 1;
            self.stats.total_hops += message.hops as u64;
            self.stats.total_latency += latency;
            self.record(SimEvent::MessageDelivered {
                message: message.id,
                src: message.src,
                dst: message.dst,
                hops: message.hops,
                latency,
                round,
            });
        }
        Ok(())
    }

    fn record(&mut self, event: SimEvent) {
        if self.config.record_timeline {
            self.events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(nodes: usize, messages: usize) -> SimulationConfig {
        SimulationConfig {
            nodes,
            messages,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn uniform_traffic_is_fully_delivered() {
        let mut sim = Simulation::new(config(31, 200)).unwrap();
        let stats = sim.run().unwrap();

        assert_eq!(stats.injected, 200);
        assert_eq!(stats.delivered, 200);
        assert!(sim.is_finished());
        assert_eq!(sim.controller().weights().total(), 400);
        sim.verify().unwrap();
    }

    #[test]
    fn repeated_far_pair_triggers_rotations() {
        let traffic = (0..60)
            .map(|i| {
                if i % 2 == 0 {
                    (NodeId(1), NodeId(63))
                } else {
                    (NodeId(63), NodeId(1))
                }
            })
            .collect();
        let mut sim = Simulation::with_traffic(config(63, 0), traffic).unwrap();
        let stats = sim.run().unwrap();

        assert_eq!(stats.delivered, 60);
        assert!(stats.rotations > 0);
        sim.verify().unwrap();

        // The pair ends up closer than the ten hops of the balanced tree
        let tree = sim.controller().tree();
        assert!(tree.distance(NodeId(1), NodeId(63)) < 10);
    }

    #[test]
    fn round_limit_reports_stall() {
        let mut sim = Simulation::new(SimulationConfig {
            max_rounds: 1,
            ..config(63, 50)
        })
        .unwrap();

        assert!(matches!(sim.run(), Err(Error::Stalled { round: 1, .. })));
    }

    #[test]
    fn same_seed_same_timeline() {
        let run = || {
            let mut sim = Simulation::new(config(15, 40)).unwrap();
            sim.run().unwrap();
            sim.events().to_vec()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn timeline_can_be_disabled() {
        let mut sim = Simulation::new(SimulationConfig {
            record_timeline: false,
            ..config(15, 20)
        })
        .unwrap();
        sim.run().unwrap();
        assert_eq!(sim.event_count(), 0);
        assert_eq!(sim.stats().delivered, 20);
    }

    #[test]
    fn traffic_to_unknown_nodes_is_rejected() {
        let result = Simulation::with_traffic(config(7, 0), vec![(NodeId(9), NodeId(1))]);
        assert!(matches!(
            result,
            Err(Error::Controller(cbnet_controller::Error::UnknownNode(_)))
        ));
    }
}
