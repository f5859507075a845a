//! Round-synchronous controller.
//!
//! Nodes report between rounds; [`Controller::step`] runs one round:
//!
//! 1. Check the tree and the wiring layer agree and satisfy the BST order.
//! 2. Release every lock from the previous round.
//! 3. Re-lock the paths of messages still executing earlier directives.
//! 4. Serve every node holding a message: rotate if the rotation pays for
//!    itself and its nodes are free, then grant hops.
//!
//! Locks make each node take part in at most one rotation or hop per round.

use cbnet_topology::{NodeId, Tree, WeightTree, WiringLayer, WiringMirror};
use tracing::{debug, trace};

use crate::arbiter::RoundArbiter;
use crate::config::ControllerConfig;
use crate::error::{Error, Result};
use crate::events::{EventQueue, HasMessage, RoutingDirective, RoutingInfo};
use crate::rotation::{RejectReason, RotationEngine, RotationOutcome, RotationRecord};
use crate::router::{self, Rotation};

/// Running totals across rounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerStats {
    pub rounds: u64,
    pub messages_received: u64,
    pub messages_completed: u64,
    pub rotations: u64,
    pub rejected_potential: u64,
    pub rejected_locked: u64,
    pub deferred: u64,
    pub directives: u64,
    /// Sum of hops over all directives
    pub hops_granted: u64,
}

/// Everything decided in one round.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoundReport {
    pub round: u64,
    pub directives: Vec<RoutingDirective>,
    pub rotations: Vec<RotationRecord>,
    /// Messages whose hop could not be locked; they ask again next round
    pub deferred: Vec<HasMessage>,
    pub rejected_potential: usize,
    pub rejected_locked: usize,
}

impl RoundReport {
    fn new(round: u64) -> Self {
        Self {
            round,
            ..Self::default()
        }
    }

    /// Directive issued to `node` this round, if any.
    pub fn directive_for(&self, node: NodeId) -> Option<&RoutingDirective> {
        self.directives.iter().find(|d| d.node == node)
    }
}

/// Owns the topology and serves routing requests one round at a time.
pub struct Controller<W: WiringLayer = WiringMirror> {
    config: ControllerConfig,
    tree: Tree,
    weights: WeightTree,
    arbiter: RoundArbiter,
    wiring: W,
    has_message: EventQueue<HasMessage>,
    routing_info: EventQueue<RoutingInfo>,
    round: u64,
    stats: ControllerStats,
}

impl Controller<WiringMirror> {
    /// Controller cross-checked against a [`WiringMirror`].
    pub fn new(config: ControllerConfig) -> Result<Self> {
        let wiring = WiringMirror::new(config.nodes);
        Self::with_wiring(config, wiring)
    }
}

impl<W: WiringLayer> Controller<W> {
    /// Build the initial tree and announce its edges to `wiring`.
    pub fn with_wiring(config: ControllerConfig, mut wiring: W) -> Result<Self> {
        let tree = Tree::from_edges(config.nodes, &config.edges)?;
        for edge in tree.edges() {
            wiring.edge_changed(&edge);
        }

        debug!(
            nodes = config.nodes,
            depth = max_depth(&tree),
            "controller initialized"
        );

        Ok(Self {
            weights: WeightTree::new(config.nodes),
            arbiter: RoundArbiter::new(config.nodes + 1),
            has_message: EventQueue::new(config.drain_order),
            routing_info: EventQueue::new(config.drain_order),
            round: 0,
            stats: ControllerStats::default(),
            tree,
            wiring,
            config,
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn weights(&self) -> &WeightTree {
        &self.weights
    }

    pub fn wiring(&self) -> &W {
        &self.wiring
    }

    /// Rounds run so far.
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    /// Reports waiting for the next round.
    pub fn pending(&self) -> usize {
        self.has_message.len() + self.routing_info.len()
    }

    /// A message from `src` to `dst` entered the network.
    pub fn message_received(&mut self, src: NodeId, dst: NodeId) -> Result<()> {
        self.check_node(src)?;
        self.check_node(dst)?;
        self.stats.messages_received += 1;
        Ok(())
    }

    /// A message from `src` reached `dst`: both endpoints gain one occurrence.
    pub fn message_completed(&mut self, src: NodeId, dst: NodeId) -> Result<()> {
        self.check_node(src)?;
        self.check_node(dst)?;
        self.weights.increment(src.index());
        self.weights.increment(dst.index());
        self.stats.messages_completed += 1;
        Ok(())
    }

    /// `node` holds a message for `dst` and waits for a directive.
    pub fn report_has_message(&mut self, node: NodeId, dst: NodeId) -> Result<()> {
        self.check_node(node)?;
        self.check_node(dst)?;
        self.has_message.push(HasMessage { node, dst });
        Ok(())
    }

    /// `node` is forwarding a message for `dst` with `hops` still to go.
    pub fn report_routing_info(&mut self, node: NodeId, dst: NodeId, hops: usize) -> Result<()> {
        self.check_node(node)?;
        self.check_node(dst)?;
        self.routing_info.push(RoutingInfo { node, dst, hops });
        Ok(())
    }

    /// Run one round over everything reported since the last one.
    pub fn step(&mut self) -> Result<RoundReport> {
        self.round += 1;
        self.stats.rounds += 1;

        self.tree.validate()?;
        self.wiring.verify(&self.tree)?;
        self.arbiter.reset();

        while let Some(info) = self.routing_info.pop() {
            let path = self.tree.path(info.node, info.dst, info.hops);
            if !self.arbiter.try_lock_path(&path) {
                return Err(Error::ProtocolViolation {
                    node: info.node,
                    dst: info.dst,
                    hops: info.hops,
                });
            }
            trace!(node = %info.node, dst = %info.dst, hops = info.hops, "in-flight path locked");
        }

        let mut report = RoundReport::new(self.round);
        while let Some(message) = self.has_message.pop() {
            self.serve(message, &mut report)?;
        }

        self.stats.directives += report.directives.len() as u64;
        self.stats.hops_granted += report.directives.iter().map(|d| d.hops as u64).sum::<u64>();
        self.stats.deferred += report.deferred.len() as u64;

        debug!(
            round = self.round,
            directives = report.directives.len(),
            rotations = report.rotations.len(),
            deferred = report.deferred.len(),
            locked = self.arbiter.locked_count(),
            "round complete"
        );
        Ok(report)
    }

    fn serve(&mut self, message: HasMessage, report: &mut RoundReport) -> Result<()> {
        let Some(rotation) = router::plan(&self.tree, message.node, message.dst)? else {
            self.advance(message, 1, report);
            return Ok(());
        };

        let outcome = RotationEngine::new(
            &mut self.tree,
            &self.weights,
            &mut self.arbiter,
            &mut self.wiring,
            self.config.epsilon,
        )
        .apply(message.node, rotation)?;

        match outcome {
            RotationOutcome::Applied(record) => {
                self.stats.rotations += 1;
                report.rotations.push(record);
                self.follow_rotation(message, rotation, report);
            }
            RotationOutcome::Rejected { reason, .. } => {
                match reason {
                    RejectReason::Potential => {
                        self.stats.rejected_potential += 1;
                        report.rejected_potential += 1;
                    }
                    RejectReason::Locked => {
                        self.stats.rejected_locked += 1;
                        report.rejected_locked += 1;
                    }
                }
                self.advance(message, self.config.fallback_hops, report);
            }
        }
        Ok(())
    }

    /// Hops granted after an applied rotation. The rotation already holds
    /// every node on these paths.
    fn follow_rotation(&mut self, message: HasMessage, rotation: Rotation, report: &mut RoundReport) {
        let HasMessage { node, dst } = message;
        let hops = match rotation {
            Rotation::ZigZigBottomUp(_) => 1,
            // The message stays where it is for this round
            Rotation::ZigZagBottomUp(_) => return,
            Rotation::ZigZigTopDown(_) => 2,
            Rotation::ZigZagTopDown(_) => {
                let next = self.tree.routing_node(node, dst);
                if next.is_some() && next == self.tree.parent(node) {
                    3
                } else {
                    1
                }
            }
        };

        let path = self.tree.path(node, dst, hops);
        if let Some(directive) = directive_along(message, &path) {
            debug!(node = %node, next = %directive.next, hops = directive.hops, "post-rotation hop");
            report.directives.push(directive);
        }
    }

    /// Lock up to `hops` hops toward the destination, or defer the message.
    fn advance(&mut self, message: HasMessage, hops: usize, report: &mut RoundReport) {
        let path = self.tree.path(message.node, message.dst, hops);
        let Some(directive) = directive_along(message, &path) else {
            return;
        };

        if self.arbiter.try_lock_path(&path) {
            debug!(node = %message.node, next = %directive.next, hops = directive.hops, "plain hop");
            report.directives.push(directive);
        } else {
            debug!(node = %message.node, dst = %message.dst, "hop deferred");
            report.deferred.push(message);
        }
    }

    fn check_node(&self, id: NodeId) -> Result<()> {
        if self.tree.is_valid_routing_target(Some(id)) {
            Ok(())
        } else {
            Err(Error::UnknownNode(id))
        }
    }
}

fn directive_along(message: HasMessage, path: &[NodeId]) -> Option<RoutingDirective> {
    let next = *path.get(1)?;
    Some(RoutingDirective {
        node: message.node,
        dst: message.dst,
        next,
        hops: path.len() - 1,
    })
}

fn max_depth(tree: &Tree) -> usize {
    tree.in_order()
        .into_iter()
        .map(|id| tree.depth(id))
        .max()
        .unwrap_or(0)
}
