use std::collections::HashSet;

use cbnet_controller::{
    Controller, ControllerConfig, DrainOrder, Error, Rotation, RoundReport,
};
use cbnet_topology::{EdgeChange, NodeId, Side, Tree, TopologyError, WiringLayer, WiringMirror};
use proptest::prelude::*;

fn id(raw: usize) -> NodeId {
    NodeId(raw)
}

/// Complete `count` self-addressed messages at `node`: `2 * count` occurrences.
fn heat(controller: &mut Controller, node: usize, count: usize) {
    for _ in 0..count {
        controller.message_completed(id(node), id(node)).unwrap();
    }
}

#[test]
fn completion_feeds_range_sums() {
    let mut controller = Controller::new(ControllerConfig::with_nodes(7)).unwrap();
    controller.message_completed(id(1), id(7)).unwrap();

    let weights = controller.weights();
    assert_eq!(weights.occurrences(id(1).index()), 1);
    assert_eq!(weights.occurrences(id(7).index()), 1);
    assert_eq!(weights.range_sum(0, 6), 2);
    assert_eq!(weights.range_sum(0, 3), 1);
    assert_eq!(weights.range_sum(1, 5), 0);

    let tree = controller.tree();
    assert_eq!(tree.weight(weights, Some(id(2))), 1);
    assert_eq!(tree.weight(weights, Some(id(6))), 1);
    assert_eq!(tree.weight(weights, tree.root()), 2);
}

#[test]
fn hot_leaf_is_lifted_toward_the_root() {
    let mut controller = Controller::new(ControllerConfig::with_nodes(7)).unwrap();
    heat(&mut controller, 1, 4);
    heat(&mut controller, 7, 1);

    controller.report_has_message(id(1), id(7)).unwrap();
    let report = controller.step().unwrap();

    assert_eq!(report.rotations.len(), 1);
    let record = report.rotations[0];
    assert_eq!(record.rotation, Rotation::ZigZigBottomUp(Side::Left));
    assert!((record.delta + 2.0).abs() < 1e-9, "delta {}", record.delta);

    let tree = controller.tree();
    assert_eq!(tree.root(), Some(id(2)));
    assert_eq!(tree.left(id(2)), Some(id(1)));
    assert_eq!(tree.right(id(2)), Some(id(4)));
    assert_eq!(tree.left(id(4)), Some(id(3)));
    assert_eq!(tree.right(id(4)), Some(id(6)));

    let directive = report.directive_for(id(1)).unwrap();
    assert_eq!(directive.next, id(2));
    assert_eq!(directive.hops, 1);

    controller.wiring().verify(tree).unwrap();
}

#[test]
fn cold_network_never_rotates() {
    let mut controller = Controller::new(ControllerConfig::with_nodes(7)).unwrap();
    let before = controller.tree().clone();

    controller.report_has_message(id(1), id(7)).unwrap();
    let report = controller.step().unwrap();

    assert!(report.rotations.is_empty());
    assert_eq!(report.rejected_potential, 1);
    assert_eq!(controller.tree(), &before);

    let directive = report.directive_for(id(1)).unwrap();
    assert_eq!(directive.hops, 2);
    assert_eq!(directive.next, id(2));
}

#[test]
fn busy_participant_rejects_with_locked() {
    let mut controller = Controller::new(ControllerConfig::with_nodes(7)).unwrap();
    heat(&mut controller, 1, 4);
    heat(&mut controller, 7, 1);

    // 3 is in flight through 2 to 4, holding the rotation's nodes
    controller.report_routing_info(id(3), id(5), 2).unwrap();
    controller.report_has_message(id(1), id(7)).unwrap();
    let report = controller.step().unwrap();

    assert_eq!(report.rejected_locked, 1);
    assert!(report.rotations.is_empty());
    assert_eq!(report.deferred.len(), 1);
    assert_eq!(controller.stats().rejected_locked, 1);
}

#[test]
fn overlapping_in_flight_paths_are_fatal() {
    let mut controller = Controller::new(ControllerConfig::with_nodes(7)).unwrap();
    controller.report_routing_info(id(1), id(7), 2).unwrap();
    controller.report_routing_info(id(3), id(7), 2).unwrap();

    assert_eq!(
        controller.step(),
        Err(Error::ProtocolViolation {
            node: id(3),
            dst: id(7),
            hops: 2,
        })
    );
}

#[test]
fn explicit_edge_list_is_used() {
    // Path 1 -> 2 -> 3 hanging right from the root
    let config = ControllerConfig {
        nodes: 3,
        edges: vec![4, 1, 2],
        ..ControllerConfig::default()
    };
    let controller = Controller::new(config).unwrap();
    assert_eq!(controller.tree().root(), Some(id(1)));
    assert_eq!(controller.tree().right(id(1)), Some(id(2)));
    assert_eq!(controller.tree().right(id(2)), Some(id(3)));
}

#[test]
fn corrupt_edge_list_is_rejected() {
    let config = ControllerConfig {
        nodes: 4,
        edges: vec![2, 5, 1, 2],
        ..ControllerConfig::default()
    };
    assert!(matches!(
        Controller::new(config),
        Err(Error::Topology(TopologyError::InvalidEdgeList { .. }))
    ));
}

/// Mirror that loses one notification.
struct LossyWiring {
    mirror: WiringMirror,
    drop_at: u64,
    seen: u64,
}

impl WiringLayer for LossyWiring {
    fn edge_changed(&mut self, change: &EdgeChange) {
        self.seen += 1;
        if self.seen != self.drop_at {
            self.mirror.edge_changed(change);
        }
    }

    fn verify(&self, tree: &Tree) -> cbnet_topology::Result<()> {
        self.mirror.verify(tree)
    }
}

#[test]
fn lost_wiring_update_is_caught_next_round() {
    let wiring = LossyWiring {
        mirror: WiringMirror::new(7),
        // Seven initial edges, then the first rewire
        drop_at: 8,
        seen: 0,
    };
    let mut controller = Controller::with_wiring(ControllerConfig::with_nodes(7), wiring).unwrap();
    for _ in 0..4 {
        controller.message_completed(id(1), id(1)).unwrap();
    }
    controller.message_completed(id(7), id(7)).unwrap();

    controller.report_has_message(id(1), id(7)).unwrap();
    assert_eq!(controller.step().unwrap().rotations.len(), 1);

    assert!(matches!(
        controller.step(),
        Err(Error::Topology(TopologyError::MirrorMismatch { .. }))
    ));
}

fn directive_paths(controller: &Controller, report: &RoundReport) -> Vec<Vec<NodeId>> {
    report
        .directives
        .iter()
        .map(|d| controller.tree().path(d.node, d.dst, d.hops))
        .collect()
}

#[test]
fn one_round_never_reuses_a_node() {
    let mut controller = Controller::new(ControllerConfig::with_nodes(31)).unwrap();
    for node in 1..=31 {
        heat(&mut controller, node, node % 5);
    }
    for node in 1..=31 {
        controller.report_has_message(id(node), id(32 - node)).unwrap();
    }

    let report = controller.step().unwrap();
    let mut seen = HashSet::new();
    for path in directive_paths(&controller, &report) {
        for node in path {
            assert!(seen.insert(node), "{node} used twice");
        }
    }
    assert!(report.rejected_locked > 0 || !report.deferred.is_empty());
}

#[test]
fn drain_order_is_deterministic() {
    for order in [DrainOrder::ById, DrainOrder::Arrival] {
        let run = || {
            let config = ControllerConfig {
                drain_order: order,
                ..ControllerConfig::with_nodes(15)
            };
            let mut controller = Controller::new(config).unwrap();
            heat(&mut controller, 3, 10);
            for (src, dst) in [(9, 3), (1, 14), (3, 12), (15, 2)] {
                controller.report_has_message(id(src), id(dst)).unwrap();
            }
            controller.step().unwrap()
        };
        assert_eq!(run(), run());
    }
}

#[test]
fn rejection_reasons_are_counted() {
    let mut controller = Controller::new(ControllerConfig::with_nodes(15)).unwrap();
    controller.report_has_message(id(1), id(15)).unwrap();
    controller.report_has_message(id(15), id(1)).unwrap();
    let report = controller.step().unwrap();

    assert_eq!(report.rejected_potential, 2);
    assert_eq!(controller.stats().rejected_potential, 2);
    assert_eq!(report.rejected_locked, 0);
}

#[test]
fn oversized_hop_count_locks_only_the_real_path() {
    let mut controller = Controller::new(ControllerConfig::with_nodes(7)).unwrap();
    controller.report_routing_info(id(1), id(7), 1 << 60).unwrap();
    controller.report_has_message(id(5), id(3)).unwrap();

    let report = controller.step().unwrap();
    assert_eq!(report.deferred.len(), 1);

    controller.report_routing_info(id(7), id(1), usize::MAX).unwrap();
    assert!(controller.step().is_ok());
}

#[test]
fn zig_zig_top_down_grants_two_hops() {
    let mut controller = Controller::new(ControllerConfig::with_nodes(15)).unwrap();
    heat(&mut controller, 1, 2);

    controller.report_has_message(id(8), id(1)).unwrap();
    let report = controller.step().unwrap();

    assert_eq!(report.rotations.len(), 1);
    assert_eq!(report.rotations[0].rotation, Rotation::ZigZigTopDown(Side::Left));

    let tree = controller.tree();
    assert_eq!(tree.root(), Some(id(4)));
    assert_eq!(tree.left(id(4)), Some(id(2)));
    assert_eq!(tree.right(id(4)), Some(id(8)));
    assert_eq!(tree.left(id(8)), Some(id(6)));

    // Up to the new parent, then down to 2
    let directive = report.directive_for(id(8)).unwrap();
    assert_eq!((directive.next, directive.hops), (id(4), 2));
}

fn zig_zag_top_down_from_root(dst: usize) -> RoundReport {
    let mut controller = Controller::new(ControllerConfig::with_nodes(15)).unwrap();
    heat(&mut controller, 6, 2);

    controller.report_has_message(id(8), id(dst)).unwrap();
    let report = controller.step().unwrap();

    assert_eq!(report.rotations.len(), 1);
    assert_eq!(report.rotations[0].rotation, Rotation::ZigZagTopDown(Side::Left));
    let tree = controller.tree();
    assert_eq!(tree.root(), Some(id(6)));
    assert_eq!(tree.left(id(6)), Some(id(4)));
    assert_eq!(tree.right(id(6)), Some(id(8)));
    assert_eq!(tree.left(id(8)), Some(id(7)));
    report
}

#[test]
fn zig_zag_top_down_climbs_three_hops_through_the_new_parent() {
    let report = zig_zag_top_down_from_root(5);
    let directive = report.directive_for(id(8)).unwrap();
    assert_eq!((directive.next, directive.hops), (id(6), 3));
}

#[test]
fn zig_zag_top_down_descends_one_hop_otherwise() {
    let report = zig_zag_top_down_from_root(7);
    let directive = report.directive_for(id(8)).unwrap();
    assert_eq!((directive.next, directive.hops), (id(7), 1));
}

#[test]
fn zig_zag_bottom_up_holds_the_message() {
    let mut controller = Controller::new(ControllerConfig::with_nodes(15)).unwrap();
    heat(&mut controller, 3, 2);

    controller.report_has_message(id(3), id(15)).unwrap();
    let report = controller.step().unwrap();

    assert_eq!(report.rotations.len(), 1);
    assert_eq!(report.rotations[0].rotation, Rotation::ZigZagBottomUp(Side::Left));
    let tree = controller.tree();
    assert_eq!(tree.left(id(8)), Some(id(3)));
    assert_eq!(tree.left(id(3)), Some(id(2)));
    assert_eq!(tree.right(id(3)), Some(id(4)));

    assert!(report.directive_for(id(3)).is_none());
    assert!(report.deferred.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rounds_preserve_order_and_weight(
        size in 4usize..48,
        rounds in proptest::collection::vec(
            proptest::collection::vec((0usize..48, 0usize..48), 1..12),
            1..12,
        ),
    ) {
        let mut controller = Controller::new(ControllerConfig::with_nodes(size)).unwrap();
        let expected: Vec<NodeId> = (1..=size).map(NodeId).collect();

        for messages in rounds {
            for &(src, dst) in &messages {
                let (src, dst) = (NodeId::from_index(src % size), NodeId::from_index(dst % size));
                controller.message_completed(src, dst).unwrap();
                controller.report_has_message(src, dst).unwrap();
            }
            let report = controller.step();
            prop_assert!(report.is_ok(), "{:?}", report);

            let tree = controller.tree();
            prop_assert_eq!(tree.in_order(), expected.clone());
            let total = controller.weights().total();
            prop_assert_eq!(tree.weight(controller.weights(), tree.root()), total);
        }

        // The next round re-checks the wiring
        prop_assert!(controller.step().is_ok());
    }
}
