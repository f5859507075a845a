//! Traffic patterns.

use cbnet_topology::NodeId;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How message endpoints are drawn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Workload {
    /// Every ordered pair of distinct nodes is equally likely
    #[default]
    Uniform,
    /// A share of the traffic stays inside a small set of hot nodes
    Skewed {
        /// Number of hot nodes, at least two
        hot_set: usize,
        /// Probability that a message runs between two hot nodes
        hot_fraction: f64,
    },
}

impl Workload {
    /// Draw `count` (src, dst) pairs with `src != dst`.
    ///
    /// Returns nothing for networks with fewer than two nodes.
    pub fn generate<R: Rng>(&self, nodes: usize, count: usize, rng: &mut R) -> Vec<(NodeId, NodeId)> {
        if nodes < 2 {
            return Vec::new();
        }

        match *self {
            Workload::Uniform => (0..count).map(|_| uniform_pair(nodes, rng)).collect(),
            Workload::Skewed {
                hot_set,
                hot_fraction,
            } => {
                let hot: Vec<usize> = index::sample(rng, nodes, hot_set.clamp(2, nodes)).into_vec();
                let hot_fraction = hot_fraction.clamp(0.0, 1.0);

                (0..count)
                    .map(|_| {
                        if rng.gen_bool(hot_fraction) {
                            let (a, b) = distinct(hot.len(), rng);
                            (NodeId::from_index(hot[a]), NodeId::from_index(hot[b]))
                        } else {
                            uniform_pair(nodes, rng)
                        }
                    })
                    .collect()
            }
        }
    }
}

fn uniform_pair<R: Rng>(nodes: usize, rng: &mut R) -> (NodeId, NodeId) {
    let (src, dst) = distinct(nodes, rng);
    (NodeId::from_index(src), NodeId::from_index(dst))
}

/// Two distinct indices below `len`; `len >= 2`.
fn distinct<R: Rng>(len: usize, rng: &mut R) -> (usize, usize) {
    let a = rng.gen_range(0..len);
    let mut b = rng.gen_range(0..len - 1);
    if b >= a {
        b += 1;
    }
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn uniform_pairs_are_distinct_and_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let pairs = Workload::Uniform.generate(10, 500, &mut rng);
        assert_eq!(pairs.len(), 500);
        for (src, dst) in pairs {
            assert_ne!(src, dst);
            assert!((1..=10).contains(&src.value()));
            assert!((1..=10).contains(&dst.value()));
        }
    }

    #[test]
    fn fully_hot_traffic_stays_in_the_hot_set() {
        let mut rng = StdRng::seed_from_u64(7);
        let workload = Workload::Skewed {
            hot_set: 3,
            hot_fraction: 1.0,
        };
        let pairs = workload.generate(100, 300, &mut rng);

        let endpoints: HashSet<NodeId> = pairs.iter().flat_map(|&(s, d)| [s, d]).collect();
        assert!(endpoints.len() <= 3);
        assert!(pairs.iter().all(|(s, d)| s != d));
    }

    #[test]
    fn tiny_networks_produce_no_traffic() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(Workload::Uniform.generate(1, 10, &mut rng).is_empty());
    }

    #[test]
    fn same_seed_same_traffic() {
        let workload = Workload::Skewed {
            hot_set: 4,
            hot_fraction: 0.5,
        };
        let a = workload.generate(64, 100, &mut StdRng::seed_from_u64(42));
        let b = workload.generate(64, 100, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
