use crate::{
    node::{NodeId, NodeKind},
    random,
    topology::Topology,
};
use rand_core::Rng;
use serde::Serialize;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// The predefined topology shapes.
///
/// | kind          | shape |
/// |---------------|-------|
/// | `star`        | one router, six hosts around it |
/// | `mesh`        | six routers, fully connected |
/// | `ring`        | eight routers in a cycle |
/// | `tree`        | a cloud, two routers, four switches, eight hosts |
/// | `linear`      | seven routers in a line |
/// | `random_tree` | three or four levels of random width |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyKind {
    Star,
    Mesh,
    Ring,
    Tree,
    Linear,
    RandomTree,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown topology `{0}', expected one of star, mesh, ring, tree, linear, random_tree")]
pub struct TopologyKindParseError(String);

const STAR_HOSTS: usize = 6;
const MESH_ROUTERS: usize = 6;
const RING_ROUTERS: usize = 8;
const LINEAR_ROUTERS: usize = 7;
const TREE_SWITCHES: usize = 4;
const TREE_HOSTS_PER_SWITCH: usize = 2;

impl TopologyKind {
    pub const ALL: [Self; 6] = [
        Self::Star,
        Self::Mesh,
        Self::Ring,
        Self::Tree,
        Self::Linear,
        Self::RandomTree,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Star => "star",
            Self::Mesh => "mesh",
            Self::Ring => "ring",
            Self::Tree => "tree",
            Self::Linear => "linear",
            Self::RandomTree => "random_tree",
        }
    }

    /// Add the nodes and edges of this shape to `topology`.
    ///
    /// Node attributes, and the level widths of the random tree, are
    /// drawn from `rng`. Returns the new nodes in creation order.
    pub fn generate<R: Rng + ?Sized>(self, topology: &mut Topology, rng: &mut R) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        let mut add = |topology: &mut Topology, rng: &mut R, kind| {
            let id = topology.add_random_node(kind, rng);
            nodes.push(id);
            id
        };

        match self {
            Self::Star => {
                let center = add(topology, rng, NodeKind::Router);
                for _ in 0..STAR_HOSTS {
                    let host = add(topology, rng, NodeKind::Host);
                    link(topology, center, host);
                }
            }
            Self::Mesh => {
                let routers: Vec<_> = (0..MESH_ROUTERS)
                    .map(|_| add(topology, rng, NodeKind::Router))
                    .collect();
                for (i, a) in routers.iter().enumerate() {
                    for b in &routers[i + 1..] {
                        link(topology, *a, *b);
                    }
                }
            }
            Self::Ring => {
                let routers: Vec<_> = (0..RING_ROUTERS)
                    .map(|_| add(topology, rng, NodeKind::Router))
                    .collect();
                for (i, a) in routers.iter().enumerate() {
                    link(topology, *a, routers[(i + 1) % routers.len()]);
                }
            }
            Self::Tree => {
                let cloud = add(topology, rng, NodeKind::Cloud);
                let routers = [
                    add(topology, rng, NodeKind::Router),
                    add(topology, rng, NodeKind::Router),
                ];
                for router in routers {
                    link(topology, cloud, router);
                }

                let switches: Vec<_> = (0..TREE_SWITCHES)
                    .map(|i| {
                        let switch = add(topology, rng, NodeKind::Switch);
                        // first half under the first router
                        let parent = routers[i * routers.len() / TREE_SWITCHES];
                        link(topology, parent, switch);
                        switch
                    })
                    .collect();

                for switch in switches {
                    for _ in 0..TREE_HOSTS_PER_SWITCH {
                        let host = add(topology, rng, NodeKind::Host);
                        link(topology, switch, host);
                    }
                }
            }
            Self::Linear => {
                let mut previous: Option<NodeId> = None;
                for _ in 0..LINEAR_ROUTERS {
                    let router = add(topology, rng, NodeKind::Router);
                    if let Some(previous) = previous {
                        link(topology, previous, router);
                    }
                    previous = Some(router);
                }
            }
            Self::RandomTree => {
                let widths = random_tree_widths(rng);
                let levels = widths.len();

                let mut parents: Vec<NodeId> = Vec::new();
                for (level, width) in widths.into_iter().enumerate() {
                    let kind = match level {
                        0 => NodeKind::Cloud,
                        l if l == levels - 1 => NodeKind::Host,
                        1 => NodeKind::Router,
                        _ => NodeKind::Switch,
                    };

                    let mut current = Vec::with_capacity(width);
                    for i in 0..width {
                        let node = add(topology, rng, kind);
                        if !parents.is_empty() {
                            link(topology, parents[i % parents.len()], node);
                        }
                        current.push(node);
                    }
                    parents = current;
                }
            }
        }

        nodes
    }
}

/// width of every level: one root, then `2..=min(5, 2 + level)` nodes
fn random_tree_widths<R: Rng + ?Sized>(rng: &mut R) -> Vec<usize> {
    let levels = random::within(rng, 3..=4);

    let mut widths = vec![1];
    for level in 1..levels {
        let width = random::within(rng, 2..=(2 + level).min(5));
        widths.push(width as usize);
    }
    widths
}

fn link(topology: &mut Topology, a: NodeId, b: NodeId) {
    // both endpoints were just created and are distinct
    let connected = topology.connect(a, b);
    debug_assert!(connected.is_ok(), "{connected:?}");
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopologyKind {
    type Err = TopologyKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| TopologyKindParseError(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaChaRng;
    use rand_core::SeedableRng as _;

    fn generate(kind: TopologyKind, seed: u64) -> Topology {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let mut topology = Topology::new();
        kind.generate(&mut topology, &mut rng);
        topology
    }

    fn degree(topology: &Topology, id: NodeId) -> usize {
        topology.node(id).unwrap().neighbors().len()
    }

    fn count(topology: &Topology, kind: NodeKind) -> usize {
        topology.nodes().filter(|n| n.kind() == kind).count()
    }

    fn is_connected(topology: &Topology) -> bool {
        let mut ids = topology.node_ids();
        let Some(first) = ids.next() else {
            return true;
        };
        ids.all(|id| topology.shortest_path(first, id).is_ok())
    }

    #[test]
    fn star() {
        let topology = generate(TopologyKind::Star, 1);
        assert_eq!(topology.len(), 7);
        assert_eq!(topology.edges().len(), 6);
        assert_eq!(degree(&topology, NodeId::ONE), 6);
        assert_eq!(count(&topology, NodeKind::Host), 6);
    }

    #[test]
    fn mesh() {
        let topology = generate(TopologyKind::Mesh, 1);
        assert_eq!(topology.len(), 6);
        assert_eq!(topology.edges().len(), 15);
        assert!(topology.node_ids().all(|id| degree(&topology, id) == 5));
    }

    #[test]
    fn ring() {
        let topology = generate(TopologyKind::Ring, 1);
        assert_eq!(topology.len(), 8);
        assert_eq!(topology.edges().len(), 8);
        assert!(topology.node_ids().all(|id| degree(&topology, id) == 2));
    }

    #[test]
    fn tree() {
        let topology = generate(TopologyKind::Tree, 1);
        assert_eq!(topology.len(), 15);
        assert_eq!(topology.edges().len(), 14);
        assert_eq!(count(&topology, NodeKind::Cloud), 1);
        assert_eq!(count(&topology, NodeKind::Router), 2);
        assert_eq!(count(&topology, NodeKind::Switch), 4);
        assert_eq!(count(&topology, NodeKind::Host), 8);
        // cloud + two switches for each router
        assert!(topology
            .nodes()
            .filter(|n| n.kind() == NodeKind::Router)
            .all(|n| n.neighbors().len() == 3));
        assert!(is_connected(&topology));
    }

    #[test]
    fn linear() {
        let topology = generate(TopologyKind::Linear, 1);
        assert_eq!(topology.len(), 7);
        assert_eq!(topology.edges().len(), 6);
        let first = topology.node_ids().next().unwrap();
        let last = topology.node_ids().last().unwrap();
        assert_eq!(topology.shortest_path(first, last).unwrap().hops(), 6);
    }

    #[test]
    fn random_tree_shape() {
        for seed in 0..50 {
            let topology = generate(TopologyKind::RandomTree, seed);

            // a tree: connected with one edge less than nodes
            assert!(is_connected(&topology), "seed {seed}");
            assert_eq!(topology.edges().len(), topology.len() - 1);

            assert_eq!(count(&topology, NodeKind::Cloud), 1);
            let hosts = count(&topology, NodeKind::Host);
            assert!((2..=5).contains(&hosts), "seed {seed}: {hosts} hosts");
            assert!((1 + 2 + 2..=1 + 3 + 4 + 5).contains(&topology.len()));
        }
    }

    #[test]
    fn random_tree_is_reproducible() {
        let a = generate(TopologyKind::RandomTree, 3);
        let b = generate(TopologyKind::RandomTree, 3);
        assert_eq!(a.edges(), b.edges());
        assert!(a
            .nodes()
            .zip(b.nodes())
            .all(|(x, y)| x.latency() == y.latency() && x.name() == y.name()));
    }

    #[test]
    fn parse() {
        for kind in TopologyKind::ALL {
            assert_eq!(kind.to_string().parse::<TopologyKind>().unwrap(), kind);
        }
        assert_eq!(
            "Random-Tree".parse::<TopologyKind>().unwrap(),
            TopologyKind::RandomTree
        );
        assert!("hypercube".parse::<TopologyKind>().is_err());
    }
}
