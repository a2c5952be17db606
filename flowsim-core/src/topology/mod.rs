mod edge;
mod preset;
mod route;

pub use self::{
    edge::Edge,
    preset::{TopologyKind, TopologyKindParseError},
    route::{HopComparison, InvalidEndpoints, Route, RouteAnalysis, RouteError},
};
use crate::{
    defaults::{
        DEFAULT_NODE_LATENCY, DEFAULT_NODE_THROUGHPUT, NODE_LATENCY_MS, NODE_THROUGHPUT_MBPS,
    },
    measure::Latency,
    node::{Node, NodeId, NodeKind},
    random,
};
use rand_core::Rng;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// The undirected graph of [`Node`]s the flows are routed over.
///
/// Nodes are kept in an indexed store ordered by [`NodeId`] (i.e. by
/// insertion order since identifiers are sequential), adjacency is stored
/// on each node as identifiers only. Every mutation keeps the adjacency
/// symmetric: if `a` lists `b` as neighbour then `b` lists `a`.
///
/// The topology itself holds no randomness: [`Topology::add_random_node`]
/// and [`TopologyKind::generate`] take the generator to draw from.
///
/// ```
/// use flowsim_core::{node::NodeKind, topology::Topology};
///
/// let mut topology = Topology::new();
/// let a = topology.new_node(NodeKind::Router).build();
/// let b = topology.new_node(NodeKind::Host).build();
/// topology.connect(a, b).unwrap();
///
/// assert_eq!(topology.node(a).unwrap().name(), "ROUTER1");
/// assert_eq!(topology.edges().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: BTreeMap<NodeId, Node>,

    /// the last assigned ID
    ///
    /// ID 0 is never given; identifiers survive [`Topology::clear`]
    id: NodeId,
}

/// Builder for configuring a new node before adding it to the topology.
///
/// Obtained via [`Topology::new_node`].
///
/// ## Defaults
///
/// | Setting | Default |
/// |---------|---------|
/// | Name | `{KIND}{n}`, `n` the number of nodes of that kind plus one |
/// | Latency | [`DEFAULT_NODE_LATENCY`] |
/// | Throughput | [`DEFAULT_NODE_THROUGHPUT`] Mbps |
pub struct NodeBuilder<'a> {
    kind: NodeKind,
    name: Option<String>,
    latency: Latency,
    throughput: u64,

    topology: &'a mut Topology,
}

/// Error returned by the edge editing operations of the [`Topology`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("Node ({node}) Not Found")]
    NodeNotFound { node: NodeId },
    #[error("Node ({node}) cannot be connected to itself")]
    SelfLoop { node: NodeId },
}

impl NodeBuilder<'_> {
    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the latency paid by every flow leaving this node.
    pub fn set_latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    /// Set the informational throughput capacity, in Mbps.
    pub fn set_throughput(mut self, throughput: u64) -> Self {
        self.throughput = throughput;
        self
    }

    /// Finalise the node configuration and add it to the topology.
    ///
    /// Returns the [`NodeId`] assigned to this node.
    pub fn build(self) -> NodeId {
        let Self {
            kind,
            name,
            latency,
            throughput,
            topology,
        } = self;

        let name = name.unwrap_or_else(|| {
            let count = topology.nodes().filter(|n| n.kind() == kind).count();
            format!("{}{}", kind.name_prefix(), count + 1)
        });

        topology.id = topology.id.next();
        let id = topology.id;
        topology
            .nodes
            .insert(id, Node::new(id, kind, name, latency, throughput));

        id
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

impl Topology {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            id: NodeId::ZERO,
        }
    }

    /// Start configuring a new node of the given kind.
    pub fn new_node(&mut self, kind: NodeKind) -> NodeBuilder<'_> {
        NodeBuilder {
            kind,
            name: None,
            latency: DEFAULT_NODE_LATENCY,
            throughput: DEFAULT_NODE_THROUGHPUT,
            topology: self,
        }
    }

    /// Add a node with a latency drawn from [`NODE_LATENCY_MS`] and a
    /// throughput drawn from [`NODE_THROUGHPUT_MBPS`].
    pub fn add_random_node<R: Rng + ?Sized>(&mut self, kind: NodeKind, rng: &mut R) -> NodeId {
        let latency = Latency::from_millis(random::within(rng, NODE_LATENCY_MS));
        let throughput = random::within(rng, NODE_THROUGHPUT_MBPS);

        self.new_node(kind)
            .set_latency(latency)
            .set_throughput(throughput)
            .build()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// All the nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    /// All the edges, ordered by their smallest then largest endpoint.
    pub fn edges(&self) -> Vec<Edge> {
        self.nodes
            .values()
            .flat_map(|node| {
                let id = node.id();
                node.neighbors().iter().map(move |n| Edge::new((id, *n)))
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Connect two nodes with an undirected edge.
    ///
    /// Returns `false` if the edge already existed.
    ///
    /// # Errors
    ///
    /// - [`TopologyError::NodeNotFound`] if either node does not exist.
    /// - [`TopologyError::SelfLoop`] if `a` and `b` are the same node.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<bool, TopologyError> {
        self.check_edge(a, b)?;

        let added = self
            .nodes
            .get_mut(&a)
            .is_some_and(|node| node.add_neighbor(b));
        if let Some(node) = self.nodes.get_mut(&b) {
            node.add_neighbor(a);
        }
        Ok(added)
    }

    /// Remove the edge between two nodes.
    ///
    /// Returns `false` if there was no such edge.
    pub fn disconnect(&mut self, a: NodeId, b: NodeId) -> Result<bool, TopologyError> {
        self.check_edge(a, b)?;

        let removed = self
            .nodes
            .get_mut(&a)
            .is_some_and(|node| node.remove_neighbor(b));
        if let Some(node) = self.nodes.get_mut(&b) {
            node.remove_neighbor(a);
        }
        Ok(removed)
    }

    /// Remove a node and every edge it is an endpoint of.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, TopologyError> {
        let node = self
            .nodes
            .remove(&id)
            .ok_or(TopologyError::NodeNotFound { node: id })?;

        for neighbor in node.neighbors() {
            if let Some(neighbor) = self.nodes.get_mut(neighbor) {
                neighbor.remove_neighbor(id);
            }
        }

        Ok(node)
    }

    /// Remove every node. Identifiers already handed out are not reused.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    fn check_edge(&self, a: NodeId, b: NodeId) -> Result<(), TopologyError> {
        for node in [a, b] {
            if !self.contains(node) {
                return Err(TopologyError::NodeNotFound { node });
            }
        }
        if a == b {
            return Err(TopologyError::SelfLoop { node: a });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_symmetric(topology: &Topology) -> bool {
        topology.nodes().all(|node| {
            node.neighbors().iter().all(|n| {
                topology
                    .node(*n)
                    .is_some_and(|other| other.is_connected_to(node.id()))
            })
        })
    }

    #[test]
    fn generated_names_count_per_kind() {
        let mut topology = Topology::new();
        let r1 = topology.new_node(NodeKind::Router).build();
        let h1 = topology.new_node(NodeKind::Host).build();
        let r2 = topology.new_node(NodeKind::Router).build();
        let custom = topology.new_node(NodeKind::Router).set_name("edge").build();

        assert_eq!(topology.node(r1).unwrap().name(), "ROUTER1");
        assert_eq!(topology.node(h1).unwrap().name(), "HOST1");
        assert_eq!(topology.node(r2).unwrap().name(), "ROUTER2");
        assert_eq!(topology.node(custom).unwrap().name(), "edge");
    }

    #[test]
    fn builder_settings() {
        let mut topology = Topology::new();
        let id = topology
            .new_node(NodeKind::Switch)
            .set_latency(Latency::from_millis(42))
            .set_throughput(250)
            .build();
        let node = topology.node(id).unwrap();

        assert_eq!(node.latency(), Latency::from_millis(42));
        assert_eq!(node.throughput(), 250);
        assert_eq!(node.kind(), NodeKind::Switch);
    }

    #[test]
    fn connect_is_symmetric_and_idempotent() {
        let mut topology = Topology::new();
        let a = topology.new_node(NodeKind::Router).build();
        let b = topology.new_node(NodeKind::Router).build();

        assert!(topology.connect(a, b).unwrap());
        assert!(!topology.connect(b, a).unwrap());
        assert!(is_symmetric(&topology));
        assert_eq!(topology.edges(), vec![Edge::new((a, b))]);
    }

    #[test]
    fn connect_errors() {
        let mut topology = Topology::new();
        let a = topology.new_node(NodeKind::Router).build();
        let ghost = NodeId::new(99);

        assert_eq!(
            topology.connect(a, a),
            Err(TopologyError::SelfLoop { node: a })
        );
        assert_eq!(
            topology.connect(a, ghost),
            Err(TopologyError::NodeNotFound { node: ghost })
        );
        assert!(topology.node(a).unwrap().neighbors().is_empty());
    }

    #[test]
    fn disconnect() {
        let mut topology = Topology::new();
        let a = topology.new_node(NodeKind::Router).build();
        let b = topology.new_node(NodeKind::Router).build();
        topology.connect(a, b).unwrap();

        assert!(topology.disconnect(b, a).unwrap());
        assert!(!topology.disconnect(a, b).unwrap());
        assert!(topology.edges().is_empty());
        assert!(is_symmetric(&topology));
    }

    #[test]
    fn remove_node_drops_its_edges() {
        let mut topology = Topology::new();
        let a = topology.new_node(NodeKind::Router).build();
        let b = topology.new_node(NodeKind::Router).build();
        let c = topology.new_node(NodeKind::Router).build();
        topology.connect(a, b).unwrap();
        topology.connect(b, c).unwrap();
        topology.connect(a, c).unwrap();

        let removed = topology.remove_node(b).unwrap();
        assert_eq!(removed.id(), b);
        assert!(!topology.contains(b));
        assert_eq!(topology.edges(), vec![Edge::new((a, c))]);
        assert!(is_symmetric(&topology));

        assert_eq!(
            topology.remove_node(b).unwrap_err(),
            TopologyError::NodeNotFound { node: b }
        );
    }

    #[test]
    fn random_node_attributes_within_ranges() {
        use rand_chacha::ChaChaRng;
        use rand_core::SeedableRng as _;

        let mut rng = ChaChaRng::seed_from_u64(7);
        let mut topology = Topology::new();
        for _ in 0..100 {
            let id = topology.add_random_node(NodeKind::Host, &mut rng);
            let node = topology.node(id).unwrap();
            let latency = node.latency().as_millis_f64() as u64;
            assert!(NODE_LATENCY_MS.contains(&latency));
            assert!(NODE_THROUGHPUT_MBPS.contains(&node.throughput()));
        }
        assert_eq!(topology.node(NodeId::new(100)).unwrap().name(), "HOST100");
    }

    #[test]
    fn identifiers_survive_clear() {
        let mut topology = Topology::new();
        let a = topology.new_node(NodeKind::Router).build();
        topology.clear();
        assert!(topology.is_empty());

        let b = topology.new_node(NodeKind::Router).build();
        assert!(b > a);
        assert_eq!(topology.node(b).unwrap().name(), "ROUTER1");
    }

    #[test]
    fn default_is_empty() {
        let mut topology = Topology::default();
        assert!(topology.is_empty());
        assert!(topology.edges().is_empty());

        // first identifier handed out is the same as with `new`
        let id = topology.new_node(NodeKind::Host).build();
        assert_eq!(id, Topology::new().new_node(NodeKind::Host).build());
        assert_eq!(id, NodeId::ONE);
    }
}
