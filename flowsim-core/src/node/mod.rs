mod id;
mod kind;

pub use self::{
    id::NodeId,
    kind::{NodeKind, NodeKindParseError},
};
use crate::measure::{Congestion, Latency};

/// A forwarding element of the [`Topology`].
///
/// The latency is fixed when the node is created; the congestion
/// accumulator moves with the traffic routed through the node and decays
/// over time. Neighbours are stored by [`NodeId`], in the order the edges
/// were added, and kept symmetric by the [`Topology`].
///
/// You never construct a `Node` directly: use [`Topology::new_node`] to
/// obtain a [`NodeBuilder`].
///
/// [`Topology`]: crate::topology::Topology
/// [`Topology::new_node`]: crate::topology::Topology::new_node
/// [`NodeBuilder`]: crate::topology::NodeBuilder
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    name: String,
    latency: Latency,
    /// capacity in Mbps, informational
    throughput: u64,
    congestion: Congestion,
    neighbors: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        kind: NodeKind,
        name: String,
        latency: Latency,
        throughput: u64,
    ) -> Self {
        Self {
            id,
            kind,
            name,
            latency,
            throughput,
            congestion: Congestion::ZERO,
            neighbors: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Display name. Not unique.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cost of leaving this node towards any neighbour.
    #[inline]
    pub fn latency(&self) -> Latency {
        self.latency
    }

    #[inline]
    pub fn throughput(&self) -> u64 {
        self.throughput
    }

    #[inline]
    pub fn congestion(&self) -> Congestion {
        self.congestion
    }

    pub(crate) fn set_congestion(&mut self, congestion: Congestion) {
        self.congestion = congestion;
    }

    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }

    pub fn is_connected_to(&self, other: NodeId) -> bool {
        self.neighbors.contains(&other)
    }

    /// returns `false` if the neighbour was already known
    pub(crate) fn add_neighbor(&mut self, other: NodeId) -> bool {
        if self.is_connected_to(other) {
            return false;
        }
        self.neighbors.push(other);
        true
    }

    /// returns `false` if the neighbour was not known
    pub(crate) fn remove_neighbor(&mut self, other: NodeId) -> bool {
        let before = self.neighbors.len();
        self.neighbors.retain(|id| *id != other);
        before != self.neighbors.len()
    }
}
