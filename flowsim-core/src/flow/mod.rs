mod control;
mod id;

pub use self::{
    control::{Algorithm, AlgorithmParseError, Phase, TcpState},
    id::{FlowId, FlowIdGenerator},
};
use crate::{
    defaults::{BASE_SPEED, FLOOR_SPEED, SPEED_DAMPING},
    event::EventKind,
    measure::{Congestion, Latency},
    node::{Node, NodeId},
    topology::Route,
};
use serde::Serialize;
use std::time::Duration;

/// A unit of traffic travelling hop by hop along a routed path.
///
/// The position is the index of the node being left plus the progress,
/// in `[0, 1)`, towards the next one. Every time the progress is `0` the
/// flow just entered a node and its [`TcpState`] is evaluated against it.
#[derive(Debug, Clone)]
pub struct Flow {
    id: FlowId,
    path: Vec<NodeId>,
    cost: Latency,
    index: usize,
    progress: f64,
    tcp: TcpState,
    created_at: Duration,
    manual: bool,
}

/// Delivery status of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    InTransit,
    /// still travelling, but a timeout struck on the way
    Lost,
    Delivered,
}

/// Fraction of a hop travelled per advance tick when leaving a node with
/// the given congestion.
///
/// Decreases with the congestion but never reaches `0`:
///
/// ```
/// # use flowsim_core::{flow::hop_speed, measure::Congestion};
/// assert_eq!(hop_speed(Congestion::ZERO), 0.05);
/// assert!(hop_speed(Congestion::MAX) > 0.0);
/// ```
pub fn hop_speed(congestion: Congestion) -> f64 {
    (BASE_SPEED * (1.0 - congestion.value() * SPEED_DAMPING)).max(FLOOR_SPEED)
}

impl Flow {
    pub(crate) fn new(
        id: FlowId,
        route: Route,
        algorithm: Algorithm,
        created_at: Duration,
        manual: bool,
    ) -> Self {
        let cost = route.cost();
        Self {
            id,
            path: route.into_path(),
            cost,
            index: 0,
            progress: 0.0,
            tcp: TcpState::new(algorithm),
            created_at,
            manual,
        }
    }

    #[inline]
    pub fn id(&self) -> FlowId {
        self.id
    }

    pub fn source(&self) -> NodeId {
        self.path[0]
    }

    pub fn destination(&self) -> NodeId {
        self.path[self.path.len() - 1]
    }

    #[inline]
    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    /// total latency of the routed path
    #[inline]
    pub fn cost(&self) -> Latency {
        self.cost
    }

    /// index in the path of the node being left
    #[inline]
    pub fn current_index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn current_node(&self) -> NodeId {
        self.path[self.index]
    }

    pub fn next_node(&self) -> Option<NodeId> {
        self.path.get(self.index + 1).copied()
    }

    pub fn is_at_destination(&self) -> bool {
        self.index + 1 >= self.path.len()
    }

    pub fn hops_remaining(&self) -> usize {
        self.path.len() - 1 - self.index
    }

    /// Overall progress along the path, as a whole percentage.
    pub fn progress_percent(&self) -> u8 {
        let done = (self.index as f64 + self.progress) / self.path.len() as f64;
        (done * 100.0).floor().min(100.0) as u8
    }

    #[inline]
    pub fn tcp(&self) -> &TcpState {
        &self.tcp
    }

    pub fn status(&self) -> FlowStatus {
        if self.is_at_destination() {
            FlowStatus::Delivered
        } else if self.tcp.is_lost() {
            FlowStatus::Lost
        } else {
            FlowStatus::InTransit
        }
    }

    /// simulated time of creation
    #[inline]
    pub fn created_at(&self) -> Duration {
        self.created_at
    }

    #[inline]
    pub fn is_manual(&self) -> bool {
        self.manual
    }

    /// `true` when the flow sits exactly on a node, before travelling
    pub(crate) fn is_entering_hop(&self) -> bool {
        self.progress == 0.0
    }

    pub(crate) fn passes_through(&self, node: NodeId) -> bool {
        self.path.contains(&node)
    }

    /// Evaluate the congestion control against the node being entered.
    pub(crate) fn on_hop_entry(&mut self, node: &Node) -> Option<EventKind> {
        let before = self.tcp.phase();
        let event = self.tcp.on_hop_entry(node.latency(), node.congestion());

        if event == Some(EventKind::FastRetransmit) {
            tracing::debug!(
                flow = %self.id,
                node = %node.id(),
                from = %before,
                through = %Phase::FastRetransmit,
                to = %self.tcp.phase(),
                cwnd = self.tcp.cwnd(),
                ssthresh = self.tcp.ssthresh(),
                "fast retransmit"
            );
        } else if before != self.tcp.phase() {
            tracing::debug!(
                flow = %self.id,
                node = %node.id(),
                from = %before,
                to = %self.tcp.phase(),
                cwnd = self.tcp.cwnd(),
                ssthresh = self.tcp.ssthresh(),
                "phase transition"
            );
        }

        event
    }

    /// Move towards the next node by `speed` of a hop.
    ///
    /// Returns `true` when the next node was reached.
    pub(crate) fn advance(&mut self, speed: f64) -> bool {
        self.progress += speed;
        if self.progress >= 1.0 {
            self.progress = 0.0;
            self.index += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{node::NodeKind, topology::Topology};

    fn linear(n: usize) -> (Topology, Route) {
        let mut topology = Topology::new();
        let ids: Vec<_> = (0..n)
            .map(|_| topology.new_node(NodeKind::Router).build())
            .collect();
        for pair in ids.windows(2) {
            topology.connect(pair[0], pair[1]).unwrap();
        }
        let route = topology.shortest_path(ids[0], ids[n - 1]).unwrap();
        (topology, route)
    }

    fn flow(route: Route) -> Flow {
        Flow::new(
            FlowId::new(1),
            route,
            Algorithm::Reno,
            Duration::ZERO,
            false,
        )
    }

    #[test]
    fn speed_decreases_with_congestion() {
        let mut previous = hop_speed(Congestion::ZERO);
        for level in 1..=10 {
            let speed = hop_speed(Congestion::new(level as f64));
            assert!(speed <= previous);
            assert!(speed >= FLOOR_SPEED);
            previous = speed;
        }
        assert!((hop_speed(Congestion::new(10.0)) - 0.025).abs() < 1e-12);
    }

    #[test]
    fn walks_the_path() {
        let (_, route) = linear(3);
        let mut flow = flow(route);

        assert_eq!(flow.hops_remaining(), 2);
        assert!(flow.is_entering_hop());
        assert_eq!(flow.status(), FlowStatus::InTransit);

        assert!(!flow.advance(0.5));
        assert!(!flow.is_entering_hop());
        assert_eq!(flow.progress_percent(), 16);

        assert!(flow.advance(0.5));
        assert!(flow.is_entering_hop());
        assert_eq!(flow.current_index(), 1);
        assert_eq!(flow.next_node(), Some(flow.destination()));

        assert!(flow.advance(1.0));
        assert!(flow.is_at_destination());
        assert_eq!(flow.hops_remaining(), 0);
        assert_eq!(flow.next_node(), None);
        assert_eq!(flow.status(), FlowStatus::Delivered);
        assert_eq!(flow.progress_percent(), 66);
    }

    #[test]
    fn hop_entry_reads_the_node() {
        let (mut topology, route) = linear(2);
        let mut flow = flow(route);
        let source = flow.source();

        topology
            .node_mut(source)
            .unwrap()
            .set_congestion(Congestion::new(9.5));
        let event = flow.on_hop_entry(topology.node(source).unwrap());

        assert_eq!(event, Some(EventKind::Timeout));
        assert_eq!(flow.status(), FlowStatus::Lost);
        assert_eq!(flow.tcp().rtt(), 10.0 + 9.5 * 5.0);
    }

    #[test]
    fn passes_through() {
        let (topology, route) = linear(3);
        let flow = flow(route);
        assert!(topology.node_ids().all(|id| flow.passes_through(id)));
    }
}
