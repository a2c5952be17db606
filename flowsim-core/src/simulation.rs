use crate::{
    config::SimConfig,
    event::{Event, EventKind, EventLog},
    flow::{hop_speed, Algorithm, Flow, FlowId, FlowIdGenerator},
    load::TrafficLoad,
    measure::{Congestion, LossRate},
    node::{Node, NodeId, NodeKind},
    random,
    round::Round,
    stats::{
        Counters, FlowSnapshot, NodeSnapshot, PerformanceHistory, RoutingStats, SimSnapshot,
        SimStats,
    },
    topology::{NodeBuilder, Route, RouteAnalysis, RouteError, Topology, TopologyError, TopologyKind},
};
use rand_chacha::ChaChaRng;
use rand_core::SeedableRng as _;
use std::{mem, time::Duration};

/// The three periodic drivers of a [`Simulation`].
///
/// Their relative order is free: each tick is self-contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tick {
    /// move every active flow, see [`Simulation::tick_advance`]
    Advance,
    /// relieve the nodes' congestion, see [`Simulation::tick_decay`]
    Decay,
    /// try to admit a random flow, see [`Simulation::tick_generate`]
    Generate,
}

impl Tick {
    pub const ALL: [Self; 3] = [Self::Advance, Self::Decay, Self::Generate];
}

/// Outcome of a [`Simulation::tick_generate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// the flow entered the active set
    Admitted(FlowId),
    /// the loss injection struck, the flow never travels
    Dropped(FlowId),
    /// the concurrency cap is reached
    Shed,
    /// the drawn endpoints are not connected
    Unroutable { from: NodeId, to: NodeId },
    /// fewer than two nodes
    NotEnoughNodes,
}

/// The simulation context.
///
/// Owns the [`Topology`], the active [`Flow`]s and every statistic. Nothing
/// happens on its own: the owner calls the `tick_*` entry points (or
/// [`Simulation::tick`]) at whatever pace it likes, the core only keeps
/// a simulated clock moving by [`SimConfig::advance_step`] on every
/// advance tick.
///
/// All random decisions come from a single [`ChaChaRng`], seeded from the
/// configuration or with [`Simulation::set_seed`], so a run replays
/// exactly. Several simulations can live side by side.
///
/// ```
/// use flowsim_core::{Simulation, SimConfig, topology::TopologyKind};
///
/// let mut sim = Simulation::new(SimConfig::default());
/// let nodes = sim.generate_topology(TopologyKind::Linear);
///
/// let flow = sim.send_manual(nodes[0], nodes[6]).unwrap();
/// while sim.flow(flow).is_some() {
///     sim.tick_advance();
/// }
///
/// assert_eq!(sim.counters().delivered, 1);
/// ```
pub struct Simulation {
    config: SimConfig,

    topology: Topology,

    /// active flows, in admission order
    flows: Vec<Flow>,

    flow_ids: FlowIdGenerator,

    events: EventLog,

    routing: RoutingStats,

    performance: PerformanceHistory,

    counters: Counters,

    round: Round,

    elapsed: Duration,

    /// Centralised RNG for node attributes, random topologies, endpoint
    /// selection and the loss injection.
    rng: ChaChaRng,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        let mut events = EventLog::new();
        events.set_seed(config.seed);

        Self {
            rng: ChaChaRng::seed_from_u64(config.seed),
            config,
            topology: Topology::new(),
            flows: Vec::new(),
            flow_ids: FlowIdGenerator::new(),
            events,
            routing: RoutingStats::default(),
            performance: PerformanceHistory::default(),
            counters: Counters::default(),
            round: Round::ZERO,
            elapsed: Duration::ZERO,
        }
    }

    /// Re-seed the simulation's random-number generators.
    ///
    /// The event sampling generator is re-seeded with the same value.
    pub fn set_seed(&mut self, seed: u64) {
        self.config.seed = seed;
        self.rng = ChaChaRng::seed_from_u64(seed);
        self.events.set_seed(seed);
    }

    /// Remove every node, flow, event and statistic.
    ///
    /// The settings (algorithm, load, loss rate) and the state of the
    /// random generators are kept.
    pub fn reset(&mut self) {
        self.topology.clear();
        self.flows.clear();
        self.flow_ids = FlowIdGenerator::new();
        self.events.clear();
        self.routing = RoutingStats::default();
        self.performance = PerformanceHistory::default();
        self.counters = Counters::default();
        self.round = Round::ZERO;
        self.elapsed = Duration::ZERO;

        tracing::info!("simulation reset");
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// active flows, in admission order
    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    pub fn flow(&self, id: FlowId) -> Option<&Flow> {
        self.flows.iter().find(|flow| flow.id() == id)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn routing_stats(&self) -> &RoutingStats {
        &self.routing
    }

    pub fn performance(&self) -> &PerformanceHistory {
        &self.performance
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn round(&self) -> Round {
        self.round
    }

    /// simulated time since the last reset
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn set_traffic_load(&mut self, traffic_load: TrafficLoad) {
        self.config.traffic_load = traffic_load;
    }

    /// Flows already active keep the algorithm they were admitted with.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.config.algorithm = algorithm;
    }

    pub fn set_loss_rate(&mut self, loss_rate: LossRate) {
        self.config.loss_rate = loss_rate;
    }

    /// Add a node with randomly drawn latency and throughput.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        self.topology.add_random_node(kind, &mut self.rng)
    }

    /// Add a node with explicit attributes.
    pub fn new_node(&mut self, kind: NodeKind) -> NodeBuilder<'_> {
        self.topology.new_node(kind)
    }

    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<bool, TopologyError> {
        self.topology.connect(a, b)
    }

    /// Active flows keep their route even if it used this edge.
    pub fn disconnect(&mut self, a: NodeId, b: NodeId) -> Result<bool, TopologyError> {
        self.topology.disconnect(a, b)
    }

    /// Remove a node and its edges.
    ///
    /// The active flows whose path goes through the node are discarded,
    /// each with a `dropped` event.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, TopologyError> {
        let node = self.topology.remove_node(id)?;

        let (discarded, kept): (Vec<_>, Vec<_>) = mem::take(&mut self.flows)
            .into_iter()
            .partition(|flow| flow.passes_through(id));
        self.flows = kept;

        for flow in discarded {
            self.discard(&flow, id);
        }

        Ok(node)
    }

    /// Account for an active flow whose path lost `node`.
    fn discard(&mut self, flow: &Flow, node: NodeId) {
        tracing::debug!(flow = %flow.id(), %node, "flow discarded with its node");
        self.counters.discarded += 1;
        self.events.record(Event::of(
            flow,
            EventKind::Dropped,
            self.elapsed,
            Congestion::ZERO,
        ));
    }

    /// Reset the simulation then build a predefined topology.
    ///
    /// Returns the new nodes in creation order.
    pub fn generate_topology(&mut self, kind: TopologyKind) -> Vec<NodeId> {
        self.reset();
        let nodes = kind.generate(&mut self.topology, &mut self.rng);

        tracing::info!(
            topology = %kind,
            nodes = nodes.len(),
            edges = self.topology.edges().len(),
            "topology generated"
        );
        nodes
    }

    /// Route then admit a single flow between two chosen nodes.
    ///
    /// Manual flows bypass the loss injection and the concurrency cap.
    ///
    /// # Errors
    ///
    /// Fails without any side effect if the endpoints are invalid or not
    /// connected.
    pub fn send_manual(&mut self, source: NodeId, destination: NodeId) -> Result<FlowId, RouteError> {
        let route = self
            .topology
            .shortest_path(source, destination)
            .inspect_err(|error| tracing::warn!(%source, %destination, %error, "manual send rejected"))?;

        Ok(self.admit(route, true))
    }

    /// Compute the route between two nodes and compare it with the
    /// running routing statistics. Nothing is admitted.
    pub fn analyze_route(&self, source: NodeId, destination: NodeId) -> Result<RouteAnalysis, RouteError> {
        let route = self.topology.shortest_path(source, destination)?;
        Ok(RouteAnalysis::new(route, self.routing.average_hops()))
    }

    pub fn tick(&mut self, tick: Tick) {
        match tick {
            Tick::Advance => {
                self.tick_advance();
            }
            Tick::Decay => self.tick_decay(),
            Tick::Generate => {
                self.tick_generate();
            }
        }
    }

    /// Try to admit one random flow.
    ///
    /// Refused while the concurrency cap of the current load is reached.
    /// Otherwise a source is drawn uniformly, then a destination among the
    /// other nodes; the flow is routed then submitted to the loss
    /// injection.
    pub fn tick_generate(&mut self) -> Generation {
        let nodes: Vec<NodeId> = self.topology.node_ids().collect();
        if nodes.len() < 2 {
            return Generation::NotEnoughNodes;
        }

        if self.flows.len() >= self.config.traffic_load.profile().concurrency_cap {
            self.counters.shed += 1;
            tracing::trace!(active = self.flows.len(), "random flow shed");
            return Generation::Shed;
        }

        let from = nodes[random::index(&mut self.rng, nodes.len())];
        let others: Vec<NodeId> = nodes.into_iter().filter(|id| *id != from).collect();
        let to = others[random::index(&mut self.rng, others.len())];

        let route = match self.topology.shortest_path(from, to) {
            Ok(route) => route,
            Err(error) => {
                self.counters.unroutable += 1;
                tracing::trace!(%from, %to, %error, "random flow unroutable");
                return Generation::Unroutable { from, to };
            }
        };

        if self.config.loss_rate.should_drop(&mut self.rng) {
            let id = self.flow_ids.generate();
            self.counters.dropped += 1;
            self.events.record(Event::dropped(id, self.elapsed));
            tracing::debug!(flow = %id, %from, %to, "flow dropped before transmission");
            return Generation::Dropped(id);
        }

        Generation::Admitted(self.admit(route, false))
    }

    fn admit(&mut self, route: Route, manual: bool) -> FlowId {
        let id = self.flow_ids.generate();
        let profile = self.config.traffic_load.profile();

        self.routing.record(&route, self.elapsed);
        self.performance.record(self.elapsed, route.cost());

        let flow = Flow::new(id, route, self.config.algorithm, self.elapsed, manual);
        let kind = if manual {
            EventKind::ManualCreated
        } else {
            EventKind::Created
        };
        let congestion = self.congestion_of(flow.source());
        self.events
            .record(Event::of(&flow, kind, self.elapsed, congestion));

        for node in flow.path() {
            if let Some(node) = self.topology.node_mut(*node) {
                node.set_congestion(node.congestion().increase(profile.congestion_increment));
            }
        }

        tracing::debug!(
            flow = %id,
            from = %flow.source(),
            to = %flow.destination(),
            hops = flow.path().len() - 1,
            cost = %flow.cost(),
            manual,
            "flow admitted"
        );

        self.counters.created += 1;
        self.flows.push(flow);
        id
    }

    fn congestion_of(&self, node: NodeId) -> Congestion {
        self.topology
            .node(node)
            .map_or(Congestion::ZERO, Node::congestion)
    }

    /// Move every active flow, see [`Simulation::tick_advance_with`].
    ///
    /// Returns the number of flows delivered.
    pub fn tick_advance(&mut self) -> usize {
        let mut delivered = 0;
        self.tick_advance_with(|_| delivered += 1);
        delivered
    }

    /// Move every active flow and the simulated clock one step.
    ///
    /// For each flow, in admission order:
    ///
    /// * a flow at its destination is delivered: removed from the active
    ///   set and handed to `handle`;
    /// * a flow sitting on a node (hop just began) has its congestion
    ///   control evaluated against that node;
    /// * the flow then travels a fraction of the hop that decreases with
    ///   the congestion of the node it leaves.
    pub fn tick_advance_with<F>(&mut self, mut handle: F)
    where
        F: FnMut(Flow),
    {
        self.round = self.round.next();
        self.elapsed += self.config.advance_step;
        let time = self.elapsed;

        let mut active = Vec::with_capacity(self.flows.len());
        for mut flow in mem::take(&mut self.flows) {
            if flow.is_at_destination() {
                let congestion = self.congestion_of(flow.destination());
                self.events
                    .record(Event::of(&flow, EventKind::Delivered, time, congestion));
                self.counters.delivered += 1;
                tracing::debug!(
                    flow = %flow.id(),
                    lost = flow.tcp().is_lost(),
                    cwnd = flow.tcp().cwnd(),
                    "flow delivered"
                );
                handle(flow);
                continue;
            }

            let current = flow.current_node();
            let Some(node) = self.topology.node(current) else {
                self.discard(&flow, current);
                continue;
            };

            if flow.is_entering_hop()
                && let Some(kind) = flow.on_hop_entry(node)
            {
                self.events
                    .record(Event::of(&flow, kind, time, node.congestion()));
            }

            if flow.advance(hop_speed(node.congestion())) {
                let congestion = self.congestion_of(flow.current_node());
                self.events
                    .record(Event::of(&flow, EventKind::HopCompleted, time, congestion));
            }

            active.push(flow);
        }
        self.flows = active;

        tracing::trace!(round = %self.round, active = self.flows.len(), "advance");
    }

    /// Decrease every node's congestion by the decay rate of the current
    /// load, saturating at `0`.
    pub fn tick_decay(&mut self) {
        let rate = self.config.traffic_load.profile().decay_rate;
        for node in self.topology.nodes_mut() {
            node.set_congestion(node.congestion().decrease(rate));
        }
        tracing::trace!(rate, "decay");
    }

    /// Snapshot of a single active flow.
    pub fn flow_snapshot(&self, id: FlowId) -> Option<FlowSnapshot> {
        self.flow(id).map(FlowSnapshot::of)
    }

    pub fn stats(&self) -> SimStats {
        let active_flows = self.flows.len();
        let (average_cwnd, lost_percent) = if active_flows > 0 {
            let total_cwnd: f64 = self.flows.iter().map(|f| f.tcp().cwnd()).sum();
            let lost = self.flows.iter().filter(|f| f.tcp().is_lost()).count();
            (
                total_cwnd / active_flows as f64,
                lost as f64 / active_flows as f64 * 100.0,
            )
        } else {
            (0.0, 0.0)
        };

        SimStats {
            round: self.round,
            elapsed: self.elapsed,
            algorithm: self.config.algorithm,
            traffic_load: self.config.traffic_load,
            loss_rate: self.config.loss_rate,
            active_flows,
            average_cwnd,
            lost_percent,
            phases: self.flows.iter().map(|f| f.tcp().phase()).collect(),
            routed: self.routing.total(),
            average_hops: self.routing.average_hops(),
            min_hops: self.routing.min_hops(),
            max_hops: self.routing.max_hops(),
            counters: self.counters,
            events: self.events.len(),
        }
    }

    /// Copy of the whole observable state.
    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot {
            nodes: self.topology.nodes().map(NodeSnapshot::of).collect(),
            edges: self.topology.edges(),
            flows: self.flows.iter().map(FlowSnapshot::of).collect(),
            performance_mode: self.config.traffic_load.profile().performance_mode,
            stats: self.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        flow::{FlowStatus, Phase},
        measure::Latency,
        topology::InvalidEndpoints,
    };

    const MAX_TICKS: usize = 10_000;

    fn sim() -> Simulation {
        Simulation::new(SimConfig::default())
    }

    /// `n` routers in a line, 10ms each
    fn linear(sim: &mut Simulation, n: usize) -> Vec<NodeId> {
        let ids: Vec<_> = (0..n)
            .map(|_| {
                sim.new_node(NodeKind::Router)
                    .set_latency(Latency::from_millis(10))
                    .build()
            })
            .collect();
        for pair in ids.windows(2) {
            sim.connect(pair[0], pair[1]).unwrap();
        }
        ids
    }

    fn run_until_idle(sim: &mut Simulation) -> usize {
        let mut ticks = 0;
        while !sim.flows().is_empty() {
            sim.tick_advance();
            ticks += 1;
            assert!(ticks < MAX_TICKS, "flows never delivered");
        }
        ticks
    }

    fn kinds_of(sim: &Simulation, id: FlowId) -> Vec<EventKind> {
        sim.events().for_flow(id).map(|e| e.kind).collect()
    }

    #[test]
    fn manual_send_admits_and_congests_the_path() {
        let mut sim = sim();
        let nodes = linear(&mut sim, 3);

        let id = sim.send_manual(nodes[0], nodes[2]).unwrap();
        let flow = sim.flow(id).unwrap();

        assert_eq!(flow.path(), nodes.as_slice());
        assert!(flow.is_manual());
        assert_eq!(flow.tcp().cwnd(), 1.0);
        assert_eq!(flow.tcp().ssthresh(), 64.0);
        assert_eq!(kinds_of(&sim, id), [EventKind::ManualCreated]);

        let increment = TrafficLoad::Medium.profile().congestion_increment;
        for node in &nodes {
            let congestion = sim.topology().node(*node).unwrap().congestion();
            assert_eq!(congestion.value(), increment);
        }

        assert_eq!(sim.counters().created, 1);
        assert_eq!(sim.routing_stats().total(), 1);
        assert_eq!(sim.performance().len(), 1);
    }

    #[test]
    fn manual_send_failures_have_no_side_effect() {
        let mut sim = sim();
        let nodes = linear(&mut sim, 2);
        let island = sim.add_node(NodeKind::Host);
        let ghost = NodeId::new(1_000);

        assert_eq!(
            sim.send_manual(nodes[0], island),
            Err(RouteError::NoPathFound {
                from: nodes[0],
                to: island
            })
        );
        assert_eq!(
            sim.send_manual(nodes[0], nodes[0]),
            Err(InvalidEndpoints::SameNode { node: nodes[0] }.into())
        );
        assert_eq!(
            sim.send_manual(ghost, nodes[0]),
            Err(InvalidEndpoints::SourceNotFound { node: ghost }.into())
        );

        assert!(sim.flows().is_empty());
        assert!(sim.events().is_empty());
        assert_eq!(sim.counters(), &Counters::default());
        assert!(sim
            .topology()
            .nodes()
            .all(|n| n.congestion() == Congestion::ZERO));

        // no identifier was consumed
        let id = sim.send_manual(nodes[0], nodes[1]).unwrap();
        assert_eq!(id.into_u64(), 1);
    }

    #[test]
    fn manual_send_bypasses_loss_and_cap() {
        let mut sim = sim();
        sim.set_loss_rate(LossRate::percent(10.0).unwrap());
        sim.set_traffic_load(TrafficLoad::Light);
        let nodes = linear(&mut sim, 2);

        let cap = TrafficLoad::Light.profile().concurrency_cap;
        for _ in 0..cap + 10 {
            sim.send_manual(nodes[0], nodes[1]).unwrap();
        }

        assert_eq!(sim.flows().len(), cap + 10);
        assert_eq!(sim.counters().dropped, 0);
        assert_eq!(sim.tick_generate(), Generation::Shed);
        assert_eq!(sim.counters().shed, 1);
    }

    #[test]
    fn generation_needs_two_nodes() {
        let mut sim = sim();
        assert_eq!(sim.tick_generate(), Generation::NotEnoughNodes);
        sim.add_node(NodeKind::Host);
        assert_eq!(sim.tick_generate(), Generation::NotEnoughNodes);
    }

    #[test]
    fn generation_between_islands_is_unroutable() {
        let mut sim = sim();
        let a = sim.add_node(NodeKind::Host);
        let b = sim.add_node(NodeKind::Host);

        match sim.tick_generate() {
            Generation::Unroutable { from, to } => {
                assert!((from, to) == (a, b) || (from, to) == (b, a));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(sim.counters().unroutable, 1);
        assert!(sim.events().is_empty());
    }

    #[test]
    fn random_flows_use_distinct_existing_endpoints() {
        let mut sim = sim();
        sim.generate_topology(TopologyKind::Mesh);

        for _ in 0..50 {
            if let Generation::Admitted(id) = sim.tick_generate() {
                let flow = sim.flow(id).unwrap();
                assert_ne!(flow.source(), flow.destination());
                assert!(!flow.is_manual());
                assert_eq!(flow.path().len(), 2);
            }
        }
    }

    #[test]
    fn loss_injection_drops_before_transmission() {
        let mut sim = sim();
        sim.set_seed(11);
        sim.set_loss_rate(LossRate::percent(10.0).unwrap());
        linear(&mut sim, 2);

        let mut dropped = None;
        for _ in 0..500 {
            match sim.tick_generate() {
                Generation::Dropped(id) => {
                    dropped = Some(id);
                    break;
                }
                Generation::Admitted(_) => {
                    run_until_idle(&mut sim);
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        let id = dropped.expect("a 10% loss never struck in 500 attempts");
        assert!(sim.flow(id).is_none());
        assert_eq!(sim.counters().dropped, 1);
        // identifiers are consumed by dropped flows too
        assert_eq!(id.into_u64(), sim.counters().created + 1);

        let event = sim.events().for_flow(id).next().unwrap();
        assert_eq!(event.kind, EventKind::Dropped);
        assert_eq!(event.phase, None);
        assert_eq!(event.cwnd, 0.0);
    }

    #[test]
    fn flows_are_delivered() {
        let mut sim = sim();
        let nodes = linear(&mut sim, 3);
        let id = sim.send_manual(nodes[0], nodes[2]).unwrap();

        let mut delivered = Vec::new();
        let mut ticks = 0;
        while sim.flow(id).is_some() {
            sim.tick_advance_with(|flow| delivered.push(flow));
            ticks += 1;
            assert!(ticks < MAX_TICKS);
        }

        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].status(), FlowStatus::Delivered);
        assert_eq!(sim.counters().delivered, 1);
        assert_eq!(sim.round().into_u64(), ticks as u64);
        assert_eq!(sim.elapsed(), sim.config().advance_step * ticks as u32);

        let kinds = kinds_of(&sim, id);
        assert_eq!(kinds.first(), Some(&EventKind::ManualCreated));
        assert_eq!(kinds.last(), Some(&EventKind::Delivered));
    }

    #[test]
    fn hop_entries_drive_slow_start() {
        let mut sim = sim();
        let nodes = linear(&mut sim, 4);
        let id = sim.send_manual(nodes[0], nodes[3]).unwrap();

        sim.tick_advance();
        let flow = sim.flow(id).unwrap();
        assert_eq!(flow.tcp().cwnd(), 2.0);
        // 10ms + 1 unit of congestion
        assert_eq!(flow.tcp().rtt(), 15.0);

        // the second entry only happens on the next node
        sim.tick_advance();
        assert_eq!(sim.flow(id).unwrap().tcp().cwnd(), 2.0);

        while sim.flow(id).is_some_and(|f| f.current_index() < 2) {
            sim.tick_advance();
        }
        sim.tick_advance();
        let flow = sim.flow(id).unwrap();
        assert_eq!(flow.tcp().cwnd(), 8.0);
        assert_eq!(flow.tcp().phase(), Phase::SlowStart);
    }

    #[test]
    fn timeout_marks_lost_but_keeps_travelling() {
        let mut sim = sim();
        let nodes = linear(&mut sim, 3);
        sim.topology
            .node_mut(nodes[0])
            .unwrap()
            .set_congestion(Congestion::new(9.5));

        let id = sim.send_manual(nodes[0], nodes[2]).unwrap();
        sim.tick_advance();

        let flow = sim.flow(id).unwrap();
        assert!(flow.tcp().is_lost());
        assert_eq!(flow.status(), FlowStatus::Lost);
        assert_eq!(flow.tcp().phase(), Phase::SlowStart);
        assert_eq!(sim.stats().lost_percent, 100.0);
        assert!(kinds_of(&sim, id).contains(&EventKind::Timeout));

        run_until_idle(&mut sim);
        assert_eq!(sim.counters().delivered, 1);
        assert_eq!(kinds_of(&sim, id).last(), Some(&EventKind::Delivered));
    }

    #[test]
    fn algorithm_is_fixed_at_admission() {
        let mut sim = sim();
        let nodes = linear(&mut sim, 2);
        let reno = sim.send_manual(nodes[0], nodes[1]).unwrap();
        sim.set_algorithm(Algorithm::Tahoe);
        let tahoe = sim.send_manual(nodes[0], nodes[1]).unwrap();

        assert_eq!(sim.flow(reno).unwrap().tcp().algorithm(), Algorithm::Reno);
        assert_eq!(sim.flow(tahoe).unwrap().tcp().algorithm(), Algorithm::Tahoe);
    }

    #[test]
    fn decay_relieves_congestion() {
        let mut sim = sim();
        let nodes = linear(&mut sim, 2);
        sim.send_manual(nodes[0], nodes[1]).unwrap();

        sim.tick_decay();
        sim.tick_decay();
        let congestion = sim.topology().node(nodes[0]).unwrap().congestion();
        assert!((congestion.value() - 0.6).abs() < 1e-9);

        sim.set_traffic_load(TrafficLoad::Heavy);
        sim.tick_decay();
        let congestion = sim.topology().node(nodes[0]).unwrap().congestion();
        assert!((congestion.value() - 0.5).abs() < 1e-9);

        for _ in 0..10 {
            sim.tick_decay();
        }
        assert_eq!(
            sim.topology().node(nodes[0]).unwrap().congestion(),
            Congestion::ZERO
        );
    }

    #[test]
    fn congestion_saturates() {
        let mut sim = sim();
        sim.set_traffic_load(TrafficLoad::Heavy);
        let nodes = linear(&mut sim, 2);
        for _ in 0..20 {
            sim.send_manual(nodes[0], nodes[1]).unwrap();
        }
        assert_eq!(
            sim.topology().node(nodes[0]).unwrap().congestion(),
            Congestion::MAX
        );
    }

    #[test]
    fn removing_a_node_discards_its_flows() {
        let mut sim = sim();
        let nodes = linear(&mut sim, 3);
        let through = sim.send_manual(nodes[0], nodes[2]).unwrap();
        let around = sim.send_manual(nodes[0], nodes[1]).unwrap();

        sim.remove_node(nodes[2]).unwrap();

        assert!(sim.flow(through).is_none());
        assert!(sim.flow(around).is_some());
        assert_eq!(sim.counters().discarded, 1);
        assert_eq!(kinds_of(&sim, through).last(), Some(&EventKind::Dropped));
        assert!(sim.remove_node(nodes[2]).is_err());
    }

    #[test]
    fn flow_on_a_vanished_node_is_discarded() {
        let mut sim = sim();
        let nodes = linear(&mut sim, 3);
        let id = sim.send_manual(nodes[0], nodes[2]).unwrap();

        // bypass `Simulation::remove_node`, which discards eagerly
        sim.topology.remove_node(nodes[0]).unwrap();
        assert_eq!(sim.tick_advance(), 0);

        assert!(sim.flow(id).is_none());
        assert_eq!(sim.counters().discarded, 1);
        assert_eq!(sim.counters().delivered, 0);
        assert_eq!(kinds_of(&sim, id).last(), Some(&EventKind::Dropped));
    }

    #[test]
    fn generate_topology_resets_first() {
        let mut sim = sim();
        let nodes = linear(&mut sim, 2);
        sim.send_manual(nodes[0], nodes[1]).unwrap();
        sim.tick_advance();

        let star = sim.generate_topology(TopologyKind::Star);

        assert_eq!(star.len(), 7);
        assert_eq!(sim.topology().len(), 7);
        assert!(sim.flows().is_empty());
        assert!(sim.events().is_empty());
        assert_eq!(sim.round(), Round::ZERO);
        assert_eq!(sim.elapsed(), Duration::ZERO);
        assert_eq!(sim.routing_stats().total(), 0);
    }

    #[test]
    fn analyze_route_against_network_average() {
        use crate::topology::HopComparison;

        let mut sim = sim();
        let nodes = linear(&mut sim, 4);

        let analysis = sim.analyze_route(nodes[0], nodes[2]).unwrap();
        assert_eq!(analysis.comparison, HopComparison::NoBaseline);
        assert_eq!(analysis.hops, 2);
        assert_eq!(analysis.total_latency, Latency::from_millis(20));

        sim.send_manual(nodes[0], nodes[3]).unwrap();
        let analysis = sim.analyze_route(nodes[0], nodes[2]).unwrap();
        assert_eq!(analysis.comparison, HopComparison::Shorter);
        assert_eq!(analysis.network_average_hops, Some(3.0));
        assert_eq!(sim.routing_stats().total(), 1);
    }

    #[test]
    fn stats_and_snapshot() {
        let mut sim = sim();
        let nodes = linear(&mut sim, 3);
        sim.send_manual(nodes[0], nodes[2]).unwrap();
        sim.send_manual(nodes[0], nodes[1]).unwrap();
        sim.tick_advance();

        let stats = sim.stats();
        assert_eq!(stats.active_flows, 2);
        assert_eq!(stats.average_cwnd, 2.0);
        assert_eq!(stats.lost_percent, 0.0);
        assert_eq!(stats.phases.get(Phase::SlowStart), 2);
        assert_eq!(stats.min_hops, Some(1));
        assert_eq!(stats.max_hops, Some(2));
        assert_eq!(stats.average_hops, Some(1.5));

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(snapshot.edges.len(), 2);
        assert_eq!(snapshot.flows.len(), 2);
        assert_eq!(snapshot.nodes[0].degree, 1);
        assert_eq!(snapshot.nodes[1].degree, 2);
        assert!(!snapshot.performance_mode);
        assert_eq!(snapshot.stats, stats);

        let detail = sim.flow_snapshot(snapshot.flows[0].id).unwrap();
        assert_eq!(detail.hops_remaining, 2);
        assert_eq!(detail.status, FlowStatus::InTransit);
    }

    #[test]
    fn empty_stats() {
        let stats = sim().stats();
        assert_eq!(stats.active_flows, 0);
        assert_eq!(stats.average_cwnd, 0.0);
        assert_eq!(stats.lost_percent, 0.0);
        assert_eq!(stats.average_hops, None);
    }

    #[test]
    fn tick_dispatch() {
        let mut sim = sim();
        linear(&mut sim, 2);

        sim.tick(Tick::Generate);
        assert_eq!(sim.flows().len(), 1);
        sim.tick(Tick::Advance);
        assert_eq!(sim.round().into_u64(), 1);
        sim.tick(Tick::Decay);
        assert!(sim.topology().nodes().all(|n| n.congestion().value() < 1.0));
    }

    #[test]
    fn runs_replay_with_the_same_seed() {
        let run = |seed| {
            let mut sim = Simulation::new(SimConfig {
                seed,
                loss_rate: LossRate::percent(5.0).unwrap(),
                traffic_load: TrafficLoad::Heavy,
                ..SimConfig::default()
            });
            sim.generate_topology(TopologyKind::RandomTree);
            for round in 0..2_000 {
                sim.tick_advance();
                if round % 3 == 0 {
                    sim.tick_generate();
                }
                if round % 5 == 0 {
                    sim.tick_decay();
                }
            }
            (sim.snapshot(), sim.events().records())
        };

        assert_eq!(run(42), run(42));
    }

    #[test]
    fn invariants_hold_under_load() {
        for algorithm in [Algorithm::Reno, Algorithm::Tahoe] {
            let mut sim = Simulation::new(SimConfig {
                seed: 7,
                algorithm,
                traffic_load: TrafficLoad::Heavy,
                ..SimConfig::default()
            });
            sim.generate_topology(TopologyKind::Tree);

            for round in 0..3_000 {
                sim.tick_generate();
                sim.tick_advance();
                if round % 10 == 0 {
                    sim.tick_decay();
                }

                assert!(sim.events().len() <= crate::defaults::EVENT_LOG_CAPACITY);
                for flow in sim.flows() {
                    let tcp = flow.tcp();
                    assert!(tcp.cwnd() >= 1.0);
                    assert!(tcp.ssthresh() >= 2.0);
                    assert!(flow.current_index() < flow.path().len());
                    assert!((0.0..1.0).contains(&flow.progress()));
                    if algorithm == Algorithm::Tahoe {
                        assert_ne!(tcp.phase(), Phase::FastRecovery);
                    }
                }
                for node in sim.topology().nodes() {
                    assert!((0.0..=10.0).contains(&node.congestion().value()));
                }
            }
            assert!(sim.counters().delivered > 0);
        }
    }
}
