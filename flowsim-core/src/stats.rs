//! Simulation statistics and observability types.
//!
//! [`SimSnapshot`] is a point-in-time copy of everything a renderer needs;
//! obtain one via [`Simulation::snapshot`]. [`SimStats`] holds the
//! aggregates only, see [`Simulation::stats`].
//!
//! [`Simulation::snapshot`]: crate::Simulation::snapshot
//! [`Simulation::stats`]: crate::Simulation::stats

use crate::{
    defaults::{MSS_BYTES, PATH_HISTORY_CAPACITY, PERFORMANCE_HISTORY_CAPACITY},
    flow::{Algorithm, Flow, FlowId, FlowStatus, Phase},
    load::TrafficLoad,
    measure::{Congestion, Latency, LossRate, Severity},
    node::{Node, NodeId, NodeKind},
    round::Round,
    topology::{Edge, Route},
};
use serde::Serialize;
use std::{collections::VecDeque, io, time::Duration};

/// Snapshot of a single active flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSnapshot {
    pub id: FlowId,
    pub source: NodeId,
    pub destination: NodeId,
    pub path: Vec<NodeId>,
    /// index in the path of the node being left
    pub current_index: usize,
    /// fraction of the current hop already travelled
    pub progress: f64,
    pub progress_percent: u8,
    pub hops_remaining: usize,
    pub algorithm: Algorithm,
    pub phase: Phase,
    pub cwnd: f64,
    pub ssthresh: f64,
    pub duplicate_signals: u32,
    /// milliseconds
    pub rtt: f64,
    /// Mbps
    pub throughput: f64,
    pub lost: bool,
    pub retransmitted: bool,
    pub manual: bool,
    pub status: FlowStatus,
}

/// Snapshot of a single node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub latency: Latency,
    /// Mbps
    pub throughput: u64,
    pub congestion: Congestion,
    pub severity: Severity,
    pub degree: usize,
}

/// Number of active flows in each phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PhaseCounts {
    pub slow_start: usize,
    pub congestion_avoidance: usize,
    pub fast_retransmit: usize,
    pub fast_recovery: usize,
}

/// A routed path remembered by the [`RoutingStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PathRecord {
    pub hops: usize,
    pub cost: Latency,
    pub time: Duration,
}

/// Running statistics over every admitted flow's route.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RoutingStats {
    total: u64,
    average_hops: f64,
    min_hops: Option<usize>,
    max_hops: usize,
    history: VecDeque<PathRecord>,
}

/// Latency and throughput sample, taken on every admission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceSample {
    pub time: Duration,
    pub latency: Latency,
    /// Mbps
    pub throughput: f64,
}

/// The most recent [`PerformanceSample`]s.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PerformanceHistory {
    samples: VecDeque<PerformanceSample>,
}

/// Monotonic counters since the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Counters {
    /// flows admitted, random or manual
    pub created: u64,
    pub delivered: u64,
    /// random flows lost to the loss injection
    pub dropped: u64,
    /// random flows refused by the concurrency cap
    pub shed: u64,
    /// random generation attempts between unconnected nodes
    pub unroutable: u64,
    /// active flows discarded because a node of their path was removed
    pub discarded: u64,
}

/// Aggregate statistics of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimStats {
    pub round: Round,
    pub elapsed: Duration,
    pub algorithm: Algorithm,
    pub traffic_load: TrafficLoad,
    pub loss_rate: LossRate,
    pub active_flows: usize,
    /// `0` without active flows
    pub average_cwnd: f64,
    /// percentage of the active flows marked lost
    pub lost_percent: f64,
    pub phases: PhaseCounts,
    pub routed: u64,
    pub average_hops: Option<f64>,
    pub min_hops: Option<usize>,
    pub max_hops: Option<usize>,
    pub counters: Counters,
    pub events: usize,
}

/// Point-in-time copy of the whole simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimSnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<Edge>,
    pub flows: Vec<FlowSnapshot>,
    pub performance_mode: bool,
    pub stats: SimStats,
}

impl FlowSnapshot {
    pub fn of(flow: &Flow) -> Self {
        let tcp = flow.tcp();
        Self {
            id: flow.id(),
            source: flow.source(),
            destination: flow.destination(),
            path: flow.path().to_vec(),
            current_index: flow.current_index(),
            progress: flow.progress(),
            progress_percent: flow.progress_percent(),
            hops_remaining: flow.hops_remaining(),
            algorithm: tcp.algorithm(),
            phase: tcp.phase(),
            cwnd: tcp.cwnd(),
            ssthresh: tcp.ssthresh(),
            duplicate_signals: tcp.duplicate_signals(),
            rtt: tcp.rtt(),
            throughput: tcp.throughput_mbps(),
            lost: tcp.is_lost(),
            retransmitted: tcp.is_retransmitted(),
            manual: flow.is_manual(),
            status: flow.status(),
        }
    }
}

impl NodeSnapshot {
    pub fn of(node: &Node) -> Self {
        Self {
            id: node.id(),
            name: node.name().to_owned(),
            kind: node.kind(),
            latency: node.latency(),
            throughput: node.throughput(),
            congestion: node.congestion(),
            severity: node.congestion().severity(),
            degree: node.neighbors().len(),
        }
    }
}

impl PhaseCounts {
    pub fn add(&mut self, phase: Phase) {
        *self.get_mut(phase) += 1;
    }

    pub fn get(&self, phase: Phase) -> usize {
        match phase {
            Phase::SlowStart => self.slow_start,
            Phase::CongestionAvoidance => self.congestion_avoidance,
            Phase::FastRetransmit => self.fast_retransmit,
            Phase::FastRecovery => self.fast_recovery,
        }
    }

    fn get_mut(&mut self, phase: Phase) -> &mut usize {
        match phase {
            Phase::SlowStart => &mut self.slow_start,
            Phase::CongestionAvoidance => &mut self.congestion_avoidance,
            Phase::FastRetransmit => &mut self.fast_retransmit,
            Phase::FastRecovery => &mut self.fast_recovery,
        }
    }
}

impl FromIterator<Phase> for PhaseCounts {
    fn from_iter<I: IntoIterator<Item = Phase>>(iter: I) -> Self {
        let mut counts = Self::default();
        for phase in iter {
            counts.add(phase);
        }
        counts
    }
}

impl RoutingStats {
    pub fn record(&mut self, route: &Route, time: Duration) {
        let hops = route.hops();

        self.total += 1;
        self.average_hops += (hops as f64 - self.average_hops) / self.total as f64;
        self.min_hops = Some(self.min_hops.map_or(hops, |min| min.min(hops)));
        self.max_hops = self.max_hops.max(hops);

        if self.history.len() >= PATH_HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(PathRecord {
            hops,
            cost: route.cost(),
            time,
        });
    }

    /// number of routes recorded
    pub fn total(&self) -> u64 {
        self.total
    }

    /// `None` until a route was recorded
    pub fn average_hops(&self) -> Option<f64> {
        (self.total > 0).then_some(self.average_hops)
    }

    pub fn min_hops(&self) -> Option<usize> {
        self.min_hops
    }

    pub fn max_hops(&self) -> Option<usize> {
        (self.total > 0).then_some(self.max_hops)
    }

    /// most recent routes, oldest first
    pub fn history(&self) -> impl Iterator<Item = &PathRecord> {
        self.history.iter()
    }
}

impl PerformanceHistory {
    pub const CSV_HEADER: &'static str = "time,latency,throughput";

    /// Record an admission at `time` of a route of the given latency.
    ///
    /// The throughput is one segment over the time since the previous
    /// sample; the previous throughput is repeated when no time passed.
    pub fn record(&mut self, time: Duration, latency: Latency) {
        let throughput = match self.samples.back() {
            None => 0.0,
            Some(previous) => {
                let dt = time.saturating_sub(previous.time).as_secs_f64();
                if dt > 0.0 {
                    MSS_BYTES * 8.0 / (dt * 1_000_000.0)
                } else {
                    previous.throughput
                }
            }
        };

        if self.samples.len() >= PERFORMANCE_HISTORY_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(PerformanceSample {
            time,
            latency,
            throughput,
        });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// oldest first
    pub fn samples(&self) -> impl Iterator<Item = &PerformanceSample> {
        self.samples.iter()
    }

    /// Write the samples as CSV: seconds, milliseconds, Mbps.
    pub fn write_csv<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(writer, "{}", Self::CSV_HEADER)?;
        for sample in &self.samples {
            writeln!(
                writer,
                "{:.3},{:.3},{:.6}",
                sample.time.as_secs_f64(),
                sample.latency.as_millis_f64(),
                sample.throughput
            )?;
        }
        Ok(())
    }
}
