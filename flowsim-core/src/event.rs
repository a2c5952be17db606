//! The bounded, sampled record of everything that happened to the flows.
//!
//! Important events (creation, delivery, drop, timeout, fast retransmit,
//! fast recovery exit) are always kept. The others are retained with a
//! fixed probability so the log keeps the statistical shape of the run
//! without growing with it. The log never holds more than its capacity,
//! the oldest entries being evicted first.

use crate::{
    defaults::{EVENT_LOG_CAPACITY, EVENT_SAMPLE_RATE},
    flow::{Flow, FlowId, Phase},
    measure::Congestion,
    random,
};
use rand_chacha::ChaChaRng;
use rand_core::SeedableRng as _;
use serde::Serialize;
use std::{
    collections::{BTreeSet, VecDeque},
    fmt, io,
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    ManualCreated,
    AckReceived,
    #[serde(rename = "phase_transition_CA")]
    PhaseTransitionCa,
    FastRetransmit,
    Timeout,
    ExitFastRecovery,
    CwndInflation,
    HopCompleted,
    Delivered,
    Dropped,
}

/// A recorded state of a flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// simulated time since the last reset
    pub time: Duration,
    pub flow_id: FlowId,
    pub cwnd: f64,
    /// `None` for flows dropped before transmission
    pub phase: Option<Phase>,
    /// milliseconds
    pub rtt: f64,
    pub kind: EventKind,
    /// Mbps
    pub throughput: f64,
    /// congestion of the node the flow was at
    pub congestion: Congestion,
}

/// Flat export row of an [`Event`].
///
/// Fields are in export order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    /// seconds
    pub time: f64,
    pub flow_id: u64,
    pub cwnd: f64,
    pub phase: &'static str,
    pub rtt: f64,
    pub event_type: &'static str,
    pub throughput: f64,
}

/// See the [module](self) documentation.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<Event>,
    capacity: usize,
    sample_rate: f64,
    rng: ChaChaRng,
}

impl EventKind {
    pub const ALL: [Self; 11] = [
        Self::Created,
        Self::ManualCreated,
        Self::AckReceived,
        Self::PhaseTransitionCa,
        Self::FastRetransmit,
        Self::Timeout,
        Self::ExitFastRecovery,
        Self::CwndInflation,
        Self::HopCompleted,
        Self::Delivered,
        Self::Dropped,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::ManualCreated => "manual_created",
            Self::AckReceived => "ack_received",
            Self::PhaseTransitionCa => "phase_transition_CA",
            Self::FastRetransmit => "fast_retransmit",
            Self::Timeout => "timeout",
            Self::ExitFastRecovery => "exit_fast_recovery",
            Self::CwndInflation => "cwnd_inflation",
            Self::HopCompleted => "hop_completed",
            Self::Delivered => "delivered",
            Self::Dropped => "dropped",
        }
    }

    /// important events bypass the sampling
    pub fn is_important(self) -> bool {
        matches!(
            self,
            Self::Created
                | Self::ManualCreated
                | Self::Delivered
                | Self::Dropped
                | Self::Timeout
                | Self::FastRetransmit
                | Self::ExitFastRecovery
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Event {
    /// Capture the state of `flow`.
    pub fn of(flow: &Flow, kind: EventKind, time: Duration, congestion: Congestion) -> Self {
        let tcp = flow.tcp();
        Self {
            time,
            flow_id: flow.id(),
            cwnd: tcp.cwnd(),
            phase: Some(tcp.phase()),
            rtt: tcp.rtt(),
            kind,
            throughput: tcp.throughput_mbps(),
            congestion,
        }
    }

    /// A flow dropped before it was ever transmitted.
    pub fn dropped(flow_id: FlowId, time: Duration) -> Self {
        Self {
            time,
            flow_id,
            cwnd: 0.0,
            phase: None,
            rtt: 0.0,
            kind: EventKind::Dropped,
            throughput: 0.0,
            congestion: Congestion::ZERO,
        }
    }

    pub fn to_record(&self) -> ExportRecord {
        ExportRecord {
            time: self.time.as_secs_f64(),
            flow_id: self.flow_id.into_u64(),
            cwnd: self.cwnd,
            phase: self.phase.map_or(EventKind::Dropped.as_str(), Phase::as_str),
            rtt: self.rtt,
            event_type: self.kind.as_str(),
            throughput: self.throughput,
        }
    }
}

impl ExportRecord {
    pub const CSV_HEADER: &'static str = "time,flow_id,cwnd,phase,rtt,event_type,throughput";

    pub fn write_csv_row<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(
            writer,
            "{:.3},{},{:.3},{},{:.2},{},{:.4}",
            self.time,
            self.flow_id,
            self.cwnd,
            self.phase,
            self.rtt,
            self.event_type,
            self.throughput
        )
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            sample_rate: EVENT_SAMPLE_RATE,
            rng: ChaChaRng::seed_from_u64(0),
        }
    }

    /// Re-seed the sampling decisions.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = ChaChaRng::seed_from_u64(seed);
    }

    /// Set the retention probability of the non-important events.
    ///
    /// Clamped to `[0, 1]`.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate.clamp(0.0, 1.0);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an event, subject to sampling.
    ///
    /// Returns `false` if the event was sampled out.
    pub fn record(&mut self, event: Event) -> bool {
        if !event.kind.is_important() && !random::chance(&mut self.rng, self.sample_rate) {
            return false;
        }

        if self.capacity == 0 {
            return false;
        }
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
        true
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// The retained events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn for_flow(&self, flow_id: FlowId) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.flow_id == flow_id)
    }

    /// Identifiers of the flows with retained events, in first-seen order.
    pub fn flow_ids(&self) -> Vec<FlowId> {
        let mut seen = BTreeSet::new();
        self.events
            .iter()
            .map(|e| e.flow_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// The retained events as flat records, in insertion order.
    pub fn records(&self) -> Vec<ExportRecord> {
        self.events.iter().map(Event::to_record).collect()
    }

    /// Write the whole log as CSV, header first.
    pub fn write_csv<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(writer, "{}", ExportRecord::CSV_HEADER)?;
        for event in &self.events {
            event.to_record().write_csv_row(&mut writer)?;
        }
        Ok(())
    }
}
