//! Default values and fixed constants of the simulation.
//!
//! The congestion-control constants are those of the simplified,
//! instructional algorithm and do not follow any RFC timing.

use crate::measure::Latency;
use std::{ops::RangeInclusive, time::Duration};

/// Maximum Segment Size in bytes.
///
/// Only used to turn a congestion window (in MSS) into a throughput
/// estimate.
pub const MSS_BYTES: f64 = 1_500.0;

/// Initial congestion window of every new flow, in MSS.
pub const INITIAL_CWND: f64 = 1.0;

/// Initial slow-start threshold of every new flow, in MSS.
pub const INITIAL_SSTHRESH: f64 = 64.0;

/// The congestion window never goes below this value.
pub const MIN_CWND: f64 = 1.0;

/// The slow-start threshold never goes below this value.
pub const MIN_SSTHRESH: f64 = 2.0;

/// Number of consecutive duplicate signals that fires a fast retransmit.
pub const DUPLICATE_SIGNAL_LIMIT: u32 = 3;

/// Additional cwnd granted on a fast retransmit under Reno, in MSS.
pub const FAST_RECOVERY_INFLATION: f64 = 3.0;

/// Extra round-trip delay, in milliseconds, per unit of node congestion.
pub const DELAY_PER_CONGESTION_UNIT_MS: f64 = 5.0;

/// Upper bound of a node's congestion accumulator.
pub const MAX_CONGESTION: f64 = 10.0;

/// Above this congestion level a hop-entry is a timeout.
pub const TIMEOUT_THRESHOLD: f64 = 9.0;

/// Above this congestion level a hop-entry is a duplicate signal.
pub const DUPLICATE_SIGNAL_THRESHOLD: f64 = 7.0;

/// Above this congestion level a flow in fast recovery inflates its window.
pub const INFLATION_THRESHOLD: f64 = 5.0;

/// Fraction of a hop travelled per advance tick on an idle node.
pub const BASE_SPEED: f64 = 0.05;

/// Slowest fraction of a hop travelled per advance tick.
pub const FLOOR_SPEED: f64 = 0.01;

/// Speed reduction per unit of congestion.
pub const SPEED_DAMPING: f64 = 0.05;

/// Hard cap of retained events in the [`EventLog`].
///
/// [`EventLog`]: crate::event::EventLog
pub const EVENT_LOG_CAPACITY: usize = 500;

/// Retention probability of the non-important events.
pub const EVENT_SAMPLE_RATE: f64 = 0.10;

/// Number of routed paths remembered by the routing statistics.
pub const PATH_HISTORY_CAPACITY: usize = 100;

/// Number of samples kept in the performance history.
pub const PERFORMANCE_HISTORY_CAPACITY: usize = 50;

/// Range of node latencies, in milliseconds, drawn when none is given.
pub const NODE_LATENCY_MS: RangeInclusive<u64> = 5..=50;

/// Range of node throughputs, in Mbps, drawn when none is given.
pub const NODE_THROUGHPUT_MBPS: RangeInclusive<u64> = 100..=1_000;

/// Default node [`Latency`] when built without randomness.
///
/// ```
/// # use flowsim_core::defaults::*;
/// assert_eq!(DEFAULT_NODE_LATENCY.to_string(), "10ms");
/// ```
pub const DEFAULT_NODE_LATENCY: Latency = Latency::from_millis(10);

/// Simulated time elapsed on every advance tick.
pub const DEFAULT_ADVANCE_STEP: Duration = Duration::from_millis(100);

/// Interval between two congestion decay ticks.
pub const DEFAULT_DECAY_INTERVAL: Duration = Duration::from_millis(500);

/// Default node throughput, in Mbps, when built without randomness.
pub const DEFAULT_NODE_THROUGHPUT: u64 = 1_000;
