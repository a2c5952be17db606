use crate::{
    defaults::{
        DELAY_PER_CONGESTION_UNIT_MS, DUPLICATE_SIGNAL_LIMIT, FAST_RECOVERY_INFLATION,
        INITIAL_CWND, INITIAL_SSTHRESH, MIN_CWND, MIN_SSTHRESH, MSS_BYTES,
    },
    event::EventKind,
    measure::{Congestion, Latency},
};
use serde::Serialize;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Congestion control phase of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    SlowStart,
    CongestionAvoidance,
    /// transient: set and overwritten within the same hop-entry
    FastRetransmit,
    /// only reachable with [`Algorithm::Reno`]
    FastRecovery,
}

/// The congestion control variant.
///
/// Both react to a timeout the same way; they differ on what follows a
/// fast retransmit: Reno enters fast recovery, Tahoe restarts slow start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    Reno,
    Tahoe,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown congestion control algorithm `{0}', expected reno or tahoe")]
pub struct AlgorithmParseError(String);

/// Per flow TCP-like state machine.
///
/// Evaluated once per hop-entry against the entry node, see
/// [`TcpState::on_hop_entry`]. The window and threshold are real valued,
/// in MSS, and never drop below [`MIN_CWND`] and [`MIN_SSTHRESH`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TcpState {
    algorithm: Algorithm,
    cwnd: f64,
    ssthresh: f64,
    phase: Phase,
    duplicate_signals: u32,
    /// milliseconds
    rtt: f64,
    lost: bool,
    retransmitted: bool,
}

impl Phase {
    pub const ALL: [Self; 4] = [
        Self::SlowStart,
        Self::CongestionAvoidance,
        Self::FastRetransmit,
        Self::FastRecovery,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SlowStart => "slow_start",
            Self::CongestionAvoidance => "congestion_avoidance",
            Self::FastRetransmit => "fast_retransmit",
            Self::FastRecovery => "fast_recovery",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reno => "reno",
            Self::Tahoe => "tahoe",
        }
    }

    pub fn has_fast_recovery(self) -> bool {
        matches!(self, Self::Reno)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = AlgorithmParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reno" => Ok(Self::Reno),
            "tahoe" => Ok(Self::Tahoe),
            _ => Err(AlgorithmParseError(s.to_owned())),
        }
    }
}

/// halve the window, keeping the threshold floor
fn halve(cwnd: f64) -> f64 {
    (cwnd / 2.0).max(MIN_SSTHRESH)
}

impl TcpState {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            cwnd: INITIAL_CWND,
            ssthresh: INITIAL_SSTHRESH,
            phase: Phase::SlowStart,
            duplicate_signals: 0,
            rtt: 0.0,
            lost: false,
            retransmitted: false,
        }
    }

    #[inline]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// congestion window, in MSS
    #[inline]
    pub fn cwnd(&self) -> f64 {
        self.cwnd
    }

    /// slow-start threshold, in MSS
    #[inline]
    pub fn ssthresh(&self) -> f64 {
        self.ssthresh
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn duplicate_signals(&self) -> u32 {
        self.duplicate_signals
    }

    /// round-trip time estimate of the current hop, in milliseconds
    #[inline]
    pub fn rtt(&self) -> f64 {
        self.rtt
    }

    #[inline]
    pub fn is_lost(&self) -> bool {
        self.lost
    }

    #[inline]
    pub fn is_retransmitted(&self) -> bool {
        self.retransmitted
    }

    /// Throughput estimate in Mbps: one window per round trip.
    ///
    /// `0` until a round trip was estimated.
    pub fn throughput_mbps(&self) -> f64 {
        if self.rtt > 0.0 {
            self.cwnd * MSS_BYTES * 8.0 / (self.rtt / 1_000.0) / 1_000_000.0
        } else {
            0.0
        }
    }

    /// Advance the state machine on entering a node.
    ///
    /// The round-trip estimate is refreshed from the node first, then the
    /// first matching rule applies:
    ///
    /// 1. timeout (congestion above 9): window collapses, flow is lost;
    /// 2. duplicate signal (above 7): counted, the third one fires a fast
    ///    retransmit;
    /// 3. inflation (above 5, in fast recovery): window grows by one;
    /// 4. normal acknowledgment: leaves fast recovery, or grows the window.
    ///
    /// Returns the event describing what happened, `None` when a duplicate
    /// signal was only counted.
    pub fn on_hop_entry(&mut self, latency: Latency, congestion: Congestion) -> Option<EventKind> {
        self.rtt = latency.as_millis_f64() + congestion.value() * DELAY_PER_CONGESTION_UNIT_MS;

        if congestion.is_timeout() {
            self.ssthresh = halve(self.cwnd);
            self.cwnd = MIN_CWND;
            self.phase = Phase::SlowStart;
            self.lost = true;
            self.duplicate_signals = 0;
            return Some(EventKind::Timeout);
        }

        if congestion.is_duplicate_signal() {
            self.duplicate_signals += 1;
            if self.duplicate_signals < DUPLICATE_SIGNAL_LIMIT {
                return None;
            }
            self.fast_retransmit();
            return Some(EventKind::FastRetransmit);
        }

        if congestion.is_inflating() && self.phase == Phase::FastRecovery {
            self.cwnd += 1.0;
            return Some(EventKind::CwndInflation);
        }

        self.duplicate_signals = 0;

        match self.phase {
            Phase::FastRecovery => {
                self.cwnd = self.ssthresh;
                self.phase = Phase::CongestionAvoidance;
                Some(EventKind::ExitFastRecovery)
            }
            Phase::SlowStart => {
                self.cwnd = (self.cwnd * 2.0).min(self.ssthresh);
                if self.cwnd >= self.ssthresh {
                    self.phase = Phase::CongestionAvoidance;
                    Some(EventKind::PhaseTransitionCa)
                } else {
                    Some(EventKind::AckReceived)
                }
            }
            Phase::CongestionAvoidance => {
                self.cwnd += 1.0 / self.cwnd.max(1.0);
                Some(EventKind::AckReceived)
            }
            Phase::FastRetransmit => Some(EventKind::AckReceived),
        }
    }

    fn fast_retransmit(&mut self) {
        self.phase = Phase::FastRetransmit;
        self.ssthresh = halve(self.cwnd);
        self.phase = if self.algorithm.has_fast_recovery() {
            self.cwnd = self.ssthresh + FAST_RECOVERY_INFLATION;
            Phase::FastRecovery
        } else {
            self.cwnd = MIN_CWND;
            Phase::SlowStart
        };
        self.retransmitted = true;
        self.duplicate_signals = 0;
    }
}
