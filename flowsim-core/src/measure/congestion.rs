use crate::defaults::{
    DUPLICATE_SIGNAL_THRESHOLD, INFLATION_THRESHOLD, MAX_CONGESTION, TIMEOUT_THRESHOLD,
};
use serde::Serialize;
use std::fmt;

/// The congestion accumulator of a node.
///
/// A continuous value that always stays within `[0, 10]`: every update
/// clamps, there is no way to build an out of range value.
///
/// ```
/// # use flowsim_core::measure::{Congestion, Severity};
/// let congestion = Congestion::new(12.5);
/// assert_eq!(congestion.value(), 10.0);
/// assert_eq!(congestion.severity(), Severity::Timeout);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
pub struct Congestion(f64);

/// Discrete banding of a [`Congestion`] value.
///
/// | band       | accumulator |
/// |------------|-------------|
/// | `low`      | `<= 1`      |
/// | `medium`   | `<= 3`      |
/// | `high`     | `<= 7`      |
/// | `critical` | `<= 9`      |
/// | `timeout`  | `> 9`       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    Timeout,
}

impl Congestion {
    pub const ZERO: Self = Self(0.0);
    pub const MAX: Self = Self(MAX_CONGESTION);

    /// Build a congestion value, clamping it to `[0, 10]`.
    ///
    /// `NaN` is treated as `0`.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, MAX_CONGESTION))
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// add `amount` to the accumulator, saturating at the maximum
    #[must_use = "function does not modify the current value"]
    pub fn increase(self, amount: f64) -> Self {
        Self::new(self.0 + amount)
    }

    /// remove `amount` from the accumulator, saturating at `0`
    #[must_use = "function does not modify the current value"]
    pub fn decrease(self, amount: f64) -> Self {
        Self::new(self.0 - amount)
    }

    pub fn severity(self) -> Severity {
        Severity::of(self)
    }

    /// the node is congested enough to lose the segment entirely
    #[inline]
    pub fn is_timeout(self) -> bool {
        self.0 > TIMEOUT_THRESHOLD
    }

    /// the node is congested enough to produce duplicate acknowledgments
    #[inline]
    pub fn is_duplicate_signal(self) -> bool {
        self.0 > DUPLICATE_SIGNAL_THRESHOLD
    }

    /// the node is congested enough to keep a fast recovery inflating
    #[inline]
    pub fn is_inflating(self) -> bool {
        self.0 > INFLATION_THRESHOLD
    }
}

impl Severity {
    pub fn of(congestion: Congestion) -> Self {
        match congestion.value() {
            v if v <= 1.0 => Self::Low,
            v if v <= 3.0 => Self::Medium,
            v if v <= DUPLICATE_SIGNAL_THRESHOLD => Self::High,
            v if v <= TIMEOUT_THRESHOLD => Self::Critical,
            _ => Self::Timeout,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for Congestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
