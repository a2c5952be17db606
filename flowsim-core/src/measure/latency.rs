use crate::time::{Interval, IntervalParseError};
use serde::{Serialize, Serializer};
use std::{fmt, iter::Sum, ops::Add, str::FromStr, time::Duration};

/// The time a node takes to forward traffic to its next hop.
///
/// The traversal cost of a path is the sum of the [`Latency`] of every
/// node that is *left*: going `A -> B` costs `latency(A)`.
///
/// Precision is the microsecond; anything finer is truncated. Serialized
/// as (fractional) milliseconds.
///
/// ```
/// # use flowsim_core::measure::Latency;
/// let total: Latency = [Latency::from_millis(10), Latency::from_millis(20)]
///     .into_iter()
///     .sum();
/// assert_eq!(total.to_string(), "30ms");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Latency(u64);

impl Latency {
    /// No latency at all.
    pub const ZERO: Self = Self(0);

    /// create a latency from a [`Duration`], truncated to the microsecond.
    #[inline(always)]
    pub const fn new(duration: Duration) -> Self {
        Self(duration.as_micros() as u64)
    }

    #[inline(always)]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000)
    }

    #[inline(always)]
    pub fn into_duration(self) -> Duration {
        Duration::from_micros(self.0)
    }

    /// the latency in (fractional) milliseconds
    #[inline]
    pub fn as_millis_f64(self) -> f64 {
        self.0 as f64 / 1_000.0
    }
}

impl Add for Latency {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Latency {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Duration> for Latency {
    fn from(value: Duration) -> Self {
        Self::new(value)
    }
}

impl From<Latency> for Duration {
    fn from(value: Latency) -> Self {
        value.into_duration()
    }
}

impl Serialize for Latency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_millis_f64())
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Interval::new(self.into_duration()), f)
    }
}

impl FromStr for Latency {
    type Err = IntervalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let interval: Interval = s.parse()?;
        Ok(Self::new(interval.into_duration()))
    }
}
