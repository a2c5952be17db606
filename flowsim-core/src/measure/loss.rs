use crate::random;
use rand_core::Rng;
use serde::Serialize;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Probability that a randomly generated flow is lost before it is even
/// transmitted.
///
/// Expressed in percent and limited to `[0, 10]`.
///
/// ```
/// use flowsim_core::measure::LossRate;
///
/// let none = LossRate::NONE;
/// assert_eq!(none.to_string(), "0%");
///
/// let lossy = LossRate::percent(2.5).unwrap();
/// assert_eq!(lossy.to_string(), "2.50%");
///
/// let parsed: LossRate = "2.5%".parse().unwrap();
/// assert_eq!(parsed, lossy);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
pub struct LossRate(f64);

/// Error returned when building a [`LossRate`] outside of `[0, 10]` percent.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("loss rate must be within [0, {max}]%, got {0}", max = LossRate::MAX_PERCENT)]
pub struct LossRateError(f64);

/// Error returned when parsing a [`LossRate`] from a string.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LossRateParseError {
    #[error("expected '%' suffix")]
    MissingSuffix,
    #[error("invalid number before '%'")]
    InvalidNumber,
    #[error(transparent)]
    OutOfRange(#[from] LossRateError),
}

impl LossRate {
    /// Highest configurable loss rate, in percent.
    pub const MAX_PERCENT: f64 = 10.0;

    pub const NONE: Self = Self(0.0);

    /// Create a loss rate from a percentage.
    ///
    /// # Errors
    ///
    /// Returns [`LossRateError`] if `percent` is NaN, negative or above
    /// [`LossRate::MAX_PERCENT`].
    pub fn percent(percent: f64) -> Result<Self, LossRateError> {
        if !(0.0..=Self::MAX_PERCENT).contains(&percent) {
            return Err(LossRateError(percent));
        }
        Ok(Self(percent))
    }

    #[inline]
    pub fn as_percent(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn probability(self) -> f64 {
        self.0 / 100.0
    }

    /// Returns `true` if the flow should be dropped before transmission.
    ///
    /// A zero rate never consumes randomness.
    pub fn should_drop<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        if self.0 == 0.0 {
            return false;
        }
        random::chance(rng, self.probability())
    }
}

impl fmt::Display for LossRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{}%", self.0 as u64)
        } else {
            write!(f, "{:.2}%", self.0)
        }
    }
}

impl FromStr for LossRate {
    type Err = LossRateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(number) = s.trim().strip_suffix('%') else {
            return Err(LossRateParseError::MissingSuffix);
        };
        let percent: f64 = number
            .trim()
            .parse()
            .map_err(|_| LossRateParseError::InvalidNumber)?;
        Ok(Self::percent(percent)?)
    }
}
