use serde::Serialize;
use std::fmt;

/// the number of advance ticks since the last reset
///
/// Every [`Simulation::tick_advance`] moves to the next round; the decay
/// and generation ticks do not.
///
/// [`Simulation::tick_advance`]: crate::Simulation::tick_advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Round(u64);

impl Round {
    pub const ZERO: Self = Round(0);

    /// get the next round.
    ///
    /// ```
    /// # use flowsim_core::Round;
    /// let prev = Round::ZERO;
    /// let next = prev.next();
    /// assert!(prev < next);
    /// ```
    ///
    /// Wraps to [`Round::ZERO`] after `u64::MAX`.
    #[inline(always)]
    #[must_use = "function does not modify the current value"]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    #[inline(always)]
    pub fn into_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
