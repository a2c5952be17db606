use serde::Serialize;
use std::fmt;

/// a generator for monotonically increasing **unique** [`FlowId`]
///
/// The first identifier is `1`. Identifiers are consumed by dropped flows
/// as well, so the sequence has gaps where the loss injection struck.
#[derive(Debug, Clone, Default)]
pub struct FlowIdGenerator(u64);

/// # Flow Identifier
///
/// During the lifetime of the simulation, this identifier can uniquely
/// identify the flow, including in the [`EventLog`].
///
/// [`EventLog`]: crate::event::EventLog
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FlowId(u64);

impl FlowIdGenerator {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn generate(&mut self) -> FlowId {
        self.0 += 1;
        FlowId(self.0)
    }

    /// the last identifier handed out, if any
    pub fn last(&self) -> Option<FlowId> {
        (self.0 > 0).then_some(FlowId(self.0))
    }
}

impl FlowId {
    #[inline]
    pub fn into_u64(self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_from_one() {
        let mut generator = FlowIdGenerator::new();
        assert_eq!(generator.last(), None);

        let first = generator.generate();
        let second = generator.generate();

        assert_eq!(first.into_u64(), 1);
        assert_eq!(second.into_u64(), 2);
        assert!(first < second);
        assert_eq!(generator.last(), Some(second));
    }

    #[test]
    fn print() {
        assert_eq!(FlowId(7).to_string(), "7");
    }
}
