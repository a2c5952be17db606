use crate::runner::slot;
use flowsim_core::{
    defaults::{DEFAULT_ADVANCE_STEP, DEFAULT_DECAY_INTERVAL},
    Tick, TrafficLoad,
};
use std::time::{Duration, Instant};

/// How often the runner fires each [`Tick`].
///
/// The generation interval is not part of the schedule: it follows the
/// [`TrafficLoad`] the simulation currently runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub advance_every: Duration,
    pub decay_every: Duration,
    /// how long the runner sleeps between two checks of its timers
    pub poll: Duration,
}

pub const DEFAULT_POLL: Duration = Duration::from_millis(10);

impl Schedule {
    pub fn interval(&self, tick: Tick, load: TrafficLoad) -> Duration {
        match tick {
            Tick::Advance => self.advance_every,
            Tick::Decay => self.decay_every,
            Tick::Generate => load.profile().generation_interval,
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            advance_every: DEFAULT_ADVANCE_STEP,
            decay_every: DEFAULT_DECAY_INTERVAL,
            poll: DEFAULT_POLL,
        }
    }
}

/// Next due instant of every tick.
///
/// A late timer fires once then re-arms from the instant it fired: missed
/// periods are never replayed.
#[derive(Debug, Clone)]
pub(crate) struct Timers {
    due: [Instant; Tick::ALL.len()],
}

impl Timers {
    pub(crate) fn new(now: Instant, schedule: &Schedule, load: TrafficLoad) -> Self {
        Self {
            due: Tick::ALL.map(|tick| now + schedule.interval(tick, load)),
        }
    }

    /// Every timer starts a fresh period from `now`.
    pub(crate) fn restart(&mut self, now: Instant, schedule: &Schedule, load: TrafficLoad) {
        *self = Self::new(now, schedule, load);
    }

    /// The ticks due at `now`, their timers re-armed.
    pub(crate) fn elapsed(
        &mut self,
        now: Instant,
        schedule: &Schedule,
        load: TrafficLoad,
    ) -> Vec<Tick> {
        Tick::ALL
            .into_iter()
            .filter(|tick| {
                let due = &mut self.due[slot(*tick)];
                if now >= *due {
                    *due = now + schedule.interval(*tick, load);
                    true
                } else {
                    false
                }
            })
            .collect()
    }
}
