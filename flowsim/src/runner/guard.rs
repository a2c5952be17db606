use flowsim_core::Tick;
use std::sync::atomic::{AtomicBool, Ordering};

/// One in-flight flag per [`Tick`].
///
/// A tick that finds its flag already raised is skipped rather than
/// queued behind the running one.
#[derive(Debug, Default)]
pub(crate) struct TickGuards {
    running: [AtomicBool; Tick::ALL.len()],
}

/// Lowers the flag of its tick when dropped.
#[derive(Debug)]
pub(crate) struct TickGuard<'a> {
    flag: &'a AtomicBool,
}

pub(crate) fn slot(tick: Tick) -> usize {
    match tick {
        Tick::Advance => 0,
        Tick::Decay => 1,
        Tick::Generate => 2,
    }
}

impl TickGuards {
    /// `None` if the same tick is already running.
    pub(crate) fn acquire(&self, tick: Tick) -> Option<TickGuard<'_>> {
        let flag = &self.running[slot(tick)];
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TickGuard { flag })
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self, tick: Tick) -> bool {
        self.running[slot(tick)].load(Ordering::Acquire)
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
