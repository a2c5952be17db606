use std::sync::atomic::{AtomicBool, Ordering};

/// Sequentially consistent ordering for every flag.
///
/// The flags are polled a few hundred times per second at most, the cost
/// of the strongest ordering does not show.
const ORDERING: Ordering = Ordering::SeqCst;

/// Run state of the runner thread, shared with the [`SimContext`].
///
/// [`SimContext`]: crate::SimContext
#[derive(Debug)]
pub(crate) struct Control {
    stop: AtomicBool,
    pause: AtomicBool,
}

impl Control {
    pub(crate) fn new(paused: bool) -> Self {
        Self {
            stop: AtomicBool::new(false),
            pause: AtomicBool::new(paused),
        }
    }

    #[inline]
    pub(crate) fn stopped(&self) -> bool {
        self.stop.load(ORDERING)
    }

    /// set the stop signal, it cannot be unset
    #[inline]
    pub(crate) fn stop(&self) {
        self.stop.store(true, ORDERING)
    }

    #[inline]
    pub(crate) fn paused(&self) -> bool {
        self.pause.load(ORDERING)
    }

    #[inline]
    pub(crate) fn pause(&self) {
        self.pause.store(true, ORDERING)
    }

    #[inline]
    pub(crate) fn resume(&self) {
        self.pause.store(false, ORDERING)
    }
}

impl Default for Control {
    fn default() -> Self {
        Self::new(true)
    }
}
