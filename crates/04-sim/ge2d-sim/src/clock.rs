use ge2d_engine::ClockControl;
use log::trace;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Clock gate that remembers its state and counts transitions.
#[derive(Debug, Default)]
pub struct SimClock {
    enabled: AtomicBool,
    enables: AtomicU64,
    disables: AtomicU64,
}

impl SimClock {
    /// Creates a gated clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the clock is currently running.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Number of `enable` calls.
    pub fn enables(&self) -> u64 {
        self.enables.load(Ordering::Relaxed)
    }

    /// Number of `disable` calls.
    pub fn disables(&self) -> u64 {
        self.disables.load(Ordering::Relaxed)
    }
}

impl ClockControl for SimClock {
    fn enable(&self) {
        self.enables.fetch_add(1, Ordering::Relaxed);
        self.enabled.store(true, Ordering::Release);
        trace!("clock on");
    }

    fn disable(&self) {
        self.disables.fetch_add(1, Ordering::Relaxed);
        self.enabled.store(false, Ordering::Release);
        trace!("clock off");
    }
}
