//! Tick Clocks

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::MillisecondCount;

/// Where a system's tick count comes from.
#[derive(Debug, Clone)]
pub enum TickClock {
    /// Milliseconds elapsed since the clock was created.
    Steady(Instant),

    /// A counter advanced by hand. Used by tests and by hosts that drive
    /// time themselves.
    Manual(Arc<AtomicU32>),
}

impl TickClock {
    pub fn steady() -> Self {
        TickClock::Steady(Instant::now())
    }

    /// A manual clock plus the handle that advances it.
    pub fn manual() -> (Self, Arc<AtomicU32>) {
        let ticks = Arc::new(AtomicU32::new(0));
        (TickClock::Manual(ticks.clone()), ticks)
    }

    pub fn now(&self) -> MillisecondCount {
        match self {
            // Truncation is intended: tick counts wrap.
            TickClock::Steady(start) => start.elapsed().as_millis() as MillisecondCount,
            TickClock::Manual(ticks) => ticks.load(Ordering::Acquire),
        }
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::steady()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_follows_handle() {
        let (clock, ticks) = TickClock::manual();
        assert_eq!(clock.now(), 0);
        ticks.store(250, Ordering::Release);
        assert_eq!(clock.now(), 250);
    }

    #[test]
    fn steady_clock_is_monotonic() {
        let clock = TickClock::steady();
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
