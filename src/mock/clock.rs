use std::time::Instant;

use crate::MonotonicClock;

/// Simulated microsecond clock.
///
/// Every sample advances time by a fixed step, so busy-waits finish
/// instantly in wall time while still observing their deadlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimClock {
    now: u64,
    step: u64,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClock {
    /// Starts at 0 and advances 1 µs per sample.
    pub const fn new() -> Self {
        Self::with_step(1)
    }

    /// Advance `step` µs per sample (at least 1).
    pub const fn with_step(step: u64) -> Self {
        Self {
            now: 0,
            step: if step == 0 { 1 } else { step },
        }
    }

    /// Time of the most recent sample.
    #[inline]
    pub fn now(&self) -> u64 {
        self.now
    }
}

impl MonotonicClock for SimClock {
    fn now_micros(&mut self) -> u64 {
        self.now += self.step;
        self.now
    }
}

/// Host wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: Instant,
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl MonotonicClock for StdClock {
    fn now_micros(&mut self) -> u64 {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}
