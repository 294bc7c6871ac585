//! Elapsed-time accumulators driven by explicit ticks
//!
//! Schedulers never read the wall clock themselves. The tick source measures
//! real elapsed time and every scheduler adds it to its own accumulators, so
//! tests can advance time deterministically.

use std::time::Duration;

/// A stopwatch that only advances when it is fed elapsed time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accumulator {
    elapsed: Duration,
    running: bool,
}

impl Accumulator {
    /// Create a stopped accumulator at zero
    pub const fn new() -> Self {
        Self {
            elapsed: Duration::ZERO,
            running: false,
        }
    }

    /// Create an accumulator that is already counting
    pub const fn started() -> Self {
        Self {
            elapsed: Duration::ZERO,
            running: true,
        }
    }

    /// Stop counting and clear the accumulated time
    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
        self.running = false;
    }

    /// Clear the accumulated time but keep counting
    pub fn restart(&mut self) {
        self.elapsed = Duration::ZERO;
        self.running = true;
    }

    /// Add elapsed time. Ignored while stopped.
    pub fn advance(&mut self, delta: Duration) {
        if self.running {
            self.elapsed = self.elapsed.saturating_add(delta);
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// True once the accumulated time is at or past `threshold`
    #[inline]
    pub fn has_reached(&self, threshold: Duration) -> bool {
        self.elapsed >= threshold
    }

    /// Time left until `threshold`, zero if already reached
    pub fn remaining(&self, threshold: Duration) -> Duration {
        threshold.saturating_sub(self.elapsed)
    }
}
