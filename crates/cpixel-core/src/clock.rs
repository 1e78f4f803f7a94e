#![forbid(unsafe_code)]

//! Monotonic frame timestamps.
//!
//! Every frame callback receives a timestamp measured from an arbitrary origin
//! (the page's time origin in a browser). Timestamps are [`Duration`]s so they
//! accumulate without floating-point drift.

use std::time::Duration;

/// Source of monotonically increasing frame timestamps.
pub trait FrameClock {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// Clock controlled entirely by the caller. Used by simulators and tests.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock at the origin.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Jump to `now`. Going backwards is ignored.
    pub fn set(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    /// Advance by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

impl FrameClock for DeterministicClock {
    fn now(&self) -> Duration {
        self.now
    }
}

/// Wall clock anchored at construction. Works on native and wasm32 targets.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: web_time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// Start a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: web_time::Instant::now(),
        }
    }
}

impl FrameClock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}
