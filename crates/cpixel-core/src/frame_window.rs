#![forbid(unsafe_code)]

//! Frame-time bookkeeping: a bounded window of recent frame durations and an
//! interval-based FPS meter.
//!
//! Both are diagnostic only. Nothing in the skip decision reads them; the one
//! consumer besides logging is the optional performance-drop probe.

use std::collections::VecDeque;
use std::time::Duration;

/// Default number of frame durations retained.
pub const DEFAULT_WINDOW_CAPACITY: usize = 20;
/// Largest window capacity accepted by config validation.
pub const MAX_WINDOW_CAPACITY: usize = 10_000;

// ---------------------------------------------------------------------------
// FrameTimeWindow
// ---------------------------------------------------------------------------

/// Sliding FIFO window of observed frame durations.
///
/// # Invariants
///
/// - `len() <= capacity() <= MAX_WINDOW_CAPACITY` after every push.
/// - Entries are kept in push order; the oldest is evicted first.
#[derive(Debug, Clone)]
pub struct FrameTimeWindow {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl Default for FrameTimeWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl FrameTimeWindow {
    /// Create a window holding at most `capacity` samples, clamped to
    /// `1..=MAX_WINDOW_CAPACITY`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_WINDOW_CAPACITY);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest once over capacity.
    pub fn push(&mut self, dt: Duration) {
        self.samples.push_back(dt);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Drop all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Number of retained samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of retained samples.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = Duration> + '_ {
        self.samples.iter().copied()
    }

    /// Mean of the retained samples, `None` when empty.
    #[must_use]
    pub fn average(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        let count = u32::try_from(self.samples.len()).ok()?;
        Some(total / count)
    }
}

// ---------------------------------------------------------------------------
// FpsMeter
// ---------------------------------------------------------------------------

/// Counts frames and turns them into a frames-per-second figure once per
/// reporting interval.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    interval: Duration,
    last_report: Duration,
    frames: u32,
    last_fps: Option<f64>,
}

impl FpsMeter {
    /// Create a meter whose first interval starts at the timeline origin.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_report: Duration::ZERO,
            frames: 0,
            last_fps: None,
        }
    }

    /// Count one frame.
    pub fn count_frame(&mut self) {
        self.frames = self.frames.saturating_add(1);
    }

    /// Frames counted since the last report.
    #[must_use]
    pub fn frames_since_report(&self) -> u32 {
        self.frames
    }

    /// Most recently computed FPS.
    #[must_use]
    pub fn last_fps(&self) -> Option<f64> {
        self.last_fps
    }

    /// Restart the interval at `now` with a zero count.
    pub fn rebase(&mut self, now: Duration) {
        self.last_report = now;
        self.frames = 0;
    }

    /// If a full interval has elapsed since the last report, compute FPS,
    /// restart the interval at `now`, and return the figure.
    pub fn poll(&mut self, now: Duration) -> Option<f64> {
        let elapsed = now.saturating_sub(self.last_report);
        if elapsed < self.interval || elapsed.is_zero() {
            return None;
        }
        let fps = f64::from(self.frames) / elapsed.as_secs_f64();
        self.last_fps = Some(fps);
        self.rebase(now);
        Some(fps)
    }
}
