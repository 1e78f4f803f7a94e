#![forbid(unsafe_code)]

//! Deterministic loop driver for tests.
//!
//! `LoopSimulator` owns a [`FrameLoop`], a [`ScriptedHost`] and a
//! [`DeterministicClock`]. Each step advances the clock by a fixed frame
//! interval, applies any host events scheduled at or before the new time,
//! and runs one frame.
//!
//! # Example
//!
//! ```ignore
//! let mut sim = LoopSimulator::new(frame_loop, host, Duration::from_millis(16));
//! sim.schedule(Duration::from_secs(2), HostEvent::Visibility(false));
//! let stats = sim.run_for(Duration::from_secs(10));
//! assert!(stats.frames > 0);
//! ```

use std::time::Duration;

use cpixel_core::{DeterministicClock, FpsReport, FrameClock, ScriptedHost};

use crate::frame_loop::{FrameLoop, FrameSummary, HostEvent};

/// Totals from [`LoopSimulator::run_for`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Frames stepped.
    pub frames: u64,
    /// Frames that started suppressed.
    pub suppressed_frames: u64,
    /// Producer invocations.
    pub invocations: u64,
    /// FPS reports emitted.
    pub fps_reports: Vec<FpsReport>,
}

/// Fixed-step driver around a [`FrameLoop`].
#[derive(Debug)]
pub struct LoopSimulator {
    frame_loop: FrameLoop,
    host: ScriptedHost,
    clock: DeterministicClock,
    step: Duration,
    started: bool,
    /// Pending events, kept sorted by time (stable for equal times).
    pending: Vec<(Duration, HostEvent)>,
}

impl LoopSimulator {
    /// Create a simulator whose first frame runs at time zero.
    #[must_use]
    pub fn new(frame_loop: FrameLoop, host: ScriptedHost, step: Duration) -> Self {
        Self {
            frame_loop,
            host,
            clock: DeterministicClock::new(),
            step: step.max(Duration::from_micros(1)),
            started: false,
            pending: Vec::new(),
        }
    }

    /// Queue `event` for the first frame at or after `at`.
    pub fn schedule(&mut self, at: Duration, event: HostEvent) {
        let idx = self.pending.partition_point(|(t, _)| *t <= at);
        self.pending.insert(idx, (at, event));
    }

    /// Apply `event` immediately at the current time.
    pub fn send(&mut self, event: HostEvent) {
        let now = self.clock.now();
        self.apply(event, now);
    }

    fn apply(&mut self, event: HostEvent, now: Duration) {
        if let HostEvent::Visibility(visible) = event {
            self.host.set_visible(visible);
        }
        self.frame_loop.dispatch(event, now);
    }

    /// Advance one frame interval (the very first call runs at time zero).
    pub fn step(&mut self) -> FrameSummary {
        if self.started {
            self.clock.advance(self.step);
        }
        self.started = true;
        let now = self.clock.now();

        let due = self.pending.partition_point(|(t, _)| *t <= now);
        let events: Vec<_> = self.pending.drain(..due).collect();
        for (_, event) in events {
            self.apply(event, now);
        }
        self.frame_loop.frame(now, &self.host)
    }

    /// Let `duration` pass without running frames, as a host does for a
    /// backgrounded page.
    pub fn idle(&mut self, duration: Duration) {
        self.clock.advance(duration);
    }

    /// Step until the clock has advanced by at least `duration`.
    pub fn run_for(&mut self, duration: Duration) -> RunStats {
        let end = self.clock.now().saturating_add(duration);
        let mut stats = RunStats::default();
        while !self.started || self.clock.now().saturating_add(self.step) <= end {
            let summary = self.step();
            stats.frames += 1;
            stats.invocations += summary.invoked as u64;
            if summary.suppressed {
                stats.suppressed_frames += 1;
            }
            stats.fps_reports.extend(summary.fps);
        }
        stats
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// The loop.
    #[must_use]
    pub fn frame_loop(&self) -> &FrameLoop {
        &self.frame_loop
    }

    /// The loop, mutably (operator calls on the gate).
    pub fn frame_loop_mut(&mut self) -> &mut FrameLoop {
        &mut self.frame_loop
    }

    /// The host.
    #[must_use]
    pub fn host(&self) -> &ScriptedHost {
        &self.host
    }

    /// The host, mutably (markers, pointer, elements).
    pub fn host_mut(&mut self) -> &mut ScriptedHost {
        &mut self.host
    }
}
