#![forbid(unsafe_code)]

//! Time-driven shaping primitives used by the producers.
//!
//! Everything here advances only when a caller passes it a [`Duration`]. A
//! producer that skips a frame simply does not call `advance`, so suppressed
//! frames cost nothing and move nothing.
//!
//! - [`Easing`] - curves mapping `[0, 1]` progress to `[0, 1]`
//! - [`GrowIn`] - one-shot progression (new cells appearing)
//! - [`Heartbeat`] - periodic double-beat amplitude
//! - [`Breath`] - slow sinusoidal scale

use std::f32::consts::TAU;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Easing
// ---------------------------------------------------------------------------

/// Progress-shaping curve. Inputs outside `[0, 1]` are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// Constant velocity.
    #[default]
    Linear,
    /// Fast start, gentle landing.
    EaseOutCubic,
    /// Gentle start and landing.
    EaseInOutSine,
    /// Hermite smoothstep.
    Smoothstep,
}

impl Easing {
    /// Shape `t`.
    #[inline]
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutSine => 0.5 - 0.5 * (std::f32::consts::PI * t).cos(),
            Easing::Smoothstep => t * t * (3.0 - 2.0 * t),
        }
    }
}

// ---------------------------------------------------------------------------
// Tween
// ---------------------------------------------------------------------------

/// Anything that moves forward with time and yields a sample.
pub trait Tween {
    /// Move forward by `dt`.
    fn advance(&mut self, dt: Duration);

    /// Current output.
    fn sample(&self) -> f32;

    /// Whether further `advance` calls can change the output. Periodic tweens
    /// never settle.
    fn is_settled(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// GrowIn
// ---------------------------------------------------------------------------

/// Eased progression from 0.0 to 1.0 over a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowIn {
    elapsed: Duration,
    duration: Duration,
    easing: Easing,
}

impl GrowIn {
    /// Grow over `duration` (a zero duration completes immediately).
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            elapsed: Duration::ZERO,
            duration,
            easing: Easing::EaseOutCubic,
        }
    }

    /// Replace the curve (builder).
    #[must_use]
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Linear progress before easing.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0) as f32
    }

    /// Time spent growing so far, capped at the duration.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed.min(self.duration)
    }
}

impl Tween for GrowIn {
    fn advance(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
    }

    fn sample(&self) -> f32 {
        self.easing.apply(self.progress())
    }

    fn is_settled(&self) -> bool {
        self.elapsed >= self.duration
    }
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

/// Periodic "lub-dub" amplitude in `[0, 1]`.
///
/// Each beat is two short bumps: a strong one at the start of the cycle and a
/// weaker one shortly after. The rest of the cycle is silent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heartbeat {
    bpm: f32,
    /// Cycle position in `[0, 1)`.
    cycle: f32,
    beats: u64,
}

impl Heartbeat {
    /// A heart beating at `bpm` beats per minute (minimum 1).
    #[must_use]
    pub fn new(bpm: f32) -> Self {
        Self {
            bpm: bpm.max(1.0),
            cycle: 0.0,
            beats: 0,
        }
    }

    /// Change the rate without resetting the cycle.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm.max(1.0);
    }

    /// Current rate.
    #[must_use]
    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Completed beats.
    #[must_use]
    pub fn beats(&self) -> u64 {
        self.beats
    }

    fn bump(x: f32, center: f32, width: f32) -> f32 {
        let d = (x - center) / width;
        if d.abs() >= 1.0 {
            0.0
        } else {
            0.5 + 0.5 * (std::f32::consts::PI * d).cos()
        }
    }
}

impl Tween for Heartbeat {
    fn advance(&mut self, dt: Duration) {
        let cycles = self.cycle + dt.as_secs_f32() * self.bpm / 60.0;
        self.beats += cycles.floor() as u64;
        self.cycle = cycles.fract();
    }

    fn sample(&self) -> f32 {
        let lub = Self::bump(self.cycle, 0.08, 0.08);
        let dub = 0.6 * Self::bump(self.cycle, 0.28, 0.07);
        lub.max(dub)
    }
}

// ---------------------------------------------------------------------------
// Breath
// ---------------------------------------------------------------------------

/// Slow sinusoidal breathing. [`Breath::scale`] is `1 + depth * sin(phase)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breath {
    period: Duration,
    depth: f32,
    phase: f32,
}

impl Breath {
    /// Breathe once per `period` with the given depth.
    #[must_use]
    pub fn new(period: Duration, depth: f32) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            depth,
            phase: 0.0,
        }
    }

    /// Phase in radians, `[0, TAU)`.
    #[must_use]
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Size multiplier.
    #[must_use]
    pub fn scale(&self) -> f32 {
        1.0 + self.depth * self.phase.sin()
    }
}

impl Tween for Breath {
    fn advance(&mut self, dt: Duration) {
        let turns = dt.as_secs_f32() / self.period.as_secs_f32();
        self.phase = (self.phase + TAU * turns).rem_euclid(TAU);
    }

    fn sample(&self) -> f32 {
        self.scale()
    }
}
