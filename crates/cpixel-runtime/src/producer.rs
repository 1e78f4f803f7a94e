#![forbid(unsafe_code)]

//! The producer contract.
//!
//! A producer is invoked at most once per frame by the
//! [`FrameLoop`](crate::FrameLoop). Every invocation follows the same shape:
//!
//! 1. [`gate_frame`]: if the gate says skip, return [`Rearm::NextFrame`]
//!    without touching any state.
//! 2. Liveness: a missing host element re-arms after a retry delay, a detached
//!    one stops the producer.
//! 3. [`DeltaClock::advance`], then the feature update.
//! 4. Return exactly one [`Rearm`].
//!
//! # Invariants
//!
//! - A skipped frame leaves producer state bit-for-bit unchanged.
//! - The first executed frame after any suppression advances by one nominal
//!   frame, never by the wall-clock gap.
//! - Each invocation re-arms exactly once; the return type makes zero or two
//!   re-arms unrepresentable.

use std::time::Duration;

use cpixel_core::{ElementState, FrameGate, HostEnvironment, Modifiers};

/// Duration of one frame at the 60 Hz reference rate.
pub const NOMINAL_FRAME: Duration = Duration::from_nanos(16_666_667);

/// Delay before a producer re-checks a host element that does not exist yet.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// How a producer wants to be scheduled after this invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rearm {
    /// Run again on the next frame.
    NextFrame,
    /// Run again on the first frame at or after `now + delay`.
    After(Duration),
    /// Never run again.
    Stop,
}

/// Everything a producer sees during one invocation.
pub struct FrameContext<'a> {
    /// Frame timestamp.
    pub now: Duration,
    /// The shared gate. Producers read it first and may record timing into it.
    pub gate: &'a mut FrameGate,
    /// Host page.
    pub host: &'a dyn HostEnvironment,
    /// Modifier keys currently held.
    pub modifiers: Modifiers,
}

/// A unit of per-frame work.
pub trait Producer {
    /// Stable identifier for logs.
    fn id(&self) -> &'static str;

    /// Run one frame.
    fn on_frame(&mut self, ctx: &mut FrameContext<'_>) -> Rearm;
}

/// Whether this frame may do work. `false` means return
/// [`Rearm::NextFrame`] immediately.
#[inline]
#[must_use]
pub fn gate_frame(ctx: &FrameContext<'_>) -> bool {
    !ctx.gate.should_skip_frame()
}

/// Map a host element's lifecycle to an early re-arm.
///
/// Returns `None` when the element is attached and the frame should proceed.
pub(crate) fn element_liveness(
    host: &dyn HostEnvironment,
    element: &str,
    retry: Duration,
    producer: &'static str,
) -> Option<Rearm> {
    match host.element_state(element) {
        ElementState::Attached => None,
        ElementState::Missing => {
            tracing::debug!(target: "cpixel.producer", producer, element, retry_ms = retry.as_millis() as u64, "element missing; retrying");
            Some(Rearm::After(retry))
        }
        ElementState::Detached => {
            tracing::debug!(target: "cpixel.producer", producer, element, "element detached; stopping");
            Some(Rearm::Stop)
        }
    }
}

// ---------------------------------------------------------------------------
// DeltaClock
// ---------------------------------------------------------------------------

/// Time step for one executed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDelta {
    /// Real time since the previous executed frame. Zero on a fresh frame.
    pub elapsed: Duration,
    /// `elapsed` in nominal frames; exactly 1.0 on a fresh frame.
    pub scale: f32,
    /// No usable baseline existed (first frame, or timing was reset).
    pub fresh: bool,
}

impl FrameDelta {
    const UNIT: Self = Self {
        elapsed: Duration::ZERO,
        scale: 1.0,
        fresh: true,
    };

    /// Time to advance tweens by: `scale` nominal frames.
    #[must_use]
    pub fn step(&self) -> Duration {
        NOMINAL_FRAME.mul_f32(self.scale)
    }
}

/// Per-producer frame timer.
///
/// Only executed frames call [`advance`](Self::advance). A gate timing-epoch
/// change since the last call (suppression started, tab re-foregrounded)
/// discards the baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaClock {
    last: Option<Duration>,
    seen_epoch: u64,
}

impl DeltaClock {
    /// A clock with no baseline.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: None,
            seen_epoch: 0,
        }
    }

    /// Compute this frame's delta and move the baseline to `now`.
    pub fn advance(&mut self, now: Duration, gate: &FrameGate) -> FrameDelta {
        let epoch = gate.timing_epoch();
        let previous = self.last.replace(now);
        let stale = epoch != self.seen_epoch;
        self.seen_epoch = epoch;

        match previous {
            Some(last) if !stale => {
                let elapsed = now.saturating_sub(last);
                FrameDelta {
                    elapsed,
                    scale: (elapsed.as_secs_f64() / NOMINAL_FRAME.as_secs_f64()) as f32,
                    fresh: false,
                }
            }
            _ => FrameDelta::UNIT,
        }
    }

    /// Drop the baseline so the next frame is fresh.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Timestamp of the last executed frame.
    #[must_use]
    pub fn last(&self) -> Option<Duration> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpixel_core::{GateConfig, InspectionDetector, ScriptedHost};
    use tracing_test::traced_test;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn gate() -> FrameGate {
        FrameGate::new(GateConfig::default(), InspectionDetector::empty())
    }

    #[test]
    fn first_frame_is_a_unit_step() {
        let gate = gate();
        let mut clock = DeltaClock::new();
        let d = clock.advance(ms(5_000), &gate);
        assert!(d.fresh);
        assert_eq!(d.scale, 1.0);
        assert_eq!(d.elapsed, Duration::ZERO);
        assert_eq!(d.step(), NOMINAL_FRAME);
    }

    #[test]
    fn steady_frames_scale_with_elapsed() {
        let gate = gate();
        let mut clock = DeltaClock::new();
        clock.advance(ms(0), &gate);
        let d = clock.advance(ms(33), &gate);
        assert!(!d.fresh);
        assert_eq!(d.elapsed, ms(33));
        assert!((d.scale - 1.98).abs() < 0.01);
    }

    #[test]
    fn epoch_change_discards_baseline() {
        let mut gate = gate();
        let mut clock = DeltaClock::new();
        clock.advance(ms(0), &gate);
        gate.pause();
        gate.resume();
        let d = clock.advance(ms(60_000), &gate);
        assert!(d.fresh, "a minute-long pause must not become one giant step");
        let d = clock.advance(ms(60_016), &gate);
        assert_eq!(d.elapsed, ms(16));
    }

    #[traced_test]
    #[test]
    fn liveness_maps_element_state() {
        let mut host = ScriptedHost::new();
        assert_eq!(
            element_liveness(&host, "p", DEFAULT_RETRY_DELAY, "test"),
            Some(Rearm::After(DEFAULT_RETRY_DELAY))
        );
        host.attach("p", cpixel_core::LayoutBox::default());
        assert_eq!(element_liveness(&host, "p", DEFAULT_RETRY_DELAY, "test"), None);
        host.detach("p");
        assert_eq!(
            element_liveness(&host, "p", DEFAULT_RETRY_DELAY, "test"),
            Some(Rearm::Stop)
        );
        assert!(logs_contain("element missing; retrying"));
        assert!(logs_contain("retry_ms=100"));
        assert!(logs_contain("element detached; stopping"));
    }
}
