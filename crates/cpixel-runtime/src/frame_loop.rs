#![forbid(unsafe_code)]

//! Single-threaded cooperative frame loop.
//!
//! The loop owns the [`FrameGate`] and every producer. Per frame it:
//!
//! 1. polls the inspection detector (self-throttled by the gate),
//! 2. invokes each armed producer once, in registration order, lending it the
//!    gate by `&mut`,
//! 3. stores the [`Rearm`] each producer returned,
//! 4. polls the FPS report.
//!
//! Host events ([`HostEvent`]) are applied by [`FrameLoop::dispatch`] between
//! frames, so the next frame's gate reads observe them.
//!
//! # Invariants
//!
//! - A producer runs at most once per frame.
//! - A producer armed with [`Rearm::After`] runs on the first frame whose
//!   timestamp is at or past its deadline.
//! - After [`HostEvent::Teardown`] no producer runs again.

use std::time::Duration;

use cpixel_core::{
    CpixelConfig, FpsReport, FrameGate, HostEnvironment, KeyEvent, KeyboardOverrideHandler,
    OverrideAction, VisibilityTracker, VisibilityTransition,
};

use crate::producer::{FrameContext, Producer, Rearm};

/// Something the host reports between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// Keyboard press or release.
    Key(KeyEvent),
    /// Page visibility changed (or was re-reported).
    Visibility(bool),
    /// Page is unloading.
    Teardown,
}

/// What [`FrameLoop::dispatch`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// An operator chord fired.
    Override(OverrideAction),
    /// Visibility really changed.
    Visibility(VisibilityTransition),
    /// The loop was torn down.
    TornDown,
    /// Nothing changed.
    Ignored,
}

/// Result of one [`FrameLoop::frame`] call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameSummary {
    /// Producers invoked this frame.
    pub invoked: usize,
    /// Whether the gate said skip when the frame started.
    pub suppressed: bool,
    /// FPS report, when one was due.
    pub fps: Option<FpsReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arm {
    NextFrame,
    At(Duration),
    Stopped,
}

struct Slot {
    producer: Box<dyn Producer>,
    arm: Arm,
}

/// Owns the gate and drives producers.
pub struct FrameLoop {
    gate: FrameGate,
    keyboard: KeyboardOverrideHandler,
    visibility: VisibilityTracker,
    slots: Vec<Slot>,
    frames: u64,
    torn_down: bool,
}

impl std::fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("gate", &self.gate)
            .field(
                "producers",
                &self
                    .slots
                    .iter()
                    .map(|s| (s.producer.id(), s.arm))
                    .collect::<Vec<_>>(),
            )
            .field("frames", &self.frames)
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

impl FrameLoop {
    /// Loop around an existing gate and keyboard handler.
    #[must_use]
    pub fn new(gate: FrameGate, keyboard: KeyboardOverrideHandler) -> Self {
        Self {
            gate,
            keyboard,
            visibility: VisibilityTracker::new(),
            slots: Vec::new(),
            frames: 0,
            torn_down: false,
        }
    }

    /// Loop with gate, detector and chords built from `config`.
    #[must_use]
    pub fn from_config(config: &CpixelConfig) -> Self {
        Self::new(
            FrameGate::from_config(config),
            KeyboardOverrideHandler::new(config.keyboard.clone()),
        )
    }

    /// Register a producer, armed for the next frame.
    pub fn register(&mut self, producer: impl Producer + 'static) {
        self.register_boxed(Box::new(producer));
    }

    /// Register a boxed producer.
    pub fn register_boxed(&mut self, producer: Box<dyn Producer>) {
        tracing::debug!(target: "cpixel.loop", producer = producer.id(), slot = self.slots.len(), "producer registered");
        self.slots.push(Slot {
            producer,
            arm: Arm::NextFrame,
        });
    }

    /// Register a producer (builder).
    #[must_use]
    pub fn with_producer(mut self, producer: impl Producer + 'static) -> Self {
        self.register(producer);
        self
    }

    /// Run one frame at `now`.
    pub fn frame(&mut self, now: Duration, host: &dyn HostEnvironment) -> FrameSummary {
        if self.torn_down {
            return FrameSummary::default();
        }
        self.frames += 1;

        let modifiers = self.keyboard.modifiers();
        self.gate.check_for_inspection(now, host, modifiers);
        let suppressed = self.gate.should_skip_frame();

        let mut invoked = 0;
        for slot in &mut self.slots {
            match slot.arm {
                Arm::Stopped => continue,
                Arm::At(deadline) if now < deadline => continue,
                Arm::At(_) | Arm::NextFrame => {}
            }
            let mut ctx = FrameContext {
                now,
                gate: &mut self.gate,
                host,
                modifiers,
            };
            let rearm = slot.producer.on_frame(&mut ctx);
            invoked += 1;
            slot.arm = match rearm {
                Rearm::NextFrame => Arm::NextFrame,
                Rearm::After(delay) => Arm::At(now.saturating_add(delay)),
                Rearm::Stop => {
                    tracing::debug!(target: "cpixel.loop", producer = slot.producer.id(), "producer stopped");
                    Arm::Stopped
                }
            };
        }

        FrameSummary {
            invoked,
            suppressed,
            fps: self.gate.update_fps(now),
        }
    }

    /// Apply a host event between frames.
    pub fn dispatch(&mut self, event: HostEvent, now: Duration) -> DispatchOutcome {
        if self.torn_down {
            return DispatchOutcome::Ignored;
        }
        match event {
            HostEvent::Key(key) => self
                .keyboard
                .handle_key(&key, &mut self.gate)
                .map_or(DispatchOutcome::Ignored, DispatchOutcome::Override),
            HostEvent::Visibility(visible) => self
                .visibility
                .on_visibility_change(visible, now, &mut self.gate)
                .map_or(DispatchOutcome::Ignored, DispatchOutcome::Visibility),
            HostEvent::Teardown => {
                self.gate.teardown();
                for slot in &mut self.slots {
                    slot.arm = Arm::Stopped;
                }
                self.torn_down = true;
                tracing::info!(target: "cpixel.loop", frames = self.frames, "frame loop torn down");
                DispatchOutcome::TornDown
            }
        }
    }

    /// The gate.
    #[must_use]
    pub fn gate(&self) -> &FrameGate {
        &self.gate
    }

    /// The gate, for direct operator calls (`pause`, `resume`, ...).
    pub fn gate_mut(&mut self) -> &mut FrameGate {
        &mut self.gate
    }

    /// Producer ids in registration order.
    pub fn producer_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.iter().map(|s| s.producer.id())
    }

    /// Producers that have not stopped.
    #[must_use]
    pub fn live_producers(&self) -> usize {
        self.slots.iter().filter(|s| s.arm != Arm::Stopped).count()
    }

    /// Whether any producer can still run.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.torn_down && self.live_producers() > 0
    }

    /// Frames run so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpixel_core::{GateConfig, InspectionDetector, ScriptedHost};
    use std::cell::Cell;
    use std::rc::Rc;
    use tracing_test::traced_test;

    /// Counts invocations and replays a scripted sequence of re-arms.
    struct Scripted {
        calls: Rc<Cell<u32>>,
        script: Vec<Rearm>,
    }

    impl Producer for Scripted {
        fn id(&self) -> &'static str {
            "scripted"
        }

        fn on_frame(&mut self, _ctx: &mut FrameContext<'_>) -> Rearm {
            let n = self.calls.get();
            self.calls.set(n + 1);
            self.script.get(n as usize).copied().unwrap_or(Rearm::NextFrame)
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn empty_loop() -> FrameLoop {
        FrameLoop::new(
            FrameGate::new(GateConfig::default(), InspectionDetector::empty()),
            KeyboardOverrideHandler::default(),
        )
    }

    #[test]
    fn after_rearm_waits_for_deadline() {
        let calls = Rc::new(Cell::new(0));
        let mut lp = empty_loop().with_producer(Scripted {
            calls: Rc::clone(&calls),
            script: vec![Rearm::After(ms(100))],
        });
        let host = ScriptedHost::new();
        lp.frame(ms(0), &host);
        lp.frame(ms(16), &host);
        lp.frame(ms(99), &host);
        assert_eq!(calls.get(), 1);
        lp.frame(ms(100), &host);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn stop_is_final() {
        let calls = Rc::new(Cell::new(0));
        let mut lp = empty_loop().with_producer(Scripted {
            calls: Rc::clone(&calls),
            script: vec![Rearm::NextFrame, Rearm::Stop],
        });
        let host = ScriptedHost::new();
        for i in 0..5 {
            lp.frame(ms(i * 16), &host);
        }
        assert_eq!(calls.get(), 2);
        assert!(!lp.is_running());
    }

    #[traced_test]
    #[test]
    fn teardown_stops_everything_and_clears_markers() {
        let calls = Rc::new(Cell::new(0));
        let mut lp = empty_loop().with_producer(Scripted {
            calls: Rc::clone(&calls),
            script: Vec::new(),
        });
        let host = ScriptedHost::new();
        lp.gate_mut().pause();
        lp.frame(ms(0), &host);
        assert_eq!(lp.dispatch(HostEvent::Teardown, ms(1)), DispatchOutcome::TornDown);
        assert!(lp.gate().css_classes().is_empty());
        assert_eq!(lp.frame(ms(16), &host), FrameSummary::default());
        assert_eq!(calls.get(), 1);
        assert_eq!(lp.dispatch(HostEvent::Visibility(false), ms(20)), DispatchOutcome::Ignored);
        assert!(logs_contain("frame loop torn down"));
        assert!(logs_contain("frames=1"));
    }

    #[test]
    fn key_events_reach_the_gate() {
        let mut lp = empty_loop();
        let chord = KeyEvent::press('p').with_modifiers(cpixel_core::Modifiers::CTRL | cpixel_core::Modifiers::ALT);
        assert_eq!(
            lp.dispatch(HostEvent::Key(chord), ms(0)),
            DispatchOutcome::Override(OverrideAction::PauseToggled(true))
        );
        let summary = lp.frame(ms(16), &ScriptedHost::new());
        assert!(summary.suppressed);
        assert_eq!(
            lp.dispatch(HostEvent::Key(KeyEvent::press('x')), ms(20)),
            DispatchOutcome::Ignored
        );
    }
}
