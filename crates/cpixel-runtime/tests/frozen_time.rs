//! Suppressed frames freeze every producer, and resuming never jumps.

use std::time::Duration;

use cpixel_core::{FrameGate, GateConfig, InspectionDetector, LayoutBox, Modifiers, Point, ScriptedHost};
use cpixel_runtime::producers::{
    CUBE_ELEMENT, DivisionConfig, EnergyConfig, EvolutionConfig, MotionConfig, PIXEL_ELEMENT,
};
use cpixel_runtime::shared::channel;
use cpixel_runtime::{
    CellDivision, EnergyCubes, Evolution, FrameContext, PixelMotion, Producer, Reader, Rearm,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn host() -> ScriptedHost {
    ScriptedHost::new()
        .with_element(PIXEL_ELEMENT, LayoutBox::new(0.0, 0.0, 8.0, 8.0))
        .with_element(CUBE_ELEMENT, LayoutBox::new(0.0, 0.0, 800.0, 600.0))
}

fn gate() -> FrameGate {
    FrameGate::new(GateConfig::default(), InspectionDetector::empty())
}

fn tick(p: &mut dyn Producer, gate: &mut FrameGate, host: &ScriptedHost, now: Duration) -> Rearm {
    let mut ctx = FrameContext {
        now,
        gate,
        host,
        modifiers: Modifiers::NONE,
    };
    p.on_frame(&mut ctx)
}

/// Run `warmup` normal frames, suppress, run `skips` frames, and hand back the
/// time of the last frame.
fn warm_then_suppress(
    p: &mut dyn Producer,
    gate: &mut FrameGate,
    host: &ScriptedHost,
    warmup: u64,
    via_pause: bool,
) -> Duration {
    for i in 0..warmup {
        tick(p, gate, host, ms(i * 16));
    }
    if via_pause {
        gate.pause();
    } else {
        gate.toggle_inspection_mode(Some(true));
    }
    ms(warmup * 16)
}

// ═════════════════════════════════════════════════════════════════════════
// Skipped frames leave state untouched
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn motion_frozen(warmup in 1u64..30, skips in 1u64..60, via_pause in any::<bool>()) {
        let host = host();
        let mut gate = gate();
        let mut motion = PixelMotion::new(MotionConfig::default(), Reader::constant(0.7));
        let t0 = warm_then_suppress(&mut motion, &mut gate, &host, warmup, via_pause);
        let before = motion.state();
        for i in 0..skips {
            prop_assert_eq!(tick(&mut motion, &mut gate, &host, t0 + ms(i * 16)), Rearm::NextFrame);
        }
        prop_assert_eq!(motion.state(), before);
    }

    #[test]
    fn division_frozen(warmup in 1u64..30, skips in 1u64..60, via_pause in any::<bool>()) {
        let host = host();
        let mut gate = gate();
        let mut division = CellDivision::new(DivisionConfig::default());
        let t0 = warm_then_suppress(&mut division, &mut gate, &host, warmup, via_pause);
        let before = division.state();
        for i in 0..skips {
            tick(&mut division, &mut gate, &host, t0 + ms(i * 1000));
        }
        prop_assert_eq!(division.state(), before);
    }

    #[test]
    fn evolution_frozen(warmup in 1u64..30, skips in 1u64..60, via_pause in any::<bool>()) {
        let host = host();
        let mut gate = gate();
        let mut evolution = Evolution::new(EvolutionConfig::default(), Reader::constant(1.0));
        let t0 = warm_then_suppress(&mut evolution, &mut gate, &host, warmup, via_pause);
        let before = evolution.state();
        for i in 0..skips {
            tick(&mut evolution, &mut gate, &host, t0 + ms(i * 16));
        }
        prop_assert_eq!(evolution.state(), before);
    }

    #[test]
    fn cubes_frozen(warmup in 1u64..30, skips in 1u64..60, via_pause in any::<bool>()) {
        let host = host();
        let mut gate = gate();
        let (tx, _rx) = channel(0.0);
        let mut cubes = EnergyCubes::new(EnergyConfig::default(), tx, Reader::constant(Point::new(-1e6, -1e6)));
        let t0 = warm_then_suppress(&mut cubes, &mut gate, &host, warmup, via_pause);
        let before = cubes.state();
        for i in 0..skips {
            tick(&mut cubes, &mut gate, &host, t0 + ms(i * 16));
        }
        prop_assert_eq!(cubes.state(), before);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// Resuming advances by one nominal frame
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn resume_after_long_pause_is_one_frame() {
    let host = host();
    let mut gate = gate();
    let mut motion = PixelMotion::new(MotionConfig::default(), Reader::constant(0.5));

    // Fresh first frame: one nominal step.
    tick(&mut motion, &mut gate, &host, ms(0));
    let first_step = motion.state().position.distance(
        PixelMotion::new(MotionConfig::default(), Reader::constant(0.5)).state().position,
    );

    gate.pause();
    for i in 1..=100 {
        tick(&mut motion, &mut gate, &host, ms(i * 600));
    }
    gate.resume();

    let before = motion.state().position;
    tick(&mut motion, &mut gate, &host, ms(60_000));
    let resumed_step = motion.state().position.distance(before);
    assert!(
        (resumed_step - first_step).abs() < 1e-3,
        "resumed step {resumed_step} vs nominal {first_step}"
    );
}

#[test]
fn pause_does_not_count_toward_division() {
    let host = host();
    let mut gate = gate();
    let mut division = CellDivision::new(DivisionConfig::default());

    for i in 0..=400 {
        tick(&mut division, &mut gate, &host, ms(i * 16));
    }
    let accumulated = division.state().accumulated;
    assert_eq!(accumulated, ms(6_400));

    gate.pause();
    tick(&mut division, &mut gate, &host, ms(30_000));
    gate.resume();
    tick(&mut division, &mut gate, &host, ms(30_016));

    let state = division.state();
    assert_eq!(state.divisions, 0);
    assert_eq!(state.accumulated, accumulated, "resume frame is fresh");
}
