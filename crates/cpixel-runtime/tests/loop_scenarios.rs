//! End-to-end scenarios: the full producer set under the simulator.

use std::time::Duration;

use cpixel_core::host::MarkerScope;
use cpixel_core::{CpixelConfig, GateMode, KeyEvent, LayoutBox, Modifiers, ScriptedHost};
use cpixel_runtime::producers::{self, CUBE_ELEMENT, PIXEL_ELEMENT, PixelReaders};
use cpixel_runtime::{FrameLoop, HostEvent, LoopSimulator, PixelSettings};
use pretty_assertions::assert_eq;

const STEP: Duration = Duration::from_millis(16);

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn page() -> ScriptedHost {
    ScriptedHost::new()
        .with_element(PIXEL_ELEMENT, LayoutBox::new(396.0, 296.0, 8.0, 8.0))
        .with_element(CUBE_ELEMENT, LayoutBox::new(0.0, 0.0, 800.0, 600.0))
}

fn rig(host: ScriptedHost) -> (LoopSimulator, PixelReaders) {
    let mut frame_loop = FrameLoop::from_config(&CpixelConfig::default());
    let readers = producers::install(&mut frame_loop, PixelSettings::default());
    (LoopSimulator::new(frame_loop, host, STEP), readers)
}

#[test]
fn producers_register_in_order() {
    let (sim, _) = rig(page());
    let ids: Vec<_> = sim.frame_loop().producer_ids().collect();
    assert_eq!(ids, vec!["pixel-motion", "cell-division", "evolution", "energy-cubes"]);
}

#[test]
fn inspector_marker_freezes_everything_until_removed() {
    let (mut sim, readers) = rig(page());
    sim.run_for(ms(1_000));
    let moving = readers.position.get();
    sim.run_for(ms(100));
    assert_ne!(readers.position.get(), moving, "pixel moves while nothing is inspecting");

    sim.host_mut()
        .add_marker(MarkerScope::Body, "data-devtools-inspected");
    // Detection is throttled to 250 ms.
    sim.run_for(ms(300));
    assert!(sim.frame_loop().gate().is_inspecting());
    assert_eq!(sim.frame_loop().gate().css_classes(), vec!["cpixel-inspecting"]);

    let frozen_position = readers.position.get();
    let frozen_energy = readers.energy.get();
    let stats = sim.run_for(ms(2_000));
    assert_eq!(stats.suppressed_frames, stats.frames);
    assert_eq!(readers.position.get(), frozen_position);
    assert_eq!(readers.energy.get(), frozen_energy);

    sim.host_mut()
        .remove_marker(MarkerScope::Body, "data-devtools-inspected");
    sim.run_for(ms(300));
    assert!(!sim.frame_loop().gate().is_inspecting());
    assert_ne!(readers.position.get(), frozen_position);
}

#[test]
fn query_param_forces_inspection_from_the_first_frame() {
    let (mut sim, readers) = rig(page().with_url("http://localhost/pixel?inspect=TRUE"));
    let start = readers.position.get();
    let stats = sim.run_for(ms(500));
    assert_eq!(stats.suppressed_frames, stats.frames);
    assert_eq!(readers.position.get(), start);
}

#[test]
fn query_param_forces_inspection_while_pixel_is_missing() {
    let host = ScriptedHost::new()
        .with_url("http://localhost/pixel?inspect=true")
        .with_element(CUBE_ELEMENT, LayoutBox::new(0.0, 0.0, 800.0, 600.0));
    let (mut sim, readers) = rig(host);
    let energy = readers.energy.get();
    let stats = sim.run_for(ms(1_000));
    assert!(sim.frame_loop().gate().is_inspecting());
    assert_eq!(stats.suppressed_frames, stats.frames);
    assert_eq!(readers.energy.get(), energy, "cubes stay frozen too");
}

#[test]
fn one_hundred_twenty_frames_over_five_seconds_report_24_fps() {
    let mut frame_loop = FrameLoop::from_config(&CpixelConfig::default());
    producers::install(&mut frame_loop, PixelSettings::default());
    let host = page();
    let mut reports = Vec::new();
    // The first frame is fresh and not timed; the next 120 are.
    for k in 0..=120u64 {
        let now = Duration::from_nanos(k * 5_000_000_000 / 120);
        reports.extend(frame_loop.frame(now, &host).fps);
    }
    assert_eq!(reports.len(), 1);
    assert!((reports[0].fps - 24.0).abs() < 1e-9, "fps = {}", reports[0].fps);
    assert_eq!(reports[0].at, ms(5_000));
    assert_eq!(frame_loop.gate().frames_since_report(), 0);
}

#[test]
fn pause_chord_round_trip() {
    let (mut sim, readers) = rig(page());
    let chord = KeyEvent::press('p').with_modifiers(Modifiers::CTRL | Modifiers::ALT);

    sim.run_for(ms(200));
    sim.send(HostEvent::Key(chord));
    assert_eq!(sim.frame_loop().gate().mode(), GateMode::Paused);

    let paused_at = readers.position.get();
    sim.run_for(ms(1_000));
    assert_eq!(readers.position.get(), paused_at);

    sim.send(HostEvent::Key(chord));
    sim.run_for(ms(100));
    assert_ne!(readers.position.get(), paused_at);
    assert_eq!(sim.frame_loop().gate().mode(), GateMode::Normal);
}

#[test]
fn fps_reports_every_five_seconds() {
    let (mut sim, _) = rig(page());
    // Reports land on the first frames at or past 5008 ms and 10016 ms.
    let stats = sim.run_for(ms(10_100));
    assert_eq!(stats.fps_reports.len(), 2);
    for report in &stats.fps_reports {
        assert!((report.fps - 62.5).abs() < 1.0, "fps = {}", report.fps);
        assert_eq!(report.mode, GateMode::Normal);
    }
    assert_eq!(
        sim.frame_loop().gate().average_frame_time(),
        Some(STEP),
        "steady 16 ms frames"
    );
}

#[test]
fn background_gap_is_not_a_frame() {
    let (mut sim, readers) = rig(page());
    sim.run_for(ms(500));
    sim.send(HostEvent::Visibility(false));
    // The host stops delivering frames while hidden.
    sim.idle(ms(30_000));
    sim.send(HostEvent::Visibility(true));

    let before = readers.position.get();
    sim.step();
    let jump = readers.position.get().distance(before);
    assert!(jump < 5.0, "first frame back moved {jump} px");

    sim.run_for(ms(100));
    let gate = sim.frame_loop().gate();
    assert!(gate.is_tab_active());
    assert!(
        gate.frame_durations().iter().all(|d| d <= STEP),
        "no sample spans the hidden period"
    );
}

#[test]
fn missing_element_is_retried_then_picked_up() {
    let host = ScriptedHost::new().with_element(CUBE_ELEMENT, LayoutBox::default());
    let (mut sim, readers) = rig(host);
    let start = readers.position.get();
    sim.run_for(ms(250));
    assert_eq!(readers.position.get(), start);

    sim.host_mut().attach(PIXEL_ELEMENT, LayoutBox::new(396.0, 296.0, 8.0, 8.0));
    sim.run_for(ms(250));
    assert_ne!(readers.position.get(), start);
}

#[test]
fn detached_pixel_stops_its_producers_only() {
    let (mut sim, _) = rig(page());
    sim.run_for(ms(100));
    sim.host_mut().detach(PIXEL_ELEMENT);
    sim.run_for(ms(100));
    // Motion, division and evolution live on the pixel; cubes keep running.
    assert_eq!(sim.frame_loop().live_producers(), 1);
    assert!(sim.frame_loop().is_running());
}

#[test]
fn teardown_clears_markers_and_stops_loop() {
    let (mut sim, readers) = rig(page());
    sim.run_for(ms(100));
    sim.frame_loop_mut().gate_mut().pause();
    sim.send(HostEvent::Teardown);
    assert!(sim.frame_loop().gate().css_classes().is_empty());
    assert!(!sim.frame_loop().is_running());

    sim.frame_loop_mut().gate_mut().resume();
    let at_teardown = readers.position.get();
    let stats = sim.run_for(ms(200));
    assert_eq!(stats.invocations, 0);
    assert_eq!(readers.position.get(), at_teardown);
}
