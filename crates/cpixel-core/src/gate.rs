#![forbid(unsafe_code)]

//! The frame gate: one shared decision point every producer consults before
//! doing any frame work.
//!
//! # Flags
//!
//! | flag           | writer                         | effect on frames |
//! |----------------|--------------------------------|------------------|
//! | `is_paused`    | operator (pause/resume/chord)  | suppress all     |
//! | `is_inspecting`| detector, inspection chord     | suppress all     |
//! | `is_tab_active`| visibility tracker             | none (timing reset only) |
//!
//! Suppression is binary. There is no reduced-rate state between "run" and
//! "skip".
//!
//! # Invariants
//!
//! 1. [`FrameGate::should_skip_frame`] is a pure read of the two suppression
//!    flags.
//! 2. `is_paused` and `is_inspecting` are independent; either alone suppresses.
//! 3. Every flag has exactly one writer path; all writes happen between frames
//!    on the same thread.
//! 4. The frame-duration window never exceeds its capacity.
//!
//! # Failure Modes
//!
//! - A failing inspection probe never hides another probe's positive
//!   reading. A pass with failures and no positive reading keeps the previous
//!   verdict and does not advance the check time, so the next call retries.
//!   The first failure of a streak is a warning; repeats are debug events.
//! - FPS and frame-duration bookkeeping are diagnostic; nothing reads them to
//!   decide a skip.

use std::collections::BTreeMap;
use std::time::Duration;

use bitflags::bitflags;

use crate::config::{CpixelConfig, GateConfig};
use crate::detect::{InspectionDetector, ProbeInputs};
use crate::error::DetectError;
use crate::frame_window::{FpsMeter, FrameTimeWindow};
use crate::host::HostEnvironment;
use crate::keyboard::Modifiers;

/// Confirmation returned by [`FrameGate::pause`].
pub const PAUSED_MESSAGE: &str = "Animations paused";
/// Confirmation returned by [`FrameGate::resume`].
pub const RESUMED_MESSAGE: &str = "Animations resumed";
/// Confirmation returned when inspection mode turns on.
pub const INSPECTION_ON_MESSAGE: &str = "Inspection mode enabled";
/// Confirmation returned when inspection mode turns off.
pub const INSPECTION_OFF_MESSAGE: &str = "Inspection mode disabled";

bitflags! {
    /// Page-level markers the gate asks the host to display.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PageMarkers: u8 {
        /// Animations paused by the operator.
        const PAUSED     = 0b01;
        /// Inspection suppression active.
        const INSPECTING = 0b10;
    }
}

impl PageMarkers {
    /// CSS classes the host should carry on the document element.
    #[must_use]
    pub fn css_classes(self) -> Vec<&'static str> {
        let mut classes = Vec::new();
        if self.contains(Self::PAUSED) {
            classes.push("cpixel-paused");
        }
        if self.contains(Self::INSPECTING) {
            classes.push("cpixel-inspecting");
        }
        classes
    }
}

/// Current gate mode, for diagnostics. Pause wins over inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Frames run.
    Normal,
    /// Suppressed by inspection.
    Inspecting,
    /// Suppressed by operator pause.
    Paused,
}

impl GateMode {
    /// Lowercase label used in log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            GateMode::Normal => "normal",
            GateMode::Inspecting => "inspecting",
            GateMode::Paused => "paused",
        }
    }
}

/// Periodic FPS figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsReport {
    /// Frames per second over the elapsed interval.
    pub fps: f64,
    /// Mode when the report was produced.
    pub mode: GateMode,
    /// Timestamp of the report.
    pub at: Duration,
    /// Mean of the recent frame-duration window.
    pub average_frame_time: Option<Duration>,
}

/// Result of a [`FrameGate::check_for_inspection`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectionCheck {
    /// Too soon since the last check; nothing ran.
    Throttled,
    /// Detection ran and confirmed the current verdict.
    Unchanged(bool),
    /// Detection ran and flipped the verdict to the payload.
    Changed(bool),
    /// A probe failed and none read positive; previous verdict kept.
    Failed,
}

/// Shared pause/inspection/visibility state and frame timing.
#[derive(Debug)]
pub struct FrameGate {
    config: GateConfig,
    detector: InspectionDetector,

    is_inspecting: bool,
    is_tab_active: bool,
    is_paused: bool,

    last_detection_signals: BTreeMap<&'static str, bool>,
    last_inspection_check: Option<Duration>,
    detection_failing: bool,

    frames: FrameTimeWindow,
    fps: FpsMeter,

    markers: PageMarkers,
    timing_epoch: u64,
}

impl FrameGate {
    /// Create a gate with the given timing and detector. Starts active,
    /// unpaused, not inspecting.
    #[must_use]
    pub fn new(config: GateConfig, detector: InspectionDetector) -> Self {
        Self {
            frames: FrameTimeWindow::new(config.frame_window_capacity),
            fps: FpsMeter::new(config.fps_interval()),
            config,
            detector,
            is_inspecting: false,
            is_tab_active: true,
            is_paused: false,
            last_detection_signals: BTreeMap::new(),
            last_inspection_check: None,
            detection_failing: false,
            markers: PageMarkers::empty(),
            timing_epoch: 0,
        }
    }

    /// Create a gate and detector from a full config.
    #[must_use]
    pub fn from_config(config: &CpixelConfig) -> Self {
        Self::new(config.gate.clone(), InspectionDetector::new(&config.detector))
    }

    // --- Skip decision ---

    /// Whether producers must skip this frame. Pure read.
    #[inline]
    #[must_use]
    pub fn should_skip_frame(&self) -> bool {
        self.is_paused || self.is_inspecting
    }

    /// Current mode. Pause wins over inspection.
    #[must_use]
    pub fn mode(&self) -> GateMode {
        if self.is_paused {
            GateMode::Paused
        } else if self.is_inspecting {
            GateMode::Inspecting
        } else {
            GateMode::Normal
        }
    }

    // --- Pause ---

    /// Suppress all frame work until [`resume`](Self::resume).
    pub fn pause(&mut self) -> &'static str {
        if !self.is_paused {
            self.is_paused = true;
            self.bump_epoch();
        }
        self.markers.insert(PageMarkers::PAUSED);
        tracing::info!(target: "cpixel.gate", mode = self.mode().as_str(), "{}", PAUSED_MESSAGE);
        PAUSED_MESSAGE
    }

    /// Lift an operator pause.
    pub fn resume(&mut self) -> &'static str {
        self.is_paused = false;
        self.markers.remove(PageMarkers::PAUSED);
        tracing::info!(target: "cpixel.gate", mode = self.mode().as_str(), "{}", RESUMED_MESSAGE);
        RESUMED_MESSAGE
    }

    /// Resume if paused, pause otherwise.
    pub fn toggle_pause(&mut self) -> &'static str {
        if self.is_paused {
            self.resume()
        } else {
            self.pause()
        }
    }

    // --- Inspection ---

    /// Manual inspection override. `Some(v)` forces the flag, `None` flips it.
    pub fn toggle_inspection_mode(&mut self, force: Option<bool>) -> &'static str {
        let next = force.unwrap_or(!self.is_inspecting);
        self.set_inspecting(next, "manual");
        if next {
            INSPECTION_ON_MESSAGE
        } else {
            INSPECTION_OFF_MESSAGE
        }
    }

    /// Re-run inspection detection if the check interval has elapsed.
    ///
    /// Never fails: an inconclusive pass is logged and leaves every piece of
    /// gate state as it was.
    pub fn check_for_inspection(
        &mut self,
        now: Duration,
        host: &dyn HostEnvironment,
        modifiers: Modifiers,
    ) -> InspectionCheck {
        if let Some(last) = self.last_inspection_check {
            if now.saturating_sub(last) < self.config.inspection_interval() {
                return InspectionCheck::Throttled;
            }
        }

        let inputs = ProbeInputs {
            host,
            modifiers,
            frames: &self.frames,
        };
        let detection = self.detector.gather(&inputs);
        let Some(inspecting) = detection.verdict() else {
            self.note_detection_failure(&detection.failures);
            return InspectionCheck::Failed;
        };

        if self.detection_failing {
            self.detection_failing = false;
            tracing::info!(target: "cpixel.detect", "inspection check recovered");
        }
        self.last_inspection_check = Some(now);
        self.last_detection_signals = detection.signals;
        if inspecting == self.is_inspecting {
            return InspectionCheck::Unchanged(inspecting);
        }
        self.set_inspecting(inspecting, "detector");
        InspectionCheck::Changed(inspecting)
    }

    /// Warn once per failure streak; repeats go to debug.
    fn note_detection_failure(&mut self, failures: &[DetectError]) {
        let probes: Vec<&'static str> = failures.iter().map(DetectError::probe).collect();
        let error = failures.first().map(ToString::to_string).unwrap_or_default();
        if self.detection_failing {
            tracing::debug!(
                target: "cpixel.detect",
                probes = ?probes,
                error = %error,
                "inspection check still failing"
            );
            return;
        }
        self.detection_failing = true;
        tracing::warn!(
            target: "cpixel.detect",
            probes = ?probes,
            error = %error,
            keep = self.is_inspecting,
            "inspection check failed; keeping previous state"
        );
    }

    fn set_inspecting(&mut self, inspecting: bool, source: &'static str) {
        let changed = inspecting != self.is_inspecting;
        self.is_inspecting = inspecting;
        self.markers.set(PageMarkers::INSPECTING, inspecting);
        if !changed {
            return;
        }
        if inspecting {
            self.bump_epoch();
        }
        tracing::info!(
            target: "cpixel.gate",
            inspecting,
            source,
            signals = ?self.last_detection_signals,
            "inspection state changed"
        );
    }

    // --- Frame timing ---

    /// Record one executed frame's duration.
    pub fn record_frame_time(&mut self, dt: Duration) {
        self.frames.push(dt);
        self.fps.count_frame();
    }

    /// Emit an FPS report once per report interval.
    pub fn update_fps(&mut self, now: Duration) -> Option<FpsReport> {
        let fps = self.fps.poll(now)?;
        let report = FpsReport {
            fps,
            mode: self.mode(),
            at: now,
            average_frame_time: self.frames.average(),
        };
        tracing::info!(
            target: "cpixel.gate",
            fps = format_args!("{:.1}", report.fps),
            mode = report.mode.as_str(),
            avg_frame_ms = report.average_frame_time.map(|d| d.as_secs_f64() * 1000.0),
            "fps report"
        );
        Some(report)
    }

    // --- Visibility & lifecycle ---

    /// Apply a host visibility change. Foregrounding discards timing
    /// baselines so the gap spent in the background never counts as a frame.
    pub fn handle_visibility_change(&mut self, visible: bool, now: Duration) {
        let was_active = self.is_tab_active;
        self.is_tab_active = visible;
        if visible && !was_active {
            self.frames.clear();
            self.fps.rebase(now);
            self.bump_epoch();
        }
        tracing::debug!(target: "cpixel.gate", visible, was_active, "visibility changed");
    }

    /// Clear every page marker. Called on page teardown.
    pub fn teardown(&mut self) {
        if !self.markers.is_empty() {
            tracing::debug!(target: "cpixel.gate", markers = ?self.markers, "clearing page markers");
        }
        self.markers = PageMarkers::empty();
    }

    fn bump_epoch(&mut self) {
        self.timing_epoch = self.timing_epoch.wrapping_add(1);
    }

    // --- Accessors ---

    /// Operator pause flag.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// Inspection flag.
    #[must_use]
    pub fn is_inspecting(&self) -> bool {
        self.is_inspecting
    }

    /// Tab visibility flag.
    #[must_use]
    pub fn is_tab_active(&self) -> bool {
        self.is_tab_active
    }

    /// Raw signals from the last successful detection pass.
    #[must_use]
    pub fn last_detection_signals(&self) -> &BTreeMap<&'static str, bool> {
        &self.last_detection_signals
    }

    /// Recent frame durations, oldest first.
    #[must_use]
    pub fn frame_durations(&self) -> &FrameTimeWindow {
        &self.frames
    }

    /// Mean recent frame duration.
    #[must_use]
    pub fn average_frame_time(&self) -> Option<Duration> {
        self.frames.average()
    }

    /// Frames recorded since the last FPS report.
    #[must_use]
    pub fn frames_since_report(&self) -> u32 {
        self.fps.frames_since_report()
    }

    /// Last reported FPS.
    #[must_use]
    pub fn last_fps(&self) -> Option<f64> {
        self.fps.last_fps()
    }

    /// Active page markers.
    #[must_use]
    pub fn markers(&self) -> PageMarkers {
        self.markers
    }

    /// CSS classes for the active page markers.
    #[must_use]
    pub fn css_classes(&self) -> Vec<&'static str> {
        self.markers.css_classes()
    }

    /// Counter that changes whenever frame timing baselines become stale.
    #[must_use]
    pub fn timing_epoch(&self) -> u64 {
        self.timing_epoch
    }

    /// Gate timing configuration.
    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{DEFAULT_TRACKED_ELEMENT, DetectorConfig};
    use crate::host::{LayoutBox, MarkerScope, ScriptedHost};
    use tracing_test::traced_test;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn gate() -> FrameGate {
        FrameGate::from_config(&CpixelConfig::default())
    }

    fn pixel_host() -> ScriptedHost {
        ScriptedHost::new().with_element(DEFAULT_TRACKED_ELEMENT, LayoutBox::new(0.0, 0.0, 8.0, 8.0))
    }

    #[test]
    fn fresh_gate_runs_frames() {
        let gate = gate();
        assert!(!gate.should_skip_frame());
        assert_eq!(gate.mode(), GateMode::Normal);
        assert!(gate.is_tab_active());
        assert!(gate.markers().is_empty());
    }

    #[test]
    fn pause_wins_over_inspection() {
        let mut gate = gate();
        gate.toggle_inspection_mode(Some(true));
        gate.pause();
        assert_eq!(gate.mode(), GateMode::Paused);
        gate.resume();
        assert_eq!(gate.mode(), GateMode::Inspecting);
        assert!(gate.should_skip_frame());
    }

    #[test]
    fn markers_follow_flags() {
        let mut gate = gate();
        gate.pause();
        gate.toggle_inspection_mode(Some(true));
        assert_eq!(gate.css_classes(), vec!["cpixel-paused", "cpixel-inspecting"]);
        gate.resume();
        assert_eq!(gate.css_classes(), vec!["cpixel-inspecting"]);
        gate.teardown();
        assert!(gate.css_classes().is_empty());
    }

    #[test]
    fn toggle_inspection_messages() {
        let mut gate = gate();
        assert_eq!(gate.toggle_inspection_mode(None), INSPECTION_ON_MESSAGE);
        assert_eq!(gate.toggle_inspection_mode(None), INSPECTION_OFF_MESSAGE);
        assert_eq!(gate.toggle_inspection_mode(Some(false)), INSPECTION_OFF_MESSAGE);
        assert!(!gate.is_inspecting());
    }

    #[test]
    fn suppression_start_bumps_epoch() {
        let mut gate = gate();
        let e0 = gate.timing_epoch();
        gate.pause();
        let e1 = gate.timing_epoch();
        assert_ne!(e0, e1);
        gate.pause();
        assert_eq!(gate.timing_epoch(), e1, "repeated pause is not a new suppression");
        gate.resume();
        gate.toggle_inspection_mode(Some(true));
        assert_ne!(gate.timing_epoch(), e1);
    }

    #[test]
    fn inspection_check_is_throttled() {
        let mut gate = gate();
        let mut host = pixel_host();
        assert_eq!(
            gate.check_for_inspection(ms(0), &host, Modifiers::NONE),
            InspectionCheck::Unchanged(false)
        );
        host.add_marker(MarkerScope::Body, "data-devtools-inspected");
        assert_eq!(
            gate.check_for_inspection(ms(249), &host, Modifiers::NONE),
            InspectionCheck::Throttled
        );
        assert!(!gate.is_inspecting());
        assert_eq!(
            gate.check_for_inspection(ms(250), &host, Modifiers::NONE),
            InspectionCheck::Changed(true)
        );
        assert!(gate.should_skip_frame());
        assert_eq!(gate.last_detection_signals().get("marker"), Some(&true));
        assert!(gate.markers().contains(PageMarkers::INSPECTING));

        host.remove_marker(MarkerScope::Body, "data-devtools-inspected");
        assert_eq!(
            gate.check_for_inspection(ms(600), &host, Modifiers::NONE),
            InspectionCheck::Changed(false)
        );
        assert!(!gate.should_skip_frame());
    }

    #[traced_test]
    #[test]
    fn detection_error_keeps_previous_state() {
        let mut gate = gate();
        gate.toggle_inspection_mode(Some(true));
        let before = gate.last_detection_signals().clone();

        // Tracked element never created: the marker probe fails.
        let host = ScriptedHost::new();
        assert_eq!(
            gate.check_for_inspection(ms(1000), &host, Modifiers::NONE),
            InspectionCheck::Failed
        );
        assert!(gate.is_inspecting());
        assert_eq!(gate.last_detection_signals(), &before);
        assert!(logs_contain("inspection check failed"));

        // Failure does not consume the interval; a healthy host is checked at once.
        assert_eq!(
            gate.check_for_inspection(ms(1001), &pixel_host(), Modifiers::NONE),
            InspectionCheck::Changed(false)
        );
    }

    #[traced_test]
    #[test]
    fn failure_streak_warns_once() {
        let mut gate = gate();
        let missing = ScriptedHost::new();
        for t in 0..5 {
            assert_eq!(
                gate.check_for_inspection(ms(t * 16), &missing, Modifiers::NONE),
                InspectionCheck::Failed
            );
        }
        logs_assert(|lines: &[&str]| {
            let warnings = lines
                .iter()
                .filter(|l| l.contains("inspection check failed"))
                .count();
            let repeats = lines
                .iter()
                .filter(|l| l.contains("inspection check still failing"))
                .count();
            match (warnings, repeats) {
                (1, 4) => Ok(()),
                other => Err(format!("warnings/repeats = {other:?}")),
            }
        });

        gate.check_for_inspection(ms(100), &pixel_host(), Modifiers::NONE);
        assert!(logs_contain("inspection check recovered"));
    }

    #[test]
    fn query_param_holds_while_tracked_element_is_missing() {
        let mut gate = gate();
        let host = ScriptedHost::new().with_url("http://localhost/pixel?inspect=true");
        assert_eq!(
            gate.check_for_inspection(ms(0), &host, Modifiers::NONE),
            InspectionCheck::Changed(true)
        );
        assert!(gate.should_skip_frame());
        assert_eq!(gate.last_detection_signals().get("query_param"), Some(&true));
        assert_eq!(gate.last_detection_signals().get("marker"), None);
    }

    #[test]
    fn query_param_forces_inspection() {
        let mut gate = gate();
        let host = pixel_host().with_url("http://localhost/?inspect=true");
        gate.check_for_inspection(ms(0), &host, Modifiers::NONE);
        assert!(gate.is_inspecting());
    }

    #[test]
    fn modifier_probe_only_when_enabled() {
        let host = pixel_host();
        let held = Modifiers::CTRL | Modifiers::SHIFT;

        let mut plain = gate();
        plain.check_for_inspection(ms(0), &host, held);
        assert!(!plain.is_inspecting());

        let config = CpixelConfig {
            detector: DetectorConfig {
                modifier_heuristic: true,
                ..DetectorConfig::default()
            },
            ..CpixelConfig::default()
        };
        let mut heuristic = FrameGate::from_config(&config);
        heuristic.check_for_inspection(ms(0), &host, held);
        assert!(heuristic.is_inspecting());
    }

    #[test]
    fn record_frame_time_counts_frames() {
        let mut gate = gate();
        for _ in 0..3 {
            gate.record_frame_time(ms(16));
        }
        assert_eq!(gate.frames_since_report(), 3);
        assert_eq!(gate.average_frame_time(), Some(ms(16)));
    }

    #[traced_test]
    #[test]
    fn fps_report_carries_mode() {
        let mut gate = gate();
        for _ in 0..50 {
            gate.record_frame_time(ms(100));
        }
        assert!(gate.update_fps(ms(4999)).is_none());
        gate.toggle_inspection_mode(Some(true));
        let report = gate.update_fps(ms(5000)).expect("interval elapsed");
        assert!((report.fps - 10.0).abs() < 1e-9);
        assert_eq!(report.mode, GateMode::Inspecting);
        assert_eq!(gate.last_fps(), Some(report.fps));
        assert!(logs_contain("fps report"));
    }

    #[test]
    fn foregrounding_resets_timing() {
        let mut gate = gate();
        gate.record_frame_time(ms(16));
        gate.handle_visibility_change(false, ms(100));
        assert!(!gate.is_tab_active());
        assert_eq!(gate.frame_durations().len(), 1, "hiding keeps samples");

        let epoch = gate.timing_epoch();
        gate.handle_visibility_change(true, ms(60_000));
        assert!(gate.is_tab_active());
        assert!(gate.frame_durations().is_empty());
        assert_eq!(gate.frames_since_report(), 0);
        assert_ne!(gate.timing_epoch(), epoch);
        // The FPS interval restarts at the foregrounding time.
        assert!(gate.update_fps(ms(64_999)).is_none());
    }
}
