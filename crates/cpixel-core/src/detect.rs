#![forbid(unsafe_code)]

//! Heuristic detection of an active element inspector.
//!
//! No portable signal says "a developer tool is inspecting this node", so the
//! detector infers it from several independent probes. Inspectors force
//! synchronous layout recomputation that fights with continuous animation,
//! which is why a positive reading suspends all frame work.
//!
//! # Algorithm
//!
//! 1. Run every configured [`SignalProbe`] in order against the current
//!    [`ProbeInputs`].
//! 2. Combine the readings with logical OR. A single positive reading is
//!    enough; there is no vote.
//! 3. Report the combined verdict together with each probe's raw reading and
//!    every probe failure.
//!
//! # Failure Modes
//!
//! - A probe that errors contributes no reading; the rest still run. A
//!   positive reading from any other probe still decides the pass. Only a
//!   pass with failures and no positive reading is inconclusive, and then the
//!   gate keeps its previous verdict and retries on its next check.
//! - Weak probes (layout delta, modifiers, performance drop) have false
//!   positives by nature. They are opt-in via [`DetectorConfig`].
//!   [`SignalStrength`] labels them but does not weight them.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::error::DetectError;
use crate::frame_window::FrameTimeWindow;
use crate::host::{HostEnvironment, LayoutBox, MarkerScope};
use crate::keyboard::Modifiers;

/// Element the detector watches by default.
pub const DEFAULT_TRACKED_ELEMENT: &str = "conscious-pixel";

// ---------------------------------------------------------------------------
// Probe seam
// ---------------------------------------------------------------------------

/// How much a probe's positive reading can be trusted. Diagnostic label only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStrength {
    /// A positive reading is conclusive on its own.
    Definitive,
    /// A positive reading is suggestive. Prone to false positives.
    Weak,
}

/// Everything a probe may look at.
#[derive(Clone, Copy)]
pub struct ProbeInputs<'a> {
    /// The host page.
    pub host: &'a dyn HostEnvironment,
    /// Modifier state cached from the last key event.
    pub modifiers: Modifiers,
    /// Recent frame durations recorded by the gate.
    pub frames: &'a FrameTimeWindow,
}

/// One boolean signal of inspector activity.
pub trait SignalProbe {
    /// Stable name, used as the key in the diagnostic signal map.
    fn name(&self) -> &'static str;

    /// Trust label for diagnostics.
    fn strength(&self) -> SignalStrength;

    /// Take a reading.
    fn probe(&mut self, inputs: &ProbeInputs<'_>) -> Result<bool, DetectError>;
}

/// Outcome of a detection pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Detection {
    /// OR of every successful reading.
    pub inspecting: bool,
    /// Raw reading per probe name. Failed probes are absent.
    pub signals: BTreeMap<&'static str, bool>,
    /// Probes that could not take a reading, in evaluation order.
    pub failures: Vec<DetectError>,
}

impl Detection {
    /// The verdict this pass supports: `Some(true)` on any positive reading,
    /// `Some(false)` when every probe read negative, `None` when some probe
    /// failed and none read positive.
    #[must_use]
    pub fn verdict(&self) -> Option<bool> {
        if self.inspecting {
            Some(true)
        } else if self.failures.is_empty() {
            Some(false)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Which probes the default detector carries and how they are tuned.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetectorConfig {
    /// Id of the animated element whose markers and layout are probed.
    pub tracked_element: String,
    /// Tool-specific attributes/classes whose presence means inspection.
    pub marker_names: Vec<String>,
    /// Query parameter that forces inspection when set to `true`.
    pub query_param: String,
    /// Enable the layout-delta probe.
    pub layout_heuristic: bool,
    /// Layout change (px) the layout-delta probe treats as a forced reflow.
    pub layout_threshold_px: f32,
    /// Enable the modifier probe.
    pub modifier_heuristic: bool,
    /// Enable the performance-drop probe.
    pub performance_drop: bool,
    /// Average frame time (ms) above which the performance probe fires.
    pub performance_threshold_ms: u64,
    /// Samples required before the performance probe may fire.
    pub performance_min_samples: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            tracked_element: DEFAULT_TRACKED_ELEMENT.to_owned(),
            marker_names: vec![
                "data-devtools-inspected".to_owned(),
                "data-inspector-highlight".to_owned(),
                "__devtools-highlighted".to_owned(),
            ],
            query_param: "inspect".to_owned(),
            layout_heuristic: false,
            layout_threshold_px: 2.0,
            modifier_heuristic: false,
            performance_drop: false,
            performance_threshold_ms: 50,
            performance_min_samples: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in probes
// ---------------------------------------------------------------------------

/// Tool-specific attributes or classes on the tracked element or the body.
#[derive(Debug, Clone)]
pub struct MarkerProbe {
    element: String,
    names: Vec<String>,
}

impl MarkerProbe {
    /// Probe `element` and the body for any of `names`.
    #[must_use]
    pub fn new(element: impl Into<String>, names: Vec<String>) -> Self {
        Self {
            element: element.into(),
            names,
        }
    }
}

impl SignalProbe for MarkerProbe {
    fn name(&self) -> &'static str {
        "marker"
    }

    fn strength(&self) -> SignalStrength {
        SignalStrength::Definitive
    }

    fn probe(&mut self, inputs: &ProbeInputs<'_>) -> Result<bool, DetectError> {
        for name in &self.names {
            let on_element = inputs
                .host
                .has_marker(MarkerScope::Element(&self.element), name)
                .map_err(|e| DetectError::host(self.name(), e))?;
            let on_body = inputs
                .host
                .has_marker(MarkerScope::Body, name)
                .map_err(|e| DetectError::host(self.name(), e))?;
            if on_element || on_body {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Explicit `?inspect=true` escape hatch.
#[derive(Debug, Clone)]
pub struct QueryParamProbe {
    key: String,
}

impl QueryParamProbe {
    /// Probe the query parameter `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl SignalProbe for QueryParamProbe {
    fn name(&self) -> &'static str {
        "query_param"
    }

    fn strength(&self) -> SignalStrength {
        SignalStrength::Definitive
    }

    fn probe(&mut self, inputs: &ProbeInputs<'_>) -> Result<bool, DetectError> {
        Ok(inputs
            .host
            .query_param(&self.key)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")))
    }
}

/// Layout box of the tracked element moved between samples.
///
/// Producers animate by transform only, so a layout change suggests something
/// else is forcing reflow. The first sample only establishes a baseline.
#[derive(Debug, Clone)]
pub struct LayoutDeltaProbe {
    element: String,
    threshold_px: f32,
    previous: Option<LayoutBox>,
}

impl LayoutDeltaProbe {
    /// Probe `element` for layout changes larger than `threshold_px`.
    #[must_use]
    pub fn new(element: impl Into<String>, threshold_px: f32) -> Self {
        Self {
            element: element.into(),
            threshold_px,
            previous: None,
        }
    }
}

impl SignalProbe for LayoutDeltaProbe {
    fn name(&self) -> &'static str {
        "layout_delta"
    }

    fn strength(&self) -> SignalStrength {
        SignalStrength::Weak
    }

    fn probe(&mut self, inputs: &ProbeInputs<'_>) -> Result<bool, DetectError> {
        let current = inputs
            .host
            .layout_box(&self.element)
            .map_err(|e| DetectError::host(self.name(), e))?;
        let moved = self
            .previous
            .is_some_and(|prev| prev.max_delta(&current) > self.threshold_px);
        self.previous = Some(current);
        Ok(moved)
    }
}

/// Ctrl+Shift held: the usual inspector shortcut prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModifierProbe;

impl SignalProbe for ModifierProbe {
    fn name(&self) -> &'static str {
        "modifiers"
    }

    fn strength(&self) -> SignalStrength {
        SignalStrength::Weak
    }

    fn probe(&mut self, inputs: &ProbeInputs<'_>) -> Result<bool, DetectError> {
        Ok(inputs.modifiers.contains(Modifiers::CTRL | Modifiers::SHIFT))
    }
}

/// Average recent frame time above a threshold.
///
/// Heuristic: slow frames also come from system load and background-tab
/// throttling, not only from an inspector.
#[derive(Debug, Clone)]
pub struct PerformanceDropProbe {
    threshold: Duration,
    min_samples: usize,
}

impl PerformanceDropProbe {
    /// Fire when at least `min_samples` frames average above `threshold`.
    #[must_use]
    pub fn new(threshold: Duration, min_samples: usize) -> Self {
        Self {
            threshold,
            min_samples: min_samples.max(1),
        }
    }
}

impl SignalProbe for PerformanceDropProbe {
    fn name(&self) -> &'static str {
        "performance_drop"
    }

    fn strength(&self) -> SignalStrength {
        SignalStrength::Weak
    }

    fn probe(&mut self, inputs: &ProbeInputs<'_>) -> Result<bool, DetectError> {
        if inputs.frames.len() < self.min_samples {
            return Ok(false);
        }
        Ok(inputs
            .frames
            .average()
            .is_some_and(|avg| avg > self.threshold))
    }
}

// ---------------------------------------------------------------------------
// InspectionDetector
// ---------------------------------------------------------------------------

/// Ordered list of probes combined by OR.
#[derive(Default)]
pub struct InspectionDetector {
    probes: Vec<Box<dyn SignalProbe>>,
}

impl fmt::Debug for InspectionDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.probes.iter().map(|p| (p.name(), p.strength())))
            .finish()
    }
}

impl InspectionDetector {
    /// Detector with the probes enabled in `config`.
    #[must_use]
    pub fn new(config: &DetectorConfig) -> Self {
        let mut detector = Self::empty()
            .with_probe(MarkerProbe::new(
                config.tracked_element.clone(),
                config.marker_names.clone(),
            ))
            .with_probe(QueryParamProbe::new(config.query_param.clone()));
        if config.layout_heuristic {
            detector.push(LayoutDeltaProbe::new(
                config.tracked_element.clone(),
                config.layout_threshold_px,
            ));
        }
        if config.modifier_heuristic {
            detector.push(ModifierProbe);
        }
        if config.performance_drop {
            detector.push(PerformanceDropProbe::new(
                Duration::from_millis(config.performance_threshold_ms),
                config.performance_min_samples,
            ));
        }
        detector
    }

    /// Detector with no probes. Never reports inspection.
    #[must_use]
    pub fn empty() -> Self {
        Self { probes: Vec::new() }
    }

    /// Append a probe (builder).
    #[must_use]
    pub fn with_probe(mut self, probe: impl SignalProbe + 'static) -> Self {
        self.push(probe);
        self
    }

    /// Append a probe.
    pub fn push(&mut self, probe: impl SignalProbe + 'static) {
        self.probes.push(Box::new(probe));
    }

    /// Probe names in evaluation order.
    pub fn probe_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.probes.iter().map(|p| p.name())
    }

    /// Run every probe and OR the readings. Failing probes are collected,
    /// never short-circuit the pass.
    pub fn gather(&mut self, inputs: &ProbeInputs<'_>) -> Detection {
        let mut detection = Detection::default();
        for probe in &mut self.probes {
            let reading = match probe.probe(inputs) {
                Ok(reading) => reading,
                Err(err) => {
                    detection.failures.push(err);
                    continue;
                }
            };
            if reading {
                tracing::trace!(
                    target: "cpixel.detect",
                    probe = probe.name(),
                    strength = ?probe.strength(),
                    "signal positive"
                );
            }
            detection.signals.insert(probe.name(), reading);
            detection.inspecting |= reading;
        }
        detection
    }
}
