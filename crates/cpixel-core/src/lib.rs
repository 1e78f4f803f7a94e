#![forbid(unsafe_code)]

//! Core: the frame gate and everything that writes into it.
//!
//! # Key Components
//!
//! - [`FrameGate`] - shared skip decision, pause/inspection/visibility flags, frame timing
//! - [`InspectionDetector`] - throttled heuristic built from pluggable [`SignalProbe`]s
//! - [`VisibilityTracker`] - foreground/background transitions
//! - [`KeyboardOverrideHandler`] - operator chords for pause and inspection
//! - [`HostEnvironment`] - the page/host seen through a narrow trait
//!
//! # Role in cpixel
//! `cpixel-core` owns no animation state. Producers in `cpixel-runtime` read
//! the gate once per frame; detectors, visibility and keyboard handlers only
//! ever write gate flags.

pub mod animation;
pub mod clock;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame_window;
pub mod gate;
pub mod host;
pub mod keyboard;
pub mod logging;
pub mod visibility;

pub use animation::{Breath, Easing, GrowIn, Heartbeat, Tween};
pub use clock::{DeterministicClock, FrameClock, SystemClock};
pub use config::{CpixelConfig, GateConfig};
pub use detect::{Detection, DetectorConfig, InspectionDetector, ProbeInputs, SignalProbe};
pub use error::{ConfigError, DetectError, HostError};
pub use frame_window::{FpsMeter, FrameTimeWindow};
pub use gate::{FpsReport, FrameGate, GateMode, InspectionCheck, PageMarkers};
pub use host::{ElementState, HostEnvironment, LayoutBox, Point, ScriptedHost};
pub use keyboard::{
    KeyChord, KeyEvent, KeyKind, KeyboardConfig, KeyboardOverrideHandler, Modifiers, OverrideAction,
};
pub use logging::{LogConfig, LogError, LogFormat};
pub use visibility::{VisibilityTracker, VisibilityTransition};
