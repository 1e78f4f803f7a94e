#![forbid(unsafe_code)]

//! Configuration.
//!
//! Precedence, lowest to highest: [`Default`], a JSON file
//! ([`CpixelConfig::from_json_file`], `serde` feature), then environment
//! variables ([`CpixelConfig::apply_env`]). Binaries layer CLI flags on top.
//!
//! # Env Var Contract
//!
//! - `CPIXEL_INSPECT_INTERVAL_MS` - minimum spacing between inspection checks
//! - `CPIXEL_FPS_REPORT_MS` - FPS report interval
//! - `CPIXEL_FRAME_WINDOW` - number of frame durations retained (>= 1)
//! - `CPIXEL_PERF_PROBE` - `1`/`true` enables the performance-drop probe
//! - `CPIXEL_TOGGLE_PAUSE`, `CPIXEL_TOGGLE_INSPECT` - chords such as `ctrl+alt+p`

use std::time::Duration;

use crate::detect::DetectorConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::frame_window::{DEFAULT_WINDOW_CAPACITY, MAX_WINDOW_CAPACITY};
use crate::keyboard::{KeyChord, KeyboardConfig};

/// Timing knobs of the [`FrameGate`](crate::gate::FrameGate).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GateConfig {
    /// Minimum spacing between inspection re-evaluations, in ms.
    pub inspection_check_interval_ms: u64,
    /// Interval between FPS reports, in ms.
    pub fps_report_interval_ms: u64,
    /// Capacity of the recent frame-duration window.
    pub frame_window_capacity: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            inspection_check_interval_ms: 250,
            fps_report_interval_ms: 5000,
            frame_window_capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}

impl GateConfig {
    /// Set the inspection check interval (builder).
    #[must_use]
    pub fn inspection_check_interval(mut self, interval: Duration) -> Self {
        self.inspection_check_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the FPS report interval (builder).
    #[must_use]
    pub fn fps_report_interval(mut self, interval: Duration) -> Self {
        self.fps_report_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the frame window capacity (builder).
    #[must_use]
    pub fn frame_window_capacity(mut self, capacity: usize) -> Self {
        self.frame_window_capacity = capacity;
        self
    }

    /// Inspection check interval as a [`Duration`].
    #[must_use]
    pub fn inspection_interval(&self) -> Duration {
        Duration::from_millis(self.inspection_check_interval_ms)
    }

    /// FPS report interval as a [`Duration`].
    #[must_use]
    pub fn fps_interval(&self) -> Duration {
        Duration::from_millis(self.fps_report_interval_ms)
    }
}

/// Complete configuration for the gate and its writers.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CpixelConfig {
    /// Gate timing.
    pub gate: GateConfig,
    /// Inspection detector probes.
    pub detector: DetectorConfig,
    /// Operator chords.
    pub keyboard: KeyboardConfig,
}

impl CpixelConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a JSON config file. Missing fields keep their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse a JSON config document.
    #[cfg(feature = "serde")]
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally `std::env::var`).
    ///
    /// Taking a lookup function keeps tests independent of process state.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        if let Some(v) = lookup("CPIXEL_INSPECT_INTERVAL_MS") {
            self.gate.inspection_check_interval_ms = parse_num("CPIXEL_INSPECT_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("CPIXEL_FPS_REPORT_MS") {
            self.gate.fps_report_interval_ms = parse_num("CPIXEL_FPS_REPORT_MS", &v)?;
        }
        if let Some(v) = lookup("CPIXEL_FRAME_WINDOW") {
            self.gate.frame_window_capacity = parse_num("CPIXEL_FRAME_WINDOW", &v)?;
        }
        if let Some(v) = lookup("CPIXEL_PERF_PROBE") {
            self.detector.performance_drop = parse_flag("CPIXEL_PERF_PROBE", &v)?;
        }
        if let Some(v) = lookup("CPIXEL_TOGGLE_PAUSE") {
            self.keyboard.toggle_pause = parse_chord("CPIXEL_TOGGLE_PAUSE", &v)?;
        }
        if let Some(v) = lookup("CPIXEL_TOGGLE_INSPECT") {
            self.keyboard.toggle_inspection = parse_chord("CPIXEL_TOGGLE_INSPECT", &v)?;
        }
        self.validate()
    }

    /// Reject values the gate cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(1..=MAX_WINDOW_CAPACITY).contains(&self.gate.frame_window_capacity) {
            return Err(ConfigError::Invalid {
                key: "frame_window_capacity",
                value: self.gate.frame_window_capacity.to_string(),
            });
        }
        if self.gate.fps_report_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "fps_report_interval_ms",
                value: "0".into(),
            });
        }
        if self.keyboard.toggle_pause == self.keyboard.toggle_inspection {
            return Err(ConfigError::Invalid {
                key: "keyboard",
                value: self.keyboard.toggle_pause.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_num<T: std::str::FromStr>(key: &'static str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_owned(),
    })
}

fn parse_flag(key: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_owned(),
        }),
    }
}

fn parse_chord(key: &'static str, value: &str) -> ConfigResult<KeyChord> {
    value.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_owned(),
    })
}
