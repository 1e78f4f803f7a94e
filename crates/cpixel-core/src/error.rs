#![forbid(unsafe_code)]

//! Error types.
//!
//! None of these are fatal to the frame loop. Detection errors are swallowed
//! by [`FrameGate::check_for_inspection`](crate::gate::FrameGate::check_for_inspection)
//! and config errors only surface at startup.

use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Host errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failure while reading state from the host page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The element being queried does not exist (yet, or any more).
    NodeMissing(String),
    /// Layout information could not be computed for the element.
    LayoutUnavailable(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::NodeMissing(node) => write!(f, "host node missing: {node}"),
            HostError::LayoutUnavailable(node) => write!(f, "layout unavailable for {node}"),
        }
    }
}

impl std::error::Error for HostError {}

// ─────────────────────────────────────────────────────────────────────────────
// Detection errors
// ─────────────────────────────────────────────────────────────────────────────

/// A signal probe could not produce a reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// The probe needed host state that could not be read.
    Host {
        /// Name of the failing probe.
        probe: &'static str,
        /// Underlying host failure.
        source: HostError,
    },
    /// The probe was fed input it cannot interpret.
    InvalidInput {
        /// Name of the failing probe.
        probe: &'static str,
        /// What was wrong.
        reason: String,
    },
}

impl DetectError {
    /// Wrap a host failure for the named probe.
    #[must_use]
    pub fn host(probe: &'static str, source: HostError) -> Self {
        DetectError::Host { probe, source }
    }

    /// Name of the probe that failed.
    #[must_use]
    pub fn probe(&self) -> &'static str {
        match self {
            DetectError::Host { probe, .. } | DetectError::InvalidInput { probe, .. } => probe,
        }
    }
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectError::Host { probe, source } => write!(f, "probe '{probe}' failed: {source}"),
            DetectError::InvalidInput { probe, reason } => {
                write!(f, "probe '{probe}' rejected input: {reason}")
            }
        }
    }
}

impl std::error::Error for DetectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DetectError::Host { source, .. } => Some(source),
            DetectError::InvalidInput { .. } => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while assembling a [`CpixelConfig`](crate::config::CpixelConfig).
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error while reading a config file.
    Io(std::io::Error),
    /// The config file could not be parsed.
    #[cfg(feature = "serde")]
    Parse(serde_json::Error),
    /// A value was present but unusable.
    Invalid {
        /// Field or environment variable name.
        key: &'static str,
        /// Offending value as given.
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "serde")]
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::Invalid { key, value } => write!(f, "invalid value for {key}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            #[cfg(feature = "serde")]
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Result type for config loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
