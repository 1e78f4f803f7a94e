#![forbid(unsafe_code)]

//! Log output setup.
//!
//! Library code only emits `tracing` events, under these targets:
//!
//! - `cpixel.gate` - pause/inspection/visibility changes, FPS reports
//! - `cpixel.detect` - detection failures
//! - `cpixel.keyboard` - operator chords
//! - `cpixel.producer` - producer lifecycle, level-ups, divisions
//! - `cpixel.loop` - frame loop registration and teardown
//!
//! Binaries call [`LogConfig::install`] (feature `subscriber`) once at
//! startup. Applications that already own a subscriber skip it.
//!
//! # Env Var Contract
//!
//! - `CPIXEL_LOG` - `EnvFilter` directive, default `info`
//! - `CPIXEL_LOG_FORMAT` - `pretty` (default) or `json`
//!
//! # Invariants
//!
//! - `install()` never replaces an existing global subscriber; it fails instead.

use std::fmt;

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive string.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            format: LogFormat::Pretty,
        }
    }
}

impl LogConfig {
    /// Defaults overridden by `CPIXEL_LOG` / `CPIXEL_LOG_FORMAT`.
    ///
    /// An unknown format value falls back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(filter) = lookup("CPIXEL_LOG").filter(|f| !f.trim().is_empty()) {
            config.filter = filter;
        }
        if let Some(format) = lookup("CPIXEL_LOG_FORMAT").as_deref().and_then(LogFormat::parse) {
            config.format = format;
        }
        config
    }

    /// Set the filter directive (builder).
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set the output format (builder).
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Install a global `fmt` subscriber writing to stderr.
    #[cfg(feature = "subscriber")]
    pub fn install(&self) -> Result<(), LogError> {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_new(&self.filter)
            .map_err(|e| LogError::InvalidFilter(format!("{}: {e}", self.filter)))?;
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true);
        let result = match self.format {
            LogFormat::Pretty => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
        result.map_err(|_| LogError::SubscriberAlreadySet)?;

        tracing::debug!(target: "cpixel.loop", filter = %self.filter, format = ?self.format, "logging installed");
        Ok(())
    }
}

/// Errors from [`LogConfig::install`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    /// A global subscriber was installed earlier.
    SubscriberAlreadySet,
    /// The filter directive did not parse.
    InvalidFilter(String),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::SubscriberAlreadySet => write!(f, "a global tracing subscriber is already set"),
            LogError::InvalidFilter(detail) => write!(f, "invalid log filter: {detail}"),
        }
    }
}

impl std::error::Error for LogError {}
