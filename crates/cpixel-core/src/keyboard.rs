#![forbid(unsafe_code)]

//! Operator keyboard overrides.
//!
//! Two global modifier+letter chords sit on top of the gate: one toggles
//! inspection-suppression mode, one toggles pause. Both route through the
//! gate's public toggle methods, so a manual override is indistinguishable
//! from any other writer of those flags.
//!
//! Every key press and release also refreshes a cached modifier set. The
//! cache feeds the optional modifier probe in [`crate::detect`].

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::error::ConfigError;
use crate::gate::FrameGate;

bitflags! {
    /// Modifier keys held during a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

/// Press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyKind {
    /// Key went down.
    #[default]
    Press,
    /// Key went up.
    Release,
}

/// A keyboard event as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key, as a character.
    pub key: char,
    /// Modifier state reported with the event.
    pub modifiers: Modifiers,
    /// Press or release.
    pub kind: KeyKind,
}

impl KeyEvent {
    /// A key press with no modifiers.
    #[must_use]
    pub const fn press(key: char) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
            kind: KeyKind::Press,
        }
    }

    /// A key release with no modifiers.
    #[must_use]
    pub const fn release(key: char) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
            kind: KeyKind::Release,
        }
    }

    /// Set the modifier state (builder).
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

// ---------------------------------------------------------------------------
// KeyChord
// ---------------------------------------------------------------------------

/// A modifier+letter combination, e.g. `ctrl+alt+p`.
///
/// Matching is exact on modifiers and case-insensitive on the letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct KeyChord {
    /// Required modifiers.
    pub modifiers: Modifiers,
    /// The letter.
    pub key: char,
}

impl KeyChord {
    /// Create a chord.
    #[must_use]
    pub const fn new(modifiers: Modifiers, key: char) -> Self {
        Self { modifiers, key }
    }

    /// Whether `event` is a press of this chord.
    #[must_use]
    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.kind == KeyKind::Press
            && event.modifiers == self.modifiers
            && event.key.eq_ignore_ascii_case(&self.key)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (Modifiers::CTRL, "ctrl"),
            (Modifiers::ALT, "alt"),
            (Modifiers::SHIFT, "shift"),
            (Modifiers::SUPER, "super"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "{}", self.key.to_ascii_lowercase())
    }
}

impl FromStr for KeyChord {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::Invalid {
            key: "key_chord",
            value: s.to_owned(),
        };
        let mut modifiers = Modifiers::NONE;
        let mut key = None;
        for part in s.split('+').map(str::trim) {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers |= Modifiers::CTRL,
                "alt" | "option" => modifiers |= Modifiers::ALT,
                "shift" => modifiers |= Modifiers::SHIFT,
                "super" | "meta" | "cmd" => modifiers |= Modifiers::SUPER,
                other => {
                    let mut chars = other.chars();
                    match (chars.next(), chars.next(), key) {
                        (Some(c), None, None) if c.is_ascii_alphanumeric() => key = Some(c),
                        _ => return Err(invalid()),
                    }
                }
            }
        }
        match key {
            Some(key) if !modifiers.is_empty() => Ok(Self { modifiers, key }),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for KeyChord {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyChord> for String {
    fn from(chord: KeyChord) -> Self {
        chord.to_string()
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Chords bound to the two operator overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KeyboardConfig {
    /// Toggles inspection-suppression mode.
    pub toggle_inspection: KeyChord,
    /// Toggles pause.
    pub toggle_pause: KeyChord,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            toggle_inspection: KeyChord::new(Modifiers::CTRL | Modifiers::ALT, 'i'),
            toggle_pause: KeyChord::new(Modifiers::CTRL | Modifiers::ALT, 'p'),
        }
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// What an override chord did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideAction {
    /// Inspection mode was toggled; payload is the new value.
    InspectionToggled(bool),
    /// Pause was toggled; payload is the new value.
    PauseToggled(bool),
}

/// Routes operator chords to the gate and caches modifier state.
#[derive(Debug, Clone, Default)]
pub struct KeyboardOverrideHandler {
    config: KeyboardConfig,
    modifiers: Modifiers,
}

impl KeyboardOverrideHandler {
    /// Create a handler with the given chords.
    #[must_use]
    pub fn new(config: KeyboardConfig) -> Self {
        Self {
            config,
            modifiers: Modifiers::NONE,
        }
    }

    /// Modifier state from the most recent key event.
    #[must_use]
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Bound chords.
    #[must_use]
    pub fn config(&self) -> &KeyboardConfig {
        &self.config
    }

    /// Process a key event. Returns the override it triggered, if any.
    pub fn handle_key(&mut self, event: &KeyEvent, gate: &mut FrameGate) -> Option<OverrideAction> {
        self.modifiers = event.modifiers;

        if self.config.toggle_inspection.matches(event) {
            let message = gate.toggle_inspection_mode(None);
            tracing::info!(target: "cpixel.keyboard", chord = %self.config.toggle_inspection, "{message}");
            return Some(OverrideAction::InspectionToggled(gate.is_inspecting()));
        }
        if self.config.toggle_pause.matches(event) {
            let message = gate.toggle_pause();
            tracing::info!(target: "cpixel.keyboard", chord = %self.config.toggle_pause, "{message}");
            return Some(OverrideAction::PauseToggled(gate.is_paused()));
        }
        None
    }
}
