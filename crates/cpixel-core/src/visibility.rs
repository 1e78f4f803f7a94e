#![forbid(unsafe_code)]

//! Page visibility transitions.
//!
//! The host reports visibility whenever it likes, often repeating the current
//! state. [`VisibilityTracker`] collapses repeats and forwards real
//! transitions to [`FrameGate::handle_visibility_change`], which discards
//! frame-timing baselines on foregrounding.
//!
//! Visibility never suppresses frames by itself. Background throttling is the
//! host's business.

use std::time::Duration;

use crate::gate::FrameGate;

/// A real change of visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityTransition {
    /// Page went to the background.
    Hidden,
    /// Page came back to the foreground.
    Shown,
}

/// Tracks the last reported visibility and counts transitions.
#[derive(Debug, Clone)]
pub struct VisibilityTracker {
    visible: bool,
    transitions: u64,
    last_change: Option<Duration>,
}

impl Default for VisibilityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityTracker {
    /// A tracker that assumes the page starts visible.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            visible: true,
            transitions: 0,
            last_change: None,
        }
    }

    /// Handle a host visibility report.
    ///
    /// Returns `None` for a repeat of the current state; the gate is not
    /// touched in that case.
    pub fn on_visibility_change(
        &mut self,
        visible: bool,
        now: Duration,
        gate: &mut FrameGate,
    ) -> Option<VisibilityTransition> {
        if visible == self.visible {
            return None;
        }
        let hidden_for = match (visible, self.last_change) {
            (true, Some(at)) => Some(now.saturating_sub(at)),
            _ => None,
        };
        self.visible = visible;
        self.transitions += 1;
        self.last_change = Some(now);
        gate.handle_visibility_change(visible, now);

        let transition = if visible {
            VisibilityTransition::Shown
        } else {
            VisibilityTransition::Hidden
        };
        tracing::debug!(
            target: "cpixel.gate",
            ?transition,
            hidden_ms = hidden_for.map(|d| d.as_millis() as u64),
            transitions = self.transitions,
            "page visibility"
        );
        Some(transition)
    }

    /// Last reported visibility.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Number of real transitions seen.
    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.transitions
    }
}
