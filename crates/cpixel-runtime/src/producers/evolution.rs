#![forbid(unsafe_code)]

//! Evolution leveling.
//!
//! Experience accrues each executed frame in proportion to energy and frame
//! scale. Reaching `base_xp * level` experience within a level advances to
//! the next level and carries the remainder over. Levels map to a capped
//! sequence of stages.

use std::fmt;
use std::time::Duration;

use super::PIXEL_ELEMENT;
use crate::producer::{
    DEFAULT_RETRY_DELAY, DeltaClock, FrameContext, Producer, Rearm, element_liveness, gate_frame,
};
use crate::shared::Reader;

/// Visible evolution stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EvolutionStage {
    /// Level 1.
    Spark,
    /// Level 2.
    Flicker,
    /// Level 3.
    Glow,
    /// Level 4.
    Pulse,
    /// Level 5 and above.
    Nova,
}

impl EvolutionStage {
    /// Stage for a level (levels start at 1).
    #[must_use]
    pub fn for_level(level: u32) -> Self {
        match level {
            0 | 1 => Self::Spark,
            2 => Self::Flicker,
            3 => Self::Glow,
            4 => Self::Pulse,
            _ => Self::Nova,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spark => "spark",
            Self::Flicker => "flicker",
            Self::Glow => "glow",
            Self::Pulse => "pulse",
            Self::Nova => "nova",
        }
    }
}

impl fmt::Display for EvolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leveling tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionConfig {
    /// Host element the stage class is applied to.
    pub element: String,
    /// Experience per nominal frame at full energy.
    pub xp_rate: f32,
    /// Experience for level 1 -> 2; level `n` needs `base_xp * n`.
    pub base_xp: f32,
    /// Trait multiplier gained per level.
    pub trait_gain: f32,
    /// Delay before re-checking a missing element.
    pub retry_delay: Duration,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            element: PIXEL_ELEMENT.to_owned(),
            xp_rate: 1.0,
            base_xp: 100.0,
            trait_gain: 0.1,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Snapshot of the leveling state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvolutionState {
    /// Current level, from 1.
    pub level: u32,
    /// Experience inside the current level.
    pub xp: f32,
    /// Experience needed to leave the current level.
    pub next_threshold: f32,
    /// Stage for `level`.
    pub stage: EvolutionStage,
    /// Trait multiplier, 1.0 at level 1.
    pub trait_multiplier: f32,
}

/// Levels the pixel up as it gathers energy.
#[derive(Debug)]
pub struct Evolution {
    config: EvolutionConfig,
    clock: DeltaClock,
    level: u32,
    xp: f32,
    trait_multiplier: f32,
    energy: Reader<f32>,
}

impl Evolution {
    /// Start at level 1 with no experience.
    #[must_use]
    pub fn new(config: EvolutionConfig, energy: Reader<f32>) -> Self {
        Self {
            config,
            clock: DeltaClock::new(),
            level: 1,
            xp: 0.0,
            trait_multiplier: 1.0,
            energy,
        }
    }

    fn threshold(&self) -> f32 {
        self.config.base_xp.max(f32::EPSILON) * self.level as f32
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> EvolutionState {
        EvolutionState {
            level: self.level,
            xp: self.xp,
            next_threshold: self.threshold(),
            stage: EvolutionStage::for_level(self.level),
            trait_multiplier: self.trait_multiplier,
        }
    }

    fn gain(&mut self, xp: f32) {
        self.xp += xp;
        while self.xp >= self.threshold() {
            self.xp -= self.threshold();
            let before = EvolutionStage::for_level(self.level);
            self.level += 1;
            self.trait_multiplier += self.config.trait_gain;
            let stage = EvolutionStage::for_level(self.level);
            tracing::info!(
                target: "cpixel.producer",
                producer = self.id(),
                level = self.level,
                %stage,
                evolved = stage != before,
                "level up"
            );
        }
    }
}

impl Producer for Evolution {
    fn id(&self) -> &'static str {
        "evolution"
    }

    fn on_frame(&mut self, ctx: &mut FrameContext<'_>) -> Rearm {
        if !gate_frame(ctx) {
            return Rearm::NextFrame;
        }
        if let Some(rearm) =
            element_liveness(ctx.host, &self.config.element, self.config.retry_delay, self.id())
        {
            self.clock.reset();
            return rearm;
        }

        let delta = self.clock.advance(ctx.now, ctx.gate);
        let energy = self.energy.get().clamp(0.0, 1.0);
        self.gain(energy * delta.scale * self.config.xp_rate);
        Rearm::NextFrame
    }
}
