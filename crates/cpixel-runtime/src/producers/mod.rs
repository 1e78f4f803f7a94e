#![forbid(unsafe_code)]

//! The four conscious-pixel producers.
//!
//! | producer         | writes            | reads             |
//! |------------------|-------------------|-------------------|
//! | [`PixelMotion`]  | pixel position    | energy            |
//! | [`CellDivision`] | -                 | -                 |
//! | [`Evolution`]    | -                 | energy            |
//! | [`EnergyCubes`]  | energy            | pixel position    |
//!
//! Each owns a `*State` snapshot type so callers (and tests) can compare
//! state across frames.

mod division;
mod energy;
mod evolution;
mod motion;

pub use division::{CellDivision, DivisionConfig, DivisionState, GrowthLaw};
pub use energy::{Cube, EnergyConfig, EnergyCubes, EnergyState};
pub use evolution::{Evolution, EvolutionConfig, EvolutionStage, EvolutionState};
pub use motion::{MotionConfig, MotionState, PixelMotion};

use cpixel_core::Point;

use crate::frame_loop::FrameLoop;
use crate::shared::{Reader, channel};

/// Default id of the pixel element.
pub const PIXEL_ELEMENT: &str = "conscious-pixel";
/// Default id of the energy cube layer.
pub const CUBE_ELEMENT: &str = "energy-cubes";

/// Rectangular stage the pixel and cubes live in, origin at top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Stage width in px.
    pub width: f32,
    /// Stage height in px.
    pub height: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

impl Bounds {
    /// Create bounds.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Stage center.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// Wrap `p` toroidally into the stage.
    #[must_use]
    pub fn wrap(&self, p: Point) -> Point {
        Point::new(wrap_axis(p.x, self.width), wrap_axis(p.y, self.height))
    }
}

fn wrap_axis(v: f32, extent: f32) -> f32 {
    let extent = extent.max(1.0);
    let w = v.rem_euclid(extent);
    // rem_euclid can round up to `extent` for tiny negative inputs.
    if w >= extent { 0.0 } else { w }
}

/// Configuration of the full producer set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PixelSettings {
    /// Motion and physiology.
    pub motion: MotionConfig,
    /// Cell division.
    pub division: DivisionConfig,
    /// Leveling.
    pub evolution: EvolutionConfig,
    /// Energy cubes.
    pub energy: EnergyConfig,
}

impl PixelSettings {
    /// Use `bounds` for both the pixel and the cubes (builder).
    #[must_use]
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.motion.bounds = bounds;
        self.energy.bounds = bounds;
        self
    }
}

/// Read handles onto the shared cells of an installed producer set.
#[derive(Debug, Clone)]
pub struct PixelReaders {
    /// Pixel energy, `[0, 1]`.
    pub energy: Reader<f32>,
    /// Pixel center.
    pub position: Reader<Point>,
}

/// Wire the four producers together and register them in motion, division,
/// evolution, energy order.
pub fn install(frame_loop: &mut FrameLoop, settings: PixelSettings) -> PixelReaders {
    let (energy_tx, energy_rx) = channel(settings.energy.initial_energy.clamp(0.0, 1.0));
    let (position_tx, position_rx) = channel(settings.motion.bounds.center());

    let cubes = EnergyCubes::new(settings.energy, energy_tx, position_rx.clone());
    frame_loop.register(
        PixelMotion::new(settings.motion, energy_rx.clone()).publishing_position(position_tx),
    );
    frame_loop.register(CellDivision::new(settings.division));
    frame_loop.register(Evolution::new(settings.evolution, energy_rx.clone()));
    frame_loop.register(cubes);

    PixelReaders {
        energy: energy_rx,
        position: position_rx,
    }
}
