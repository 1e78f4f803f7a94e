#![forbid(unsafe_code)]

//! Cell division.
//!
//! # Algorithm
//!
//! Real elapsed time is summed over executed frames only. When the sum
//! reaches the division interval, one division happens and the sum restarts
//! at zero, so a window produces at most one division regardless of frame
//! rate. Fresh frames (first frame, first frame after a suppression) add
//! nothing: a pause never counts toward the next division.
//!
//! The number of new cells per division follows [`GrowthLaw`], capped by
//! `max_population`. New cells grow in with an ease-out curve.

use std::time::Duration;

use cpixel_core::{GrowIn, Tween};

use super::PIXEL_ELEMENT;
use crate::producer::{
    DEFAULT_RETRY_DELAY, DeltaClock, FrameContext, Producer, Rearm, element_liveness, gate_frame,
};

/// How many cells a division adds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrowthLaw {
    /// Every cell divides: population doubles.
    #[default]
    Doubling,
    /// A fixed number of cells is added.
    Fixed(u32),
}

impl GrowthLaw {
    /// New cells for a division of `population`, before capping.
    #[must_use]
    pub fn added(self, population: u32) -> u32 {
        match self {
            GrowthLaw::Doubling => population,
            GrowthLaw::Fixed(n) => n,
        }
    }
}

/// Division tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct DivisionConfig {
    /// Host element hosting the colony.
    pub element: String,
    /// Executed time between divisions.
    pub interval: Duration,
    /// Cells added per division.
    pub growth: GrowthLaw,
    /// Population ceiling.
    pub max_population: u32,
    /// Grow-in duration of a new cell.
    pub grow_in: Duration,
    /// Delay before re-checking a missing element.
    pub retry_delay: Duration,
}

impl Default for DivisionConfig {
    fn default() -> Self {
        Self {
            element: PIXEL_ELEMENT.to_owned(),
            interval: Duration::from_millis(10_000),
            growth: GrowthLaw::Doubling,
            max_population: 64,
            grow_in: Duration::from_millis(1_200),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Snapshot of the colony.
#[derive(Debug, Clone, PartialEq)]
pub struct DivisionState {
    /// Living cells.
    pub population: u32,
    /// Divisions performed.
    pub divisions: u32,
    /// Executed time since the last division.
    pub accumulated: Duration,
    /// Size of each cell in `[0, 1]`, oldest first.
    pub sizes: Vec<f32>,
}

/// Divides the pixel periodically.
#[derive(Debug)]
pub struct CellDivision {
    config: DivisionConfig,
    clock: DeltaClock,
    accumulated: Duration,
    divisions: u32,
    cells: Vec<GrowIn>,
    last_division_at: Option<Duration>,
}

impl CellDivision {
    /// A colony of one fully grown cell.
    #[must_use]
    pub fn new(config: DivisionConfig) -> Self {
        let mut founder = GrowIn::new(config.grow_in);
        founder.advance(config.grow_in);
        Self {
            config,
            clock: DeltaClock::new(),
            accumulated: Duration::ZERO,
            divisions: 0,
            cells: vec![founder],
            last_division_at: None,
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> DivisionState {
        DivisionState {
            population: self.population(),
            divisions: self.divisions,
            accumulated: self.accumulated,
            sizes: self.cells.iter().map(Tween::sample).collect(),
        }
    }

    /// Living cells.
    #[must_use]
    pub fn population(&self) -> u32 {
        self.cells.len() as u32
    }

    /// Frame timestamp of the most recent division.
    #[must_use]
    pub fn last_division_at(&self) -> Option<Duration> {
        self.last_division_at
    }

    fn divide(&mut self, now: Duration) {
        let population = self.population();
        let room = self.config.max_population.saturating_sub(population);
        let added = self.config.growth.added(population).min(room);
        self.cells
            .extend(std::iter::repeat_n(GrowIn::new(self.config.grow_in), added as usize));
        self.divisions += 1;
        self.last_division_at = Some(now);
        tracing::info!(
            target: "cpixel.producer",
            producer = self.id(),
            from = population,
            to = self.population(),
            capped = added < self.config.growth.added(population),
            "cell division"
        );
    }
}

impl Producer for CellDivision {
    fn id(&self) -> &'static str {
        "cell-division"
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
        for cell in &mut self.cells {
            cell.advance(delta.step());
        }

        self.accumulated += delta.elapsed;
        if self.accumulated >= self.config.interval {
            self.accumulated = Duration::ZERO;
            self.divide(ctx.now);
        }
        Rearm::NextFrame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpixel_core::{FrameGate, GateConfig, InspectionDetector, LayoutBox, Modifiers, ScriptedHost};
    use tracing_test::traced_test;

    fn step(division: &mut CellDivision, gate: &mut FrameGate, host: &ScriptedHost, now: Duration) {
        let mut ctx = FrameContext {
            now,
            gate,
            host,
            modifiers: Modifiers::NONE,
        };
        division.on_frame(&mut ctx);
    }

    fn setup() -> (FrameGate, ScriptedHost) {
        (
            FrameGate::new(GateConfig::default(), InspectionDetector::empty()),
            ScriptedHost::new().with_element(PIXEL_ELEMENT, LayoutBox::default()),
        )
    }

    #[test]
    fn growth_laws() {
        assert_eq!(GrowthLaw::Doubling.added(4), 4);
        assert_eq!(GrowthLaw::Fixed(3).added(4), 3);
    }

    #[test]
    fn one_division_per_window_even_with_long_frames() {
        let (mut gate, host) = setup();
        let mut division = CellDivision::new(DivisionConfig::default());
        step(&mut division, &mut gate, &host, Duration::ZERO);
        // A single 25 s frame still yields one division, not two.
        step(&mut division, &mut gate, &host, Duration::from_secs(25));
        assert_eq!(division.state().divisions, 1);
        assert_eq!(division.state().accumulated, Duration::ZERO);
    }

    #[traced_test]
    #[test]
    fn population_is_capped() {
        let (mut gate, host) = setup();
        let mut division = CellDivision::new(DivisionConfig {
            interval: Duration::from_millis(100),
            max_population: 5,
            ..DivisionConfig::default()
        });
        let mut now = Duration::ZERO;
        for _ in 0..100 {
            step(&mut division, &mut gate, &host, now);
            now += Duration::from_millis(50);
        }
        assert_eq!(division.population(), 5);
        assert!(logs_contain("cell division"));
        assert!(logs_contain("from=4 to=5 capped=true"));
    }

    #[test]
    fn new_cells_grow_in() {
        let (mut gate, host) = setup();
        let mut division = CellDivision::new(DivisionConfig {
            interval: Duration::from_millis(32),
            ..DivisionConfig::default()
        });
        step(&mut division, &mut gate, &host, Duration::ZERO);
        step(&mut division, &mut gate, &host, Duration::from_millis(16));
        step(&mut division, &mut gate, &host, Duration::from_millis(32));
        let state = division.state();
        assert_eq!(state.population, 2);
        assert_eq!(state.sizes[0], 1.0);
        assert_eq!(state.sizes[1], 0.0, "a new cell starts empty");

        step(&mut division, &mut gate, &host, Duration::from_millis(632));
        let size = division.state().sizes[1];
        assert!(size > 0.5 && size < 1.0, "ease-out midway: {size}");
    }
}
