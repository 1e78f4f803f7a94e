#![forbid(unsafe_code)]

//! Energy cubes.
//!
//! A handful of cubes drift and spin across the stage, wrapping at the edges.
//! The pixel's energy decays every executed frame; a cube that comes within
//! the absorb radius of the pixel is eaten, tops the energy up, and respawns
//! somewhere else. Respawn positions come from a seeded xorshift64 generator,
//! so runs are reproducible.

use std::time::Duration;

use cpixel_core::Point;

use super::{Bounds, CUBE_ELEMENT};
use crate::producer::{
    DEFAULT_RETRY_DELAY, DeltaClock, FrameContext, Producer, Rearm, element_liveness, gate_frame,
};
use crate::shared::{Publisher, Reader};

/// Cube field tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyConfig {
    /// Host element holding the cubes.
    pub element: String,
    /// Stage the cubes wrap around.
    pub bounds: Bounds,
    /// Number of cubes.
    pub cube_count: usize,
    /// Maximum drift per nominal frame along each axis, in px.
    pub drift_speed: f32,
    /// Spin in degrees per second.
    pub spin_speed: f32,
    /// Energy lost per nominal frame.
    pub decay_per_frame: f32,
    /// Absorption distance from the pixel center.
    pub absorb_radius: f32,
    /// Energy gained per absorbed cube.
    pub absorb_gain: f32,
    /// Starting energy.
    pub initial_energy: f32,
    /// Generator seed.
    pub seed: u64,
    /// Delay before re-checking a missing element.
    pub retry_delay: Duration,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            element: CUBE_ELEMENT.to_owned(),
            bounds: Bounds::default(),
            cube_count: 6,
            drift_speed: 0.6,
            spin_speed: 45.0,
            decay_per_frame: 0.001,
            absorb_radius: 24.0,
            absorb_gain: 0.2,
            initial_energy: 0.5,
            seed: 0x00C0_FFEE,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// One cube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cube {
    /// Center.
    pub position: Point,
    /// Drift per nominal frame.
    pub velocity: Point,
    /// Rotation in degrees, `[0, 360)`.
    pub rotation: f32,
}

/// Snapshot of the cube field.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyState {
    /// Pixel energy, `[0, 1]`.
    pub energy: f32,
    /// Cubes.
    pub cubes: Vec<Cube>,
    /// Cubes absorbed so far.
    pub absorbed: u32,
}

/// Deterministic xorshift64 generator.
#[derive(Debug, Clone, Copy)]
struct Xorshift64(u64);

impl Xorshift64 {
    fn new(seed: u64) -> Self {
        // Zero is a fixed point of xorshift.
        Self(seed.wrapping_add(0x9E37_79B9_7F4A_7C15) | 1)
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform in `[-1, 1)`.
    fn signed(&mut self) -> f32 {
        self.unit() * 2.0 - 1.0
    }
}

/// Drives the cubes and owns the pixel's energy.
#[derive(Debug)]
pub struct EnergyCubes {
    config: EnergyConfig,
    clock: DeltaClock,
    rng: Xorshift64,
    cubes: Vec<Cube>,
    energy: Publisher<f32>,
    pixel: Reader<Point>,
    absorbed: u32,
}

impl EnergyCubes {
    /// Spawn the cubes and publish the initial energy.
    #[must_use]
    pub fn new(config: EnergyConfig, energy: Publisher<f32>, pixel: Reader<Point>) -> Self {
        let mut rng = Xorshift64::new(config.seed);
        let cubes = (0..config.cube_count)
            .map(|_| spawn(&mut rng, &config))
            .collect();
        energy.publish(config.initial_energy.clamp(0.0, 1.0));
        Self {
            config,
            clock: DeltaClock::new(),
            rng,
            cubes,
            energy,
            pixel,
            absorbed: 0,
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> EnergyState {
        EnergyState {
            energy: self.energy.get(),
            cubes: self.cubes.clone(),
            absorbed: self.absorbed,
        }
    }
}

fn spawn(rng: &mut Xorshift64, config: &EnergyConfig) -> Cube {
    Cube {
        position: Point::new(
            rng.unit() * config.bounds.width,
            rng.unit() * config.bounds.height,
        ),
        velocity: Point::new(
            rng.signed() * config.drift_speed,
            rng.signed() * config.drift_speed,
        ),
        rotation: rng.unit() * 360.0,
    }
}

impl Producer for EnergyCubes {
    fn id(&self) -> &'static str {
        "energy-cubes"
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
        let spin = self.config.spin_speed * delta.step().as_secs_f32();
        let pixel = self.pixel.get();
        let mut energy = self.energy.get() - self.config.decay_per_frame * delta.scale;

        for i in 0..self.cubes.len() {
            let cube = &mut self.cubes[i];
            cube.position = self.config.bounds.wrap(Point::new(
                cube.position.x + cube.velocity.x * delta.scale,
                cube.position.y + cube.velocity.y * delta.scale,
            ));
            cube.rotation = (cube.rotation + spin).rem_euclid(360.0);

            if cube.position.distance(pixel) <= self.config.absorb_radius {
                energy += self.config.absorb_gain;
                self.absorbed += 1;
                tracing::debug!(
                    target: "cpixel.producer",
                    producer = "energy-cubes",
                    cube = i,
                    absorbed = self.absorbed,
                    "cube absorbed"
                );
                self.cubes[i] = spawn(&mut self.rng, &self.config);
            }
        }

        self.energy.publish(energy.clamp(0.0, 1.0));
        Rearm::NextFrame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::channel;
    use cpixel_core::{FrameGate, GateConfig, InspectionDetector, LayoutBox, Modifiers, ScriptedHost};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn frame(cubes: &mut EnergyCubes, gate: &mut FrameGate, host: &ScriptedHost, now: Duration) {
        let mut ctx = FrameContext {
            now,
            gate,
            host,
            modifiers: Modifiers::NONE,
        };
        cubes.on_frame(&mut ctx);
    }

    fn setup() -> (FrameGate, ScriptedHost) {
        (
            FrameGate::new(GateConfig::default(), InspectionDetector::empty()),
            ScriptedHost::new().with_element(CUBE_ELEMENT, LayoutBox::default()),
        )
    }

    #[test]
    fn rng_is_deterministic_and_in_range() {
        let mut a = Xorshift64::new(7);
        let mut b = Xorshift64::new(7);
        for _ in 0..1000 {
            let x = a.unit();
            assert_eq!(x, b.unit());
            assert!((0.0..1.0).contains(&x));
        }
        let mut zero = Xorshift64::new(0);
        assert_ne!(zero.next_u64(), 0);
    }

    #[test]
    fn energy_decays_without_cubes() {
        let (mut gate, host) = setup();
        let (tx, rx) = channel(0.0);
        let config = EnergyConfig {
            cube_count: 0,
            ..EnergyConfig::default()
        };
        let mut cubes = EnergyCubes::new(config, tx, Reader::constant(Point::default()));
        assert_eq!(rx.get(), 0.5);
        for i in 0..100 {
            frame(&mut cubes, &mut gate, &host, ms(i * 16));
        }
        assert!(rx.get() < 0.5);
        assert!(rx.get() > 0.35);
    }

    #[test]
    fn nearby_cube_is_absorbed_and_energy_clamped() {
        let (mut gate, host) = setup();
        let (tx, rx) = channel(0.0);
        let config = EnergyConfig {
            cube_count: 6,
            absorb_radius: 10_000.0,
            initial_energy: 0.95,
            ..EnergyConfig::default()
        };
        let mut cubes = EnergyCubes::new(config, tx, Reader::constant(Point::default()));
        let before = cubes.state().cubes;
        frame(&mut cubes, &mut gate, &host, ms(0));
        let state = cubes.state();
        assert_eq!(state.absorbed, 6);
        assert_eq!(rx.get(), 1.0);
        assert_ne!(state.cubes, before, "absorbed cubes respawn");
    }

    #[test]
    fn cubes_stay_on_stage() {
        let (mut gate, host) = setup();
        let (tx, _rx) = channel(0.0);
        let config = EnergyConfig {
            bounds: Bounds::new(50.0, 50.0),
            drift_speed: 7.0,
            absorb_radius: 0.0,
            ..EnergyConfig::default()
        };
        let mut cubes = EnergyCubes::new(config, tx, Reader::constant(Point::new(-1e6, -1e6)));
        for i in 0..300 {
            frame(&mut cubes, &mut gate, &host, ms(i * 16));
        }
        for cube in cubes.state().cubes {
            assert!((0.0..50.0).contains(&cube.position.x));
            assert!((0.0..50.0).contains(&cube.position.y));
            assert!((0.0..360.0).contains(&cube.rotation));
        }
    }
}
