#![forbid(unsafe_code)]

//! Pixel motion and physiology.
//!
//! The pixel travels in a straight line at a speed set by its energy,
//! bounces off the stage edges, bends its heading toward the pointer when
//! the pointer is close, and cycles its hue. A heartbeat and a slow breath
//! modulate its size.
//!
//! This is also the producer that feeds the gate's frame window: each
//! executed, non-fresh frame records its duration. Detection is left to the
//! frame loop, which polls it once before any producer runs.

use std::time::Duration;

use cpixel_core::{Breath, Heartbeat, Point, Tween};

use super::{Bounds, PIXEL_ELEMENT};
use crate::producer::{
    DEFAULT_RETRY_DELAY, DeltaClock, FrameContext, Producer, Rearm, element_liveness, gate_frame,
};
use crate::shared::{Publisher, Reader};

/// Motion tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionConfig {
    /// Host element to animate.
    pub element: String,
    /// Stage the pixel bounces in.
    pub bounds: Bounds,
    /// Pixel edge length in px.
    pub size: f32,
    /// Travel per nominal frame at energy 0.5, in px.
    pub base_speed: f32,
    /// Pointer distance below which the heading bends toward it.
    pub attraction_radius: f32,
    /// Heading blend toward the pointer per nominal frame, `[0, 1]`.
    pub attraction_strength: f32,
    /// Hue rotation in degrees per second.
    pub hue_speed: f32,
    /// Resting heart rate.
    pub heart_bpm: f32,
    /// One breath cycle.
    pub breath_period: Duration,
    /// Breath scale amplitude.
    pub breath_depth: f32,
    /// Delay before re-checking a missing element.
    pub retry_delay: Duration,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            element: PIXEL_ELEMENT.to_owned(),
            bounds: Bounds::default(),
            size: 8.0,
            base_speed: 2.0,
            attraction_radius: 150.0,
            attraction_strength: 0.08,
            hue_speed: 30.0,
            heart_bpm: 72.0,
            breath_period: Duration::from_secs(4),
            breath_depth: 0.08,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Snapshot of the pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionState {
    /// Top-left corner.
    pub position: Point,
    /// Unit heading.
    pub heading: Point,
    /// Hue in degrees, `[0, 360)`.
    pub hue: f32,
    /// Heartbeat amplitude, `[0, 1]`.
    pub pulse: f32,
    /// Breath size multiplier.
    pub scale: f32,
    /// Executed frames.
    pub frames: u64,
}

/// Moves the pixel. See the module docs.
#[derive(Debug)]
pub struct PixelMotion {
    config: MotionConfig,
    clock: DeltaClock,
    position: Point,
    heading: Point,
    hue: f32,
    heart: Heartbeat,
    breath: Breath,
    frames: u64,
    energy: Reader<f32>,
    position_out: Option<Publisher<Point>>,
}

impl PixelMotion {
    /// Start at the stage center heading down-right.
    #[must_use]
    pub fn new(config: MotionConfig, energy: Reader<f32>) -> Self {
        let center = config.bounds.center();
        let start = Point::new(center.x - config.size / 2.0, center.y - config.size / 2.0);
        let diagonal = std::f32::consts::FRAC_1_SQRT_2;
        Self {
            heart: Heartbeat::new(config.heart_bpm),
            breath: Breath::new(config.breath_period, config.breath_depth),
            config,
            clock: DeltaClock::new(),
            position: start,
            heading: Point::new(diagonal, diagonal),
            hue: 0.0,
            frames: 0,
            energy,
            position_out: None,
        }
    }

    /// Publish the pixel center into `out` every executed frame (builder).
    #[must_use]
    pub fn publishing_position(mut self, out: Publisher<Point>) -> Self {
        out.publish(self.center());
        self.position_out = Some(out);
        self
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> MotionState {
        MotionState {
            position: self.position,
            heading: self.heading,
            hue: self.hue,
            pulse: self.heart.sample(),
            scale: self.breath.scale(),
            frames: self.frames,
        }
    }

    /// Pixel center.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(
            self.position.x + self.config.size / 2.0,
            self.position.y + self.config.size / 2.0,
        )
    }

    fn steer_toward(&mut self, target: Point, scale: f32) {
        let center = self.center();
        let distance = center.distance(target);
        if distance <= f32::EPSILON || distance > self.config.attraction_radius {
            return;
        }
        let blend = (self.config.attraction_strength * scale).clamp(0.0, 1.0);
        let toward = Point::new((target.x - center.x) / distance, (target.y - center.y) / distance);
        let mixed = Point::new(
            self.heading.x + (toward.x - self.heading.x) * blend,
            self.heading.y + (toward.y - self.heading.y) * blend,
        );
        let len = mixed.distance(Point::default());
        if len > f32::EPSILON {
            self.heading = Point::new(mixed.x / len, mixed.y / len);
        }
    }

    fn bounce(&mut self) {
        let max_x = (self.config.bounds.width - self.config.size).max(0.0);
        let max_y = (self.config.bounds.height - self.config.size).max(0.0);
        let (x, hx) = reflect(self.position.x, self.heading.x, max_x);
        let (y, hy) = reflect(self.position.y, self.heading.y, max_y);
        self.position = Point::new(x, y);
        self.heading = Point::new(hx, hy);
    }
}

/// Reflect a coordinate off `[0, max]`, flipping the heading component.
fn reflect(pos: f32, heading: f32, max: f32) -> (f32, f32) {
    if pos < 0.0 {
        ((-pos).min(max), heading.abs())
    } else if pos > max {
        ((2.0 * max - pos).max(0.0), -heading.abs())
    } else {
        (pos, heading)
    }
}

impl Producer for PixelMotion {
    fn id(&self) -> &'static str {
        "pixel-motion"
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
        let step = delta.step();
        let energy = self.energy.get().clamp(0.0, 1.0);

        if let Some(pointer) = ctx.host.pointer() {
            self.steer_toward(pointer, delta.scale);
        }
        let distance = self.config.base_speed * (0.5 + energy) * delta.scale;
        self.position = Point::new(
            self.position.x + self.heading.x * distance,
            self.position.y + self.heading.y * distance,
        );
        self.bounce();

        self.hue = (self.hue + self.config.hue_speed * step.as_secs_f32()).rem_euclid(360.0);
        self.heart.set_bpm(self.config.heart_bpm * (1.0 + 0.5 * energy));
        self.heart.advance(step);
        self.breath.advance(step);
        self.frames += 1;

        if let Some(out) = &self.position_out {
            out.publish(self.center());
        }

        if !delta.fresh {
            ctx.gate.record_frame_time(delta.elapsed);
        }
        Rearm::NextFrame
    }
}
