#![forbid(unsafe_code)]

//! Real-time loop driver.
//!
//! [`FrameTicker`] stands in for the browser's animation-frame callback on
//! native targets: it reads a [`SystemClock`], runs a frame, then sleeps
//! until the next frame deadline. Deadlines are fixed multiples of the target
//! interval from the start, so a slow frame does not shift later frames; if
//! the loop falls more than one interval behind, it skips ahead instead of
//! bursting.

use std::time::Duration;

use cpixel_core::{FrameClock, HostEnvironment, SystemClock};

use crate::frame_loop::FrameLoop;

/// Sleep-paced frame driver.
#[derive(Debug, Clone)]
pub struct FrameTicker {
    clock: SystemClock,
    interval: Duration,
}

impl FrameTicker {
    /// Tick at `fps` frames per second (clamped to 1..=240).
    #[must_use]
    pub fn new(fps: u32) -> Self {
        let fps = fps.clamp(1, 240);
        Self {
            clock: SystemClock::new(),
            interval: Duration::from_secs(1) / fps,
        }
    }

    /// Target frame interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time since the ticker was created.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Run frames until `duration` has elapsed or the loop stops.
    ///
    /// `between` runs before each frame with the loop, the host and the frame
    /// time; callers dispatch host events and mutate the host there.
    /// Returns the number of frames run.
    pub fn run<H, F>(
        &self,
        frame_loop: &mut FrameLoop,
        host: &mut H,
        duration: Duration,
        mut between: F,
    ) -> u64
    where
        H: HostEnvironment,
        F: FnMut(&mut FrameLoop, &mut H, Duration),
    {
        let start = self.clock.now();
        let end = start.saturating_add(duration);
        let mut deadline = start;
        let mut frames = 0;

        while frame_loop.is_running() {
            let now = self.clock.now();
            if now >= end {
                break;
            }
            between(frame_loop, host, now);
            frame_loop.frame(now, &*host);
            frames += 1;

            deadline += self.interval;
            let after = self.clock.now();
            if after > deadline + self.interval {
                let behind = after - deadline;
                tracing::trace!(target: "cpixel.loop", behind_ms = behind.as_millis() as u64, "frame loop behind; skipping ahead");
                deadline = after;
            } else if deadline > after {
                std::thread::sleep(deadline - after);
            }
        }

        tracing::debug!(target: "cpixel.loop", frames, elapsed_ms = (self.clock.now() - start).as_millis() as u64, "ticker finished");
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpixel_core::{
        FrameGate, GateConfig, InspectionDetector, KeyboardOverrideHandler, ScriptedHost,
    };

    use crate::producer::{FrameContext, Producer, Rearm};

    struct Once;

    impl Producer for Once {
        fn id(&self) -> &'static str {
            "once"
        }

        fn on_frame(&mut self, _ctx: &mut FrameContext<'_>) -> Rearm {
            Rearm::Stop
        }
    }

    #[test]
    fn interval_from_fps() {
        assert_eq!(FrameTicker::new(50).interval(), Duration::from_millis(20));
        assert_eq!(FrameTicker::new(0).interval(), Duration::from_secs(1));
    }

    #[test]
    fn stops_when_loop_has_no_live_producers() {
        let mut frame_loop = FrameLoop::new(
            FrameGate::new(GateConfig::default(), InspectionDetector::empty()),
            KeyboardOverrideHandler::default(),
        )
        .with_producer(Once);
        let mut host = ScriptedHost::new();
        let ticker = FrameTicker::new(240);
        let frames = ticker.run(&mut frame_loop, &mut host, Duration::from_secs(5), |_, _, _| {});
        assert_eq!(frames, 1);
    }
}
