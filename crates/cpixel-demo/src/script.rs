#![forbid(unsafe_code)]

//! Page setup, config layering and event scheduling for the demo run.
//!
//! # Config precedence
//!
//! CLI flags > `CPIXEL_*` environment > JSON file > defaults.

use std::time::Duration;

use cpixel_core::error::ConfigResult;
use cpixel_core::{
    CpixelConfig, FrameGate, GateMode, HostEnvironment, KeyChord, KeyEvent, LayoutBox, Point,
    ScriptedHost,
};
use cpixel_runtime::producers::{self, CUBE_ELEMENT, PIXEL_ELEMENT, PixelReaders};
use cpixel_runtime::{FrameLoop, FrameTicker, HostEvent, LoopSimulator, PixelSettings};

use crate::cli::Opts;

/// An event injected at a fixed time into the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
    /// Time from the start of the run.
    pub at: Duration,
    /// Event to dispatch.
    pub event: HostEvent,
}

/// End-of-run snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Frames the host delivered.
    pub frames: u64,
    /// Gate mode at the end.
    pub mode: GateMode,
    /// Whether the page ended visible.
    pub visible: bool,
    /// Final pixel energy.
    pub energy: f32,
    /// Final pixel center.
    pub position: Point,
    /// Most recent FPS report.
    pub last_fps: Option<f64>,
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "frames:   {}", self.frames)?;
        writeln!(f, "mode:     {}", self.mode.as_str())?;
        writeln!(f, "visible:  {}", self.visible)?;
        writeln!(f, "energy:   {:.3}", self.energy)?;
        writeln!(f, "position: ({:.1}, {:.1})", self.position.x, self.position.y)?;
        match self.last_fps {
            Some(fps) => write!(f, "fps:      {fps:.1}"),
            None => write!(f, "fps:      n/a"),
        }
    }
}

/// Layer the JSON file, `env` and CLI overrides onto the defaults.
pub fn load_config(opts: &Opts, env: impl Fn(&str) -> Option<String>) -> ConfigResult<CpixelConfig> {
    let mut config = match &opts.config {
        Some(path) => CpixelConfig::from_json_file(path)?,
        None => CpixelConfig::default(),
    };
    config.apply_env(env)?;
    if let Some(ms) = opts.inspect_interval_ms {
        config.gate.inspection_check_interval_ms = ms;
    }
    if opts.perf_probe {
        config.detector.performance_drop = true;
    }
    config.validate()?;
    Ok(config)
}

/// A page with the pixel centered on an 800x600 stage.
#[must_use]
pub fn page(inspect: bool) -> ScriptedHost {
    let url = if inspect {
        "http://localhost/pixel?inspect=true"
    } else {
        "http://localhost/pixel"
    };
    ScriptedHost::new()
        .with_url(url)
        .with_element(PIXEL_ELEMENT, LayoutBox::new(396.0, 296.0, 8.0, 8.0))
        .with_element(CUBE_ELEMENT, LayoutBox::new(0.0, 0.0, 800.0, 600.0))
}

/// Events requested on the command line, in time order.
#[must_use]
pub fn schedule(opts: &Opts, config: &CpixelConfig) -> Vec<Scheduled> {
    let chord = chord_press(config.keyboard.toggle_pause);
    let mut events: Vec<Scheduled> = [
        (opts.pause_after_ms, HostEvent::Key(chord)),
        (opts.resume_after_ms, HostEvent::Key(chord)),
        (opts.hide_after_ms, HostEvent::Visibility(false)),
        (opts.show_after_ms, HostEvent::Visibility(true)),
    ]
    .into_iter()
    .filter_map(|(at, event)| {
        at.map(|ms| Scheduled {
            at: Duration::from_millis(ms),
            event,
        })
    })
    .collect();
    events.sort_by_key(|s| s.at);
    events
}

fn chord_press(chord: KeyChord) -> KeyEvent {
    KeyEvent::press(chord.key).with_modifiers(chord.modifiers)
}

/// Build the loop and producer set for `config`.
#[must_use]
pub fn build(config: &CpixelConfig) -> (FrameLoop, PixelReaders) {
    let mut frame_loop = FrameLoop::from_config(config);
    let readers = producers::install(&mut frame_loop, PixelSettings::default());
    (frame_loop, readers)
}

/// Run on a simulated clock without sleeping.
///
/// Events due before a frame are dispatched just ahead of it. While the page
/// is hidden no frames run and the clock jumps to the next event.
pub fn run_simulated(
    frame_loop: FrameLoop,
    readers: &PixelReaders,
    host: ScriptedHost,
    events: &[Scheduled],
    fps: u32,
    duration: Duration,
) -> Report {
    let step = FrameTicker::new(fps).interval();
    let mut sim = LoopSimulator::new(frame_loop, host, step);
    let mut pending = events.iter().copied().peekable();
    let mut frames = 0;

    while sim.frame_loop().is_running() {
        if !sim.host().is_visible() {
            // Hidden pages get no frames; jump to the next event.
            match pending.next_if(|s| s.at <= duration) {
                Some(s) => {
                    sim.idle(s.at.saturating_sub(sim.now()));
                    sim.send(s.event);
                    continue;
                }
                None => break,
            }
        }

        let next_frame = if frames == 0 { sim.now() } else { sim.now() + step };
        if next_frame > duration {
            break;
        }
        let mut dispatched = false;
        while let Some(s) = pending.next_if(|s| s.at <= next_frame) {
            sim.send(s.event);
            dispatched = true;
        }
        if dispatched && !sim.host().is_visible() {
            continue;
        }
        sim.step();
        frames += 1;
    }

    report(frames, sim.frame_loop().gate(), sim.host(), readers)
}

/// Run against the wall clock, sleeping between frames.
///
/// Unlike a browser, the ticker keeps delivering frames while the page is
/// hidden; the gate still sees the visibility change.
pub fn run_realtime(
    mut frame_loop: FrameLoop,
    readers: &PixelReaders,
    mut host: ScriptedHost,
    events: &[Scheduled],
    fps: u32,
    duration: Duration,
) -> Report {
    let ticker = FrameTicker::new(fps);
    let mut next = 0;
    let frames = ticker.run(&mut frame_loop, &mut host, duration, |frame_loop, host, now| {
        while let Some(s) = events.get(next).filter(|s| s.at <= now) {
            if let HostEvent::Visibility(visible) = s.event {
                host.set_visible(visible);
            }
            frame_loop.dispatch(s.event, now);
            next += 1;
        }
    });
    report(frames, frame_loop.gate(), &host, readers)
}

fn report(frames: u64, gate: &FrameGate, host: &ScriptedHost, readers: &PixelReaders) -> Report {
    Report {
        frames,
        mode: gate.mode(),
        visible: host.is_visible(),
        energy: readers.energy.get(),
        position: readers.position.get(),
        last_fps: gate.last_fps(),
    }
}
