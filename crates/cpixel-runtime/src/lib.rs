#![forbid(unsafe_code)]

//! Runtime: the single-threaded frame loop and the producers it drives.
//!
//! # Key Components
//!
//! - [`Producer`] - per-frame work unit; returns a [`Rearm`] each invocation
//! - [`DeltaClock`] - frame delta that never jumps after a suppression
//! - [`FrameLoop`] - owns the gate, invokes producers in registration order
//! - [`LoopSimulator`] - deterministic driver for tests
//! - [`FrameTicker`] - real-time driver
//!
//! # Producers
//!
//! [`PixelMotion`], [`CellDivision`], [`Evolution`] and [`EnergyCubes`]
//! collaborate only through the single-writer cells in [`shared`].

pub mod frame_loop;
pub mod producer;
pub mod producers;
pub mod shared;
pub mod simulator;
pub mod ticker;

pub use frame_loop::{DispatchOutcome, FrameLoop, FrameSummary, HostEvent};
pub use producer::{
    DEFAULT_RETRY_DELAY, DeltaClock, FrameContext, FrameDelta, NOMINAL_FRAME, Producer, Rearm,
    gate_frame,
};
pub use producers::{
    Bounds, CellDivision, EnergyCubes, Evolution, EvolutionStage, GrowthLaw, PixelMotion,
    PixelReaders, PixelSettings,
};
pub use shared::{Publisher, Reader};
pub use simulator::{LoopSimulator, RunStats};
pub use ticker::FrameTicker;
