#![forbid(unsafe_code)]

//! Headless conscious-pixel demo.
//!
//! Builds a scripted page, wires the four producers into a frame loop and
//! runs it either in real time or on a simulated clock, injecting operator
//! and visibility events at the times given on the command line.

pub mod cli;
pub mod script;
