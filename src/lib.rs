//! `wh-capacity` library crate.
//!
//! The binary (`whcap`) is a thin wrapper around this library so that:
//!
//! - the training job and the inference service share one feature pipeline
//! - core logic is testable without spawning processes
//! - a host server can embed `serve::InferenceService` directly

pub mod app;
pub mod artifact;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod io;
pub mod math;
pub mod models;
pub mod serve;
pub mod training;

#[cfg(test)]
mod testutil;
