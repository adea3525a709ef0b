//! Data sources.

pub mod sample;

pub use sample::{SAMPLE_COLUMNS, SampleConfig, generate_sample};
