//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - tabular values and datasets (`Value`, `Dataset`)
//! - the model-facing feature matrix (`FeatureMatrix`)
//! - named column roles (`ColumnRoles`)

pub mod roles;
pub mod types;

pub use roles::*;
pub use types::*;
