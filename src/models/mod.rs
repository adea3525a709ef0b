//! Regression estimators.
//!
//! - bootstrap-aggregated regression trees (`forest`)
//! - ordinary least squares (`linear`)
//! - the persisted, kind-tagged estimator (`model`)

pub mod forest;
pub mod linear;
pub mod model;

pub use forest::{ForestParams, RandomForest, RegressionTree};
pub use linear::LinearModel;
pub use model::*;
