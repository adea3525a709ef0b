//! Model training: reproducible split, fit, held-out evaluation.

pub mod split;
pub mod trainer;

pub use split::{Split, train_test_split};
pub use trainer::{TrainMetrics, TrainOutcome, TrainerConfig, train};
