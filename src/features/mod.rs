//! Feature preprocessing shared by training and serving.
//!
//! - schema checks and row filtering (`validator`)
//! - scalar fill for numeric columns (`imputer`)
//! - one-hot expansion for categorical columns (`encoder`)
//! - the composed fit/apply contract (`pipeline`)

pub mod encoder;
pub mod imputer;
pub mod pipeline;
pub mod validator;

pub use encoder::{FittedEncoder, Vocabulary};
pub use imputer::{ColumnFill, FittedImputer, ImputeStrategy};
pub use pipeline::{FeaturePipeline, FittedPipeline, Transformed};
pub use validator::{Mode, ValidationReport, validate};
