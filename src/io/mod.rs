//! Input/output helpers.
//!
//! - CSV ingest into typed datasets (`ingest`)
//! - JSON request payloads into datasets (`request`)
//! - training run report export (`export`)

pub mod export;
pub mod ingest;
pub mod request;

pub use export::*;
pub use ingest::*;
pub use request::*;
