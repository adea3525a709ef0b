//! Artifact bundle and its on-disk store.

pub mod bundle;
pub mod store;

pub use bundle::{ArtifactBundle, FORMAT_VERSION};
pub use store::{load, save};
