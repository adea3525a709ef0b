//! Request/response inference over a loaded artifact bundle.

pub mod service;

pub use service::{Health, InferenceService, Response, Status};
