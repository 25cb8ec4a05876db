//! Chat pipeline: generation backend client, reply post-processing, and
//! the HTTP handlers that orchestrate a turn.

pub mod generation;
pub mod handler;
pub mod postprocess;

pub use handler::AppState;
