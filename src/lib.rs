//! # Kagami
//!
//! Backend for a controlled experiment comparing adaptive and static
//! conversational styles. The core is the style-adaptation engine: deriving
//! a quantitative style profile from raw text, measuring Linguistic Style
//! Matching between the two speakers with temporal smoothing, and compiling
//! the profile into condition-specific generation directives. Everything
//! else — HTTP surface, session persistence, event logging, the generation
//! backend — is plumbing around that pipeline.

pub mod chat;
pub mod config;
pub mod error;
pub mod events;
pub mod nlp;
pub mod prompt;
pub mod server;
pub mod session;
pub mod style;

pub use chat::AppState;
pub use nlp::NlpService;
pub use session::Session;
pub use style::StyleProfile;

/// Crate version exposed by the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
