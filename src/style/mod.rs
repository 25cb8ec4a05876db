//! The style-adaptation engine's data side: the Style Profile record, the
//! fixed lexicons behind its features, and the LSM scorer/smoother.

pub mod lexicons;
pub mod lsm;
pub mod profile;

pub use profile::{MetaRequest, PronounProfile, StyleProfile};
