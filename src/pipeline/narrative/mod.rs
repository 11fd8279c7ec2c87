//! Structured explanation generation.

pub mod generator;
pub mod prompt;

pub use generator::{fallback_explanation, NarrativeGenerator, NarrativeInput};
