//! Deterministic interpretation pipeline for medical documents.
//!
//! A document goes through a strictly ordered sequence of stages:
//! transcription, classification, structured extraction, evidence retrieval,
//! narrative generation, safety guardrails, personalization, confidence
//! aggregation, and certainty tagging. Every stage commits its output to the
//! store before the next begins, and a failed run always lands in a
//! reprocessable state.
//!
//! External services (transcription, classification, assisted extraction,
//! narrative generation) sit behind the traits in [`capabilities`]; the rest
//! of the pipeline is deterministic and fully offline.

pub mod analysis;
pub mod capabilities;
pub mod config;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod store;

pub use config::{ExtractionStrategy, PipelineConfig};
pub use pipeline::orchestrator::{Interpreter, RunOutcome};
pub use pipeline::retrieval::{EvidenceSearch, KeywordSearch, SemanticIndex};
pub use pipeline::PipelineError;
