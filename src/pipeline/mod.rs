//! The document interpretation pipeline.
//!
//! Stages run strictly in order: transcription, classification, extraction,
//! evidence retrieval, narrative generation, guardrails, personalization,
//! confidence aggregation, certainty tagging. Each stage commits its output
//! before the next begins.

pub mod certainty;
pub mod confidence;
pub mod extraction;
pub mod guardrail;
pub mod narrative;
pub mod orchestrator;
pub mod personalize;
pub mod retrieval;

use thiserror::Error;
use uuid::Uuid;

use crate::capabilities::CapabilityError;
use crate::store::StoreError;

/// Failure taxonomy for a pipeline run.
///
/// Preflight variants reject the request before any state is mutated.
/// `Transcription` and `FatalExtraction` mark the run errored; every other
/// stage degrades with a deterministic fallback and keeps the run alive.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("report {0} not found")]
    ReportNotFound(Uuid),

    #[error("report {id} has status '{status}', which cannot start a run")]
    WrongStatus { id: Uuid, status: String },

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("transcription failed: {0}")]
    Transcription(#[source] CapabilityError),

    #[error("no usable records extracted from {document_type} document")]
    FatalExtraction { document_type: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// True for rejections that happen before any state is mutated; the
    /// document record is untouched and no error status is written.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            PipelineError::ReportNotFound(_)
                | PipelineError::WrongStatus { .. }
                | PipelineError::UnsupportedFormat(_)
        )
    }
}
