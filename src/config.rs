//! Pipeline configuration.

use crate::models::{Language, PersonalizationLevel};

/// How structured findings are produced from the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Offline table-driven parsing. Fully reproducible, no external calls.
    Deterministic,
    /// Model-assisted extraction through the configured capability.
    Assisted,
}

/// Run defaults and resource limits for the interpreter.
///
/// The evidence index handle is constructed explicitly by the embedding
/// application and injected at interpreter construction; this struct only
/// carries plain values.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Default presentation level for new reports.
    pub level: PersonalizationLevel,
    /// Default output language for new reports.
    pub language: Language,
    /// Evidence items kept after merging across findings.
    pub retrieval_top_k: usize,
    pub extraction: ExtractionStrategy,
    /// Timeout applied to every external capability call.
    pub request_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            level: PersonalizationLevel::Standard,
            language: Language::En,
            retrieval_top_k: 5,
            extraction: ExtractionStrategy::Deterministic,
            request_timeout_secs: 60,
        }
    }
}
