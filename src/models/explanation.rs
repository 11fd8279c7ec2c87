use serde::{Deserialize, Serialize};

use super::enums::{
    CertaintyLevel, FlagSeverity, PersonalizationLevel, Severity, SourceKind,
};

/// A retrieved reference snippet supporting an explanation claim.
/// Ephemeral per run: embedded into citations, never persisted standalone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub content: String,
    pub source: String,
    pub category: String,
    /// Relevance in [0,1].
    pub relevance: f32,
}

/// A numbered citation bound into the narrative ("[N]" markers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub id: u32,
    pub source: String,
    pub text: String,
}

/// Traces one key claim of a section back to its source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMapping {
    pub sentence: String,
    pub source_type: SourceKind,
    /// Test name, citation id, or "original document".
    pub source_ref: String,
}

/// One titled block of the narrative.
///
/// `severity` and `certainty_level` are each assigned exactly once per run:
/// severity by the generator (or its deterministic fallback), certainty by
/// the certainty tagger after confidence aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationSection {
    pub title: String,
    pub content: String,
    pub findings_covered: Vec<String>,
    pub severity: Severity,
    #[serde(default)]
    pub source_mapping: Vec<SourceMapping>,
    /// None until the certainty tagger has run.
    #[serde(default)]
    pub certainty_level: Option<CertaintyLevel>,
}

/// An annotation marking disallowed language in the narrative.
/// Pure annotation; the flagged content is never rewritten or removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailFlag {
    pub severity: FlagSeverity,
    /// The pattern or term that matched.
    pub pattern: String,
    /// Surrounding text for audit context.
    pub context: String,
}

/// Raw generator output, before personalization.
///
/// This type is deliberately distinct from `PresentedExplanation`: the only
/// way to obtain the presented form is `pipeline::personalize::personalize`,
/// which consumes this value, so prefixes and closings cannot stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedExplanation {
    pub summary: String,
    pub sections: Vec<ExplanationSection>,
    pub citations: Vec<Citation>,
    pub recommended_actions: Vec<String>,
    pub disclaimer: String,
    /// Which model produced this, or None for the deterministic fallback.
    pub model: Option<String>,
}

/// The personalized, display-ready explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentedExplanation {
    /// Summary wrapped with the level's prefix and closing.
    pub summary: String,
    pub sections: Vec<ExplanationSection>,
    pub citations: Vec<Citation>,
    pub recommended_actions: Vec<String>,
    pub disclaimer: String,
    pub level: PersonalizationLevel,
    pub tone: String,
    pub model: Option<String>,
}
