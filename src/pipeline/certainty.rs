//! Section-level certainty tagging.
//!
//! Pure annotation over the explanation sections: each section gets a
//! composite certainty score and a label, and no other field is touched.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{CertaintyLevel, ConfidenceReport, ExplanationSection, Severity};

const WEIGHT_SEVERITY: f32 = 0.15;
const WEIGHT_FINDINGS: f32 = 0.25;
const WEIGHT_CITATION: f32 = 0.25;
const WEIGHT_HEDGE: f32 = 0.15;
const WEIGHT_RETRIEVAL: f32 = 0.20;

/// Inclusive threshold for the "established" label.
const ESTABLISHED_THRESHOLD: f32 = 0.60;

const HEDGING_WORDS: &[&str] = &[
    "may", "could", "might", "suggest", "possibly", "potentially", "likely",
];

static CITATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]").expect("static pattern"));

/// Tags every section in place with its certainty level.
pub fn tag_sections(sections: &mut [ExplanationSection], confidence: &ConfidenceReport) {
    for section in sections.iter_mut() {
        let composite = composite_score(section, confidence);
        section.certainty_level = Some(label_for(composite));
    }
}

pub(crate) fn label_for(composite: f32) -> CertaintyLevel {
    if composite >= ESTABLISHED_THRESHOLD {
        CertaintyLevel::Established
    } else {
        CertaintyLevel::Inferred
    }
}

pub(crate) fn composite_score(
    section: &ExplanationSection,
    confidence: &ConfidenceReport,
) -> f32 {
    let severity_score = if section.severity == Severity::Normal {
        1.0
    } else {
        0.5
    };

    let finding_scores: Vec<f32> = section
        .findings_covered
        .iter()
        .filter_map(|name| confidence.per_finding.get(name).copied())
        .collect();
    let finding_score = if finding_scores.is_empty() {
        0.5
    } else {
        finding_scores.iter().sum::<f32>() / finding_scores.len() as f32
    };

    let citation_score = if CITATION_MARKER.is_match(&section.content) {
        0.8
    } else {
        0.3
    };

    let hedge_score = (1.0 - 0.15 * hedge_count(&section.content) as f32).max(0.2);

    WEIGHT_SEVERITY * severity_score
        + WEIGHT_FINDINGS * finding_score
        + WEIGHT_CITATION * citation_score
        + WEIGHT_HEDGE * hedge_score
        + WEIGHT_RETRIEVAL * confidence.stages.retrieval
}

/// Distinct hedging words present in the content. A word repeated many
/// times still contributes once; the penalty tracks vocabulary, not volume.
fn hedge_count(content: &str) -> usize {
    let lower = content.to_lowercase();
    HEDGING_WORDS
        .iter()
        .filter(|hedge| lower.contains(*hedge))
        .count()
}
