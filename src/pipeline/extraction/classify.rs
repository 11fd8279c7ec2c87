//! Document-type classification.
//!
//! One categorical decision per run, made before extraction; it gates which
//! extractor runs and is never re-derived from extraction results. Any
//! classifier failure defaults to `lab_report`.

use std::sync::LazyLock;

use regex::Regex;

use crate::capabilities::{CapabilityError, DocumentClassifier};
use crate::models::DocumentType;

/// Classify with the configured capability, defaulting to `lab_report`
/// on failure.
pub fn classify_document(classifier: &dyn DocumentClassifier, text: &str) -> DocumentType {
    match classifier.classify(text) {
        Ok(doc_type) => doc_type,
        Err(e) => {
            tracing::warn!(error = %e, "Classification failed, defaulting to lab_report");
            DocumentType::LabReport
        }
    }
}

/// Prescription markers: dosage units, tablet counts, "1-0-1" style
/// frequency codes, Rx conventions.
static PRESCRIPTION_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b\d+\s*(?:mg|mcg|ml|iu)\b|\b\d-\d-\d\b|\btab(?:let)?s?\b|\bcap(?:sule)?s?\b|\brx\b|\bonce\s+daily\b|\btwice\s+daily\b|\bafter\s+(?:meals|food)\b|\bbefore\s+(?:meals|food)\b",
    )
    .unwrap()
});

/// Lab-report markers: "value (range)" shapes and reference-range wording.
static LAB_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+\.?\d*\s*[\(\[]\s*\d+\.?\d*\s*[-–]\s*\d+\.?\d*\s*[\)\]]|\breference\s+range\b|\bg/dL\b|\bmg/dL\b|\bK/uL\b|\bmIU/L\b|\bmEq/L\b")
        .unwrap()
});

/// Offline, deterministic classifier: counts prescription vs. lab markers
/// and falls through to `advice` when neither dominates. Used by the
/// offline-reproducible extraction strategy; never calls out.
pub struct HeuristicClassifier;

impl DocumentClassifier for HeuristicClassifier {
    fn classify(&self, text: &str) -> Result<DocumentType, CapabilityError> {
        let prescription_hits = PRESCRIPTION_MARKERS.find_iter(text).count();
        let lab_hits = LAB_MARKERS.find_iter(text).count();

        if lab_hits >= prescription_hits && lab_hits > 0 {
            Ok(DocumentType::LabReport)
        } else if prescription_hits > 0 {
            Ok(DocumentType::Prescription)
        } else {
            Ok(DocumentType::Advice)
        }
    }
}
