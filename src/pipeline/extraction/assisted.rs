//! AI-assisted extraction wrappers.
//!
//! The capability returns empty on failure and never raises past the
//! orchestrator. Records are validated at this stage boundary: status is
//! always recomputed from value vs. reference range, never trusted from
//! upstream.

use crate::capabilities::RecordExtractor;
use crate::models::{Finding, Medication};

use super::parse::derive_status;

/// Extract findings with the assisted capability, then normalize.
pub fn assisted_findings(extractor: &dyn RecordExtractor, text: &str) -> Vec<Finding> {
    let raw = match extractor.extract_findings(text) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "Assisted finding extraction failed");
            return Vec::new();
        }
    };
    normalize_findings(raw)
}

/// Extract medications with the assisted capability.
pub fn assisted_medications(extractor: &dyn RecordExtractor, text: &str) -> Vec<Medication> {
    match extractor.extract_medications(text) {
        Ok(meds) => meds
            .into_iter()
            .filter(|m| !m.name.trim().is_empty())
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Assisted medication extraction failed");
            Vec::new()
        }
    }
}

/// Drop records with no usable name or non-numeric value, recompute status,
/// and clamp confidence to [0,1].
pub fn normalize_findings(raw: Vec<Finding>) -> Vec<Finding> {
    raw.into_iter()
        .filter_map(|mut f| {
            if f.test_name.trim().is_empty() {
                return None;
            }
            let value: f64 = f.value.trim().parse().ok()?;
            f.status = derive_status(value, &f.reference_range);
            f.confidence = f.confidence.clamp(0.0, 1.0);
            Some(f)
        })
        .collect()
}
