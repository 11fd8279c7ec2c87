//! Confidence aggregation across pipeline stages.
//!
//! Recomputed wholesale every run, never merged with a previous report.

use std::collections::BTreeMap;

use crate::models::{
    ConfidenceReport, EvidenceItem, Finding, QualityLabel, StageScores,
};

use super::guardrail::GuardrailReport;

const WEIGHT_OCR: f32 = 0.20;
const WEIGHT_EXTRACTION: f32 = 0.25;
const WEIGHT_RETRIEVAL: f32 = 0.30;
const WEIGHT_GUARDRAIL: f32 = 0.25;

const GUARDRAIL_FLOOR: f32 = 0.3;
const WARNING_PENALTY: f32 = 0.15;
const INFO_PENALTY: f32 = 0.05;

const DEFAULT_SUB_SCORE: f32 = 0.5;
const NO_EVIDENCE_MATCH: f32 = 0.4;

/// Builds the full confidence report for one run.
pub fn aggregate(
    ocr_quality: f32,
    findings: &[Finding],
    evidence: &[EvidenceItem],
    guardrail: &GuardrailReport,
) -> ConfidenceReport {
    let ocr = clamp01(ocr_quality);

    let extraction = if findings.is_empty() {
        DEFAULT_SUB_SCORE
    } else {
        let sum: f32 = findings.iter().map(|f| clamp01(f.confidence)).sum();
        sum / findings.len() as f32
    };

    let retrieval = if evidence.is_empty() {
        DEFAULT_SUB_SCORE
    } else {
        let sum: f32 = evidence.iter().map(|e| clamp01(e.relevance)).sum();
        sum / evidence.len() as f32
    };

    let guardrail_score = (1.0
        - WARNING_PENALTY * guardrail.warning_count() as f32
        - INFO_PENALTY * guardrail.info_count() as f32)
        .max(GUARDRAIL_FLOOR);

    let overall = WEIGHT_OCR * ocr
        + WEIGHT_EXTRACTION * extraction
        + WEIGHT_RETRIEVAL * retrieval
        + WEIGHT_GUARDRAIL * guardrail_score;
    let overall = round3(clamp01(overall));

    let per_finding: BTreeMap<String, f32> = findings
        .iter()
        .map(|f| {
            (
                f.test_name.clone(),
                round3(per_finding_confidence(f, ocr, evidence)),
            )
        })
        .collect();

    ConfidenceReport {
        overall,
        stages: StageScores {
            ocr: round3(ocr),
            extraction: round3(extraction),
            retrieval: round3(retrieval),
            guardrail: round3(guardrail_score),
        },
        per_finding,
        quality_label: quality_label(overall),
    }
}

/// Per-finding confidence blends transcription quality, the extractor's own
/// confidence, and the strongest matching evidence snippet.
fn per_finding_confidence(finding: &Finding, ocr: f32, evidence: &[EvidenceItem]) -> f32 {
    let name = finding.test_name.to_lowercase();
    let evidence_score = evidence
        .iter()
        .filter(|e| e.content.to_lowercase().contains(&name))
        .map(|e| clamp01(e.relevance))
        .fold(None::<f32>, |acc, r| Some(acc.map_or(r, |a| a.max(r))))
        .unwrap_or(NO_EVIDENCE_MATCH);
    clamp01(0.3 * ocr + 0.3 * clamp01(finding.confidence) + 0.4 * evidence_score)
}

fn quality_label(overall: f32) -> QualityLabel {
    if overall >= 0.85 {
        QualityLabel::High
    } else if overall >= 0.65 {
        QualityLabel::Moderate
    } else if overall >= 0.45 {
        QualityLabel::Low
    } else {
        QualityLabel::VeryLow
    }
}

fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Rounds to 3 decimals so stored scores compare stably.
pub fn round3(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FindingStatus;

    fn finding(name: &str, confidence: f32) -> Finding {
        Finding {
            test_name: name.to_string(),
            value: "11.2".to_string(),
            unit: "g/dL".to_string(),
            reference_range: "12.0-17.5".to_string(),
            status: FindingStatus::Low,
            category: "Hematology".to_string(),
            confidence,
        }
    }

    fn evidence(content: &str, relevance: f32) -> EvidenceItem {
        EvidenceItem {
            content: content.to_string(),
            source: "Test".to_string(),
            category: "General".to_string(),
            relevance,
        }
    }

    fn clean_guardrail() -> GuardrailReport {
        GuardrailReport {
            flags: Vec::new(),
            passed: true,
        }
    }

    #[test]
    fn perfect_inputs_give_perfect_overall() {
        let findings = vec![finding("Hemoglobin", 1.0)];
        let evidence = vec![evidence("hemoglobin reference", 1.0)];
        let report = aggregate(1.0, &findings, &evidence, &clean_guardrail());
        assert_eq!(report.overall, 1.0);
        assert_eq!(report.quality_label, QualityLabel::High);
    }

    #[test]
    fn zero_inputs_hit_guardrail_floor() {
        use crate::models::{FlagSeverity, GuardrailFlag};
        let flags = (0..10)
            .map(|_| GuardrailFlag {
                severity: FlagSeverity::Warning,
                pattern: "you have".to_string(),
                context: String::new(),
            })
            .collect();
        let guardrail = GuardrailReport {
            flags,
            passed: false,
        };
        let findings = vec![finding("Hemoglobin", 0.0)];
        let evidence = vec![evidence("unrelated", 0.0)];
        let report = aggregate(0.0, &findings, &evidence, &guardrail);
        // Guardrail floors at 0.3, so overall floors at 0.25 * 0.3.
        assert_eq!(report.overall, 0.075);
        assert_eq!(report.stages.guardrail, 0.3);
        assert_eq!(report.quality_label, QualityLabel::VeryLow);
    }

    #[test]
    fn missing_stages_default_to_half() {
        let report = aggregate(0.9, &[], &[], &clean_guardrail());
        assert_eq!(report.stages.extraction, 0.5);
        assert_eq!(report.stages.retrieval, 0.5);
        assert!(report.per_finding.is_empty());
    }

    #[test]
    fn guardrail_penalties_apply_per_flag() {
        use crate::models::{FlagSeverity, GuardrailFlag};
        let guardrail = GuardrailReport {
            flags: vec![
                GuardrailFlag {
                    severity: FlagSeverity::Warning,
                    pattern: "you have".to_string(),
                    context: String::new(),
                },
                GuardrailFlag {
                    severity: FlagSeverity::Info,
                    pattern: "panic".to_string(),
                    context: String::new(),
                },
            ],
            passed: false,
        };
        let report = aggregate(1.0, &[], &[], &guardrail);
        assert_eq!(report.stages.guardrail, 0.8); // 1 - 0.15 - 0.05
    }

    #[test]
    fn per_finding_uses_best_matching_evidence() {
        let findings = vec![finding("Hemoglobin", 0.8)];
        let evidence_items = vec![
            evidence("Hemoglobin levels below 12 g/dL indicate anemia.", 0.9),
            evidence("Hemoglobin and hematocrit together confirm anemia.", 0.6),
            evidence("Glucose above 126 mg/dL indicates diabetes.", 0.95),
        ];
        let report = aggregate(1.0, &findings, &evidence_items, &clean_guardrail());
        // 0.3*1.0 + 0.3*0.8 + 0.4*0.9
        assert_eq!(report.per_finding["Hemoglobin"], 0.9);
    }

    #[test]
    fn per_finding_defaults_without_matching_evidence() {
        let findings = vec![finding("Ferritin", 0.5)];
        let evidence_items = vec![evidence("Glucose guidance", 0.9)];
        let report = aggregate(0.5, &findings, &evidence_items, &clean_guardrail());
        // 0.3*0.5 + 0.3*0.5 + 0.4*0.4
        assert_eq!(report.per_finding["Ferritin"], 0.46);
    }

    #[test]
    fn quality_label_thresholds() {
        assert_eq!(quality_label(0.85), QualityLabel::High);
        assert_eq!(quality_label(0.84), QualityLabel::Moderate);
        assert_eq!(quality_label(0.65), QualityLabel::Moderate);
        assert_eq!(quality_label(0.64), QualityLabel::Low);
        assert_eq!(quality_label(0.45), QualityLabel::Low);
        assert_eq!(quality_label(0.44), QualityLabel::VeryLow);
    }
}
