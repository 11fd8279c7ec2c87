//! Narrative generation with a deterministic fallback.
//!
//! The model is asked for the full structured explanation as JSON. Any
//! capability failure or unparseable response falls back to a templated
//! per-category explanation built from the findings alone.

use serde::Deserialize;

use crate::capabilities::{CapabilityError, NarrativeModel, NarrativeRequest};
use crate::capabilities::remote::strip_code_fences;
use crate::models::{
    Citation, EvidenceItem, ExplanationSection, Finding, FindingStatus, GeneratedExplanation,
    Language, Medication, PersonalizationLevel, Severity, SourceMapping,
};

use super::prompt;

pub const FALLBACK_SUMMARY: &str = "This automated clinical interpretation summarizes your recent lab test findings based on standard clinical reference ranges.";
pub const FALLBACK_DISCLAIMER: &str =
    "This is an automated fallback explanation generated without model assistance.";

pub struct NarrativeGenerator {
    model: Box<dyn NarrativeModel>,
}

pub struct NarrativeInput<'a> {
    pub findings: &'a [Finding],
    pub medications: &'a [Medication],
    pub evidence: &'a [EvidenceItem],
    pub raw_text: Option<&'a str>,
    pub level: PersonalizationLevel,
    pub language: Language,
}

impl NarrativeGenerator {
    pub fn new(model: Box<dyn NarrativeModel>) -> Self {
        Self { model }
    }

    /// Produces a structured explanation, degrading to the deterministic
    /// fallback on any model or parse failure.
    pub fn generate(&self, input: &NarrativeInput<'_>) -> GeneratedExplanation {
        let request = NarrativeRequest {
            system_prompt: prompt::build_system_prompt(input.language),
            user_prompt: prompt::build_user_prompt(
                input.findings,
                input.medications,
                input.evidence,
                input.raw_text,
                input.level,
                input.language,
            ),
            level: input.level,
            language: input.language,
        };

        match self.model.generate(&request) {
            Ok(content) => match parse_explanation(&content) {
                Ok(mut explanation) => {
                    explanation.model = Some(self.model.model_name().to_string());
                    explanation
                }
                Err(err) => {
                    tracing::warn!(error = %err, "malformed narrative payload, using fallback");
                    fallback_explanation(input.findings, input.medications)
                }
            },
            Err(CapabilityError::Timeout) => {
                tracing::warn!("narrative model timed out, using fallback");
                fallback_explanation(input.findings, input.medications)
            }
            Err(err) => {
                tracing::warn!(error = %err, "narrative model failed, using fallback");
                fallback_explanation(input.findings, input.medications)
            }
        }
    }
}

#[derive(Deserialize)]
struct RawExplanation {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    sections: Vec<RawSection>,
    #[serde(default)]
    citations: Vec<Citation>,
    #[serde(default)]
    recommended_actions: Vec<String>,
    #[serde(default)]
    disclaimer: Option<String>,
}

#[derive(Deserialize)]
struct RawSection {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    findings_covered: Vec<String>,
    #[serde(default)]
    severity: Option<Severity>,
    #[serde(default)]
    source_mapping: Vec<SourceMapping>,
}

fn parse_explanation(content: &str) -> Result<GeneratedExplanation, serde_json::Error> {
    let raw: RawExplanation = serde_json::from_str(strip_code_fences(content))?;
    let sections = raw
        .sections
        .into_iter()
        .filter(|s| !s.content.trim().is_empty())
        .map(|s| ExplanationSection {
            title: if s.title.trim().is_empty() {
                "General".to_string()
            } else {
                s.title
            },
            content: s.content,
            findings_covered: s.findings_covered,
            severity: s.severity.unwrap_or(Severity::Normal),
            source_mapping: s.source_mapping,
            certainty_level: None,
        })
        .collect();
    Ok(GeneratedExplanation {
        summary: raw.summary,
        sections,
        citations: raw.citations,
        recommended_actions: raw.recommended_actions,
        disclaimer: raw
            .disclaimer
            .unwrap_or_else(|| "This explanation is informational and not a diagnosis.".to_string()),
        model: None,
    })
}

/// Templated explanation used when the model is unavailable.
///
/// Findings are grouped by category in first-seen order; a prescription with
/// no lab findings gets a single medications section instead.
pub fn fallback_explanation(
    findings: &[Finding],
    medications: &[Medication],
) -> GeneratedExplanation {
    let mut sections: Vec<ExplanationSection> = Vec::new();

    let mut categories: Vec<&str> = Vec::new();
    for f in findings {
        if !categories.contains(&f.category.as_str()) {
            categories.push(&f.category);
        }
    }

    for category in categories {
        let in_category: Vec<&Finding> =
            findings.iter().filter(|f| f.category == category).collect();
        let abnormal: Vec<&&Finding> = in_category
            .iter()
            .filter(|f| f.status != FindingStatus::Normal)
            .collect();

        if abnormal.is_empty() {
            sections.push(ExplanationSection {
                title: category.to_string(),
                content: format!(
                    "All {} markers are within normal reference ranges.",
                    category.to_lowercase()
                ),
                findings_covered: in_category.iter().map(|f| f.test_name.clone()).collect(),
                severity: Severity::Normal,
                source_mapping: Vec::new(),
                certainty_level: None,
            });
            continue;
        }

        let content = abnormal
            .iter()
            .map(|f| {
                let direction = match f.status {
                    FindingStatus::High | FindingStatus::Critical => "above",
                    _ => "below",
                };
                format!(
                    "Your {} level is {} {}, which is {} the reference range ({}). \
                     This finding may warrant further evaluation by your healthcare provider.",
                    f.test_name,
                    f.value,
                    f.unit,
                    direction,
                    if f.reference_range.is_empty() {
                        "N/A"
                    } else {
                        &f.reference_range
                    }
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
        let severity = if abnormal.iter().any(|f| f.status == FindingStatus::Critical) {
            Severity::Concern
        } else {
            Severity::Attention
        };
        sections.push(ExplanationSection {
            title: category.to_string(),
            content,
            findings_covered: abnormal.iter().map(|f| f.test_name.clone()).collect(),
            severity,
            source_mapping: Vec::new(),
            certainty_level: None,
        });
    }

    if sections.is_empty() && !medications.is_empty() {
        let content = medications
            .iter()
            .map(|m| {
                format!(
                    "{} ({}) is to be taken {}.",
                    m.name,
                    m.dosage.as_deref().unwrap_or("dosage not specified"),
                    m.frequency.as_deref().unwrap_or("as directed"),
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
        sections.push(ExplanationSection {
            title: "Medications".to_string(),
            content,
            findings_covered: medications.iter().map(|m| m.name.clone()).collect(),
            severity: Severity::Attention,
            source_mapping: Vec::new(),
            certainty_level: None,
        });
    }

    GeneratedExplanation {
        summary: FALLBACK_SUMMARY.to_string(),
        sections,
        citations: Vec::new(),
        recommended_actions: vec![
            "Review these findings with your primary care physician.".to_string(),
            "Maintain your current medication schedule unless advised otherwise.".to_string(),
        ],
        disclaimer: FALLBACK_DISCLAIMER.to_string(),
        model: None,
    }
}
