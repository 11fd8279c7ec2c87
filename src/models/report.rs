use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{
    DocumentType, Language, PersonalizationLevel, QualityLabel, ReportStatus,
};
use super::explanation::{Citation, ExplanationSection, GuardrailFlag};

/// The persisted document record, the single source of truth for which
/// pipeline stage last completed. Exclusively owned by the run processing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    pub status: ReportStatus,
    pub report_type: DocumentType,
    pub language: Language,
    pub personalization_level: PersonalizationLevel,
    pub transcript: Option<String>,
    pub transcription_confidence: Option<f32>,
    pub explanation_text: Option<String>,
    pub sections: Option<Vec<ExplanationSection>>,
    pub citations: Option<Vec<Citation>>,
    pub guardrail_flags: Option<Vec<GuardrailFlag>>,
    pub guardrail_passed: Option<bool>,
    pub confidence: Option<ConfidenceReport>,
    pub reasoning_trace: Option<ReasoningTrace>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReportRecord {
    /// A fresh, unprocessed record in `uploaded` state.
    pub fn new(patient_id: Uuid, title: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            patient_id,
            title: title.to_string(),
            status: ReportStatus::Uploaded,
            report_type: DocumentType::LabReport,
            language: Language::En,
            personalization_level: PersonalizationLevel::Standard,
            transcript: None,
            transcription_confidence: None,
            explanation_text: None,
            sections: None,
            citations: None,
            guardrail_flags: None,
            guardrail_passed: None,
            confidence: None,
            reasoning_trace: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-stage quality sub-scores, each clamped to [0,1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageScores {
    pub ocr: f32,
    pub extraction: f32,
    pub retrieval: f32,
    pub guardrail: f32,
}

/// Composite confidence for a run. Recomputed wholesale every run, never
/// merged incrementally. All scores rounded to 3 decimals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceReport {
    pub overall: f32,
    pub stages: StageScores,
    /// Finding name → per-finding composite score. BTreeMap keeps the
    /// serialized form stable across runs.
    pub per_finding: BTreeMap<String, f32>,
    pub quality_label: QualityLabel,
}

/// One stage record of the reasoning trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: String,
    pub timestamp: DateTime<Utc>,
    /// Stage-specific metrics (confidence, item counts, average relevance).
    pub metrics: serde_json::Value,
}

/// Append-once-per-run audit record of pipeline stage metrics.
/// Replaced wholesale on re-run, never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningTrace {
    pub started_at: DateTime<Utc>,
    pub stages: Vec<StageRecord>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ReasoningTrace {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            stages: Vec::new(),
            error: None,
        }
    }

    pub fn record(&mut self, stage: &str, metrics: serde_json::Value) {
        self.stages.push(StageRecord {
            stage: stage.to_string(),
            timestamp: Utc::now(),
            metrics,
        });
    }
}

/// A stored snapshot of the narrative. Version 1 is the original pipeline
/// output; later versions come from the external edit path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationVersion {
    pub id: Uuid,
    pub report_id: Uuid,
    pub version: i64,
    pub explanation_text: String,
    pub sections: Vec<ExplanationSection>,
    pub edit_type: String,
    pub created_at: DateTime<Utc>,
}

/// One audit log entry for a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub report_id: Uuid,
    pub action: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Post-hoc quality evaluation of a completed explanation snapshot.
/// Independent entity; never mutates the explanation it scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: Uuid,
    pub report_id: Uuid,
    pub completeness: f32,
    pub safety: f32,
    pub citation_density: f32,
    pub hallucination_risk: f32,
    pub overall: f32,
    pub grade: super::enums::Grade,
    pub details: EvaluationDetails,
    pub created_at: DateTime<Utc>,
}

/// Auditability detail lists attached to an evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationDetails {
    pub findings_covered: Vec<String>,
    pub findings_missed: Vec<String>,
    pub safety_issues: Vec<String>,
    pub uncited_sections: Vec<String>,
}
