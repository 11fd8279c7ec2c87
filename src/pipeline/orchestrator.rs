//! End-to-end pipeline orchestration.
//!
//! The interpreter owns the capability handles and the evidence retriever;
//! it runs one document at a time through the stage sequence, committing
//! each stage's output before the next begins so partial progress is always
//! inspectable. The document record is exclusively owned by the run.

use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

use crate::capabilities::{
    DocumentClassifier, RecordExtractor, TranscriptionEngine, Transcript,
};
use crate::config::{ExtractionStrategy, PipelineConfig};
use crate::models::{
    AnxietyLevel, AuditEntry, DocumentType, EvidenceItem, ExplanationVersion, Finding,
    Medication, PresentedExplanation, ReasoningTrace, ReportRecord, ReportStatus,
};
use crate::store::repository;

use super::confidence;
use super::extraction::{assisted, classify, parse};
use super::guardrail::{self, GuardrailReport};
use super::narrative::{NarrativeGenerator, NarrativeInput};
use super::personalize;
use super::retrieval::{EvidenceRetriever, EvidenceSearch};
use super::PipelineError;

const SUPPORTED_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/tiff",
    "application/pdf",
    "text/plain",
];

/// Everything a completed run produced, beyond what was persisted.
#[derive(Debug)]
pub struct RunOutcome {
    pub report_id: Uuid,
    pub document_type: DocumentType,
    pub findings: Vec<Finding>,
    pub medications: Vec<Medication>,
    pub evidence: Vec<EvidenceItem>,
    pub explanation: PresentedExplanation,
    pub guardrail: GuardrailReport,
    pub anxiety: AnxietyLevel,
}

pub struct Interpreter {
    transcription: Box<dyn TranscriptionEngine>,
    classifier: Box<dyn DocumentClassifier>,
    extractor: Option<Box<dyn RecordExtractor>>,
    narrative: NarrativeGenerator,
    retriever: EvidenceRetriever,
    config: PipelineConfig,
}

impl Interpreter {
    pub fn new(
        transcription: Box<dyn TranscriptionEngine>,
        classifier: Box<dyn DocumentClassifier>,
        narrative: NarrativeGenerator,
        search: Box<dyn EvidenceSearch>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            transcription,
            classifier,
            extractor: None,
            narrative,
            retriever: EvidenceRetriever::new(search, config.retrieval_top_k),
            config,
        }
    }

    /// Enables the assisted extraction strategy.
    pub fn with_record_extractor(mut self, extractor: Box<dyn RecordExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Runs the full pipeline over one uploaded document.
    ///
    /// Preflight failures (unknown report, wrong status, unsupported format)
    /// return before any state is mutated. After preflight, any fatal
    /// failure forces the report to `error` with the cause attached to the
    /// trace, leaving the document reprocessable.
    pub fn run(
        &self,
        conn: &Connection,
        report_id: &Uuid,
        document: &[u8],
        mime_type: &str,
    ) -> Result<RunOutcome, PipelineError> {
        // Preflight, before any mutation.
        let mut report = repository::get_report(conn, report_id)?
            .ok_or(PipelineError::ReportNotFound(*report_id))?;
        if !report.status.can_start_run() {
            return Err(PipelineError::WrongStatus {
                id: *report_id,
                status: report.status.as_str().to_string(),
            });
        }
        if !SUPPORTED_MIME_TYPES.contains(&mime_type) {
            return Err(PipelineError::UnsupportedFormat(mime_type.to_string()));
        }

        repository::update_status(conn, report_id, &ReportStatus::Processing)?;
        let mut trace = ReasoningTrace::start();

        match self.run_stages(conn, &mut report, &mut trace, document, mime_type) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.fail_run(conn, &mut report, trace, &err)?;
                Err(err)
            }
        }
    }

    fn run_stages(
        &self,
        conn: &Connection,
        report: &mut ReportRecord,
        trace: &mut ReasoningTrace,
        document: &[u8],
        mime_type: &str,
    ) -> Result<RunOutcome, PipelineError> {
        // Transcription. Fatal on failure: nothing downstream can run
        // without text, and there is no sample-data substitution.
        let transcript = self
            .transcription
            .transcribe(document, mime_type)
            .map_err(PipelineError::Transcription)?;
        trace.record(
            "ocr",
            json!({
                "confidence": transcript.quality,
                "text_length": transcript.text.len(),
            }),
        );

        // Classification gates which extractor runs; decided exactly once.
        let document_type = classify::classify_document(self.classifier.as_ref(), &transcript.text);
        trace.record(
            "classification",
            json!({ "document_type": document_type.as_str() }),
        );

        // Extraction. Records are replaced wholesale so an errored run can
        // be safely re-invoked.
        let (findings, medications) = self.extract(&transcript, document_type)?;
        match document_type {
            DocumentType::LabReport if findings.is_empty() => {
                return Err(PipelineError::FatalExtraction {
                    document_type: document_type.as_str().to_string(),
                });
            }
            DocumentType::Prescription if medications.is_empty() => {
                return Err(PipelineError::FatalExtraction {
                    document_type: document_type.as_str().to_string(),
                });
            }
            _ => {}
        }
        repository::replace_findings(conn, &report.id, &findings)?;
        repository::replace_medications(conn, &report.id, &medications)?;
        report.report_type = document_type;
        report.transcript = Some(transcript.text.clone());
        report.transcription_confidence = Some(transcript.quality);
        report.status = ReportStatus::Extracted;
        report.updated_at = Utc::now();
        repository::update_report(conn, report)?;
        trace.record(
            "extraction",
            json!({
                "findings_count": findings.len(),
                "medications_count": medications.len(),
            }),
        );

        // Evidence retrieval. Abnormal findings only; empty is a valid
        // outcome, not a failure.
        let evidence = self.retriever.retrieve(&findings);
        let avg_relevance = if evidence.is_empty() {
            0.0
        } else {
            evidence.iter().map(|e| e.relevance).sum::<f32>() / evidence.len() as f32
        };
        trace.record(
            "retrieval",
            json!({
                "evidence_count": evidence.len(),
                "avg_relevance": avg_relevance,
            }),
        );

        // Narrative generation. Degrades to the deterministic fallback
        // internally; never fails the run.
        let generated = self.narrative.generate(&NarrativeInput {
            findings: &findings,
            medications: &medications,
            evidence: &evidence,
            raw_text: Some(&transcript.text),
            level: report.personalization_level,
            language: report.language,
        });
        trace.record(
            "explanation",
            json!({
                "sections_count": generated.sections.len(),
                "citations_count": generated.citations.len(),
                "model": generated.model,
            }),
        );

        // Guardrails annotate; they never rewrite content.
        let guardrail_report = guardrail::scan(&generated);
        trace.record(
            "guardrail",
            json!({
                "warnings": guardrail_report.warning_count(),
                "infos": guardrail_report.info_count(),
                "passed": guardrail_report.passed,
            }),
        );

        // Presentation is a one-shot transform; the generated explanation
        // is consumed here and cannot be re-wrapped.
        let mut presented = personalize::personalize(generated, report.personalization_level);
        trace.record(
            "personalization",
            json!({
                "level": report.personalization_level.as_str(),
                "tone": presented.tone,
            }),
        );

        // Confidence over the raw stage outputs; presentation does not
        // enter the scores.
        let confidence_report = confidence::aggregate(
            transcript.quality,
            &findings,
            &evidence,
            &guardrail_report,
        );
        trace.record(
            "confidence",
            json!({
                "overall": confidence_report.overall,
                "quality_label": confidence_report.quality_label.as_str(),
            }),
        );

        super::certainty::tag_sections(&mut presented.sections, &confidence_report);
        let established = presented
            .sections
            .iter()
            .filter(|s| {
                s.certainty_level == Some(crate::models::CertaintyLevel::Established)
            })
            .count();
        trace.record(
            "certainty",
            json!({
                "established": established,
                "inferred": presented.sections.len() - established,
            }),
        );

        // Final commit: explanation, scores, and trace land together.
        report.explanation_text = Some(presented.summary.clone());
        report.sections = Some(presented.sections.clone());
        report.citations = Some(presented.citations.clone());
        report.guardrail_flags = Some(guardrail_report.flags.clone());
        report.guardrail_passed = Some(guardrail_report.passed);
        report.confidence = Some(confidence_report);
        report.reasoning_trace = Some(trace.clone());
        report.status = ReportStatus::Explained;
        report.updated_at = Utc::now();
        repository::update_report(conn, report)?;

        // The first successful explanation is version 1; re-runs after an
        // edit keep the existing version history.
        if repository::next_version_number(conn, &report.id)? == 1 {
            repository::insert_version(
                conn,
                &ExplanationVersion {
                    id: Uuid::new_v4(),
                    report_id: report.id,
                    version: 1,
                    explanation_text: presented.summary.clone(),
                    sections: presented.sections.clone(),
                    edit_type: "original".to_string(),
                    created_at: Utc::now(),
                },
            )?;
        }

        repository::insert_audit(
            conn,
            &AuditEntry {
                id: Uuid::new_v4(),
                report_id: report.id,
                action: "pipeline_complete".to_string(),
                details: json!({
                    "document_type": report.report_type.as_str(),
                    "findings_count": findings.len(),
                    "guardrail_passed": guardrail_report.passed,
                }),
                created_at: Utc::now(),
            },
        )?;

        let anxiety = personalize::anxiety_level(&findings);
        tracing::info!(
            report_id = %report.id,
            document_type = report.report_type.as_str(),
            findings = findings.len(),
            "pipeline run complete"
        );

        Ok(RunOutcome {
            report_id: report.id,
            document_type: report.report_type,
            findings,
            medications,
            evidence,
            explanation: presented,
            guardrail: guardrail_report,
            anxiety,
        })
    }

    fn extract(
        &self,
        transcript: &Transcript,
        document_type: DocumentType,
    ) -> Result<(Vec<Finding>, Vec<Medication>), PipelineError> {
        let result = match document_type {
            DocumentType::LabReport => {
                let findings = match (self.config.extraction, &self.extractor) {
                    (ExtractionStrategy::Assisted, Some(extractor)) => {
                        assisted::assisted_findings(extractor.as_ref(), &transcript.text)
                    }
                    (ExtractionStrategy::Assisted, None) => {
                        tracing::warn!(
                            "assisted extraction configured without an extractor, using tables"
                        );
                        parse::extract_findings(&transcript.text)
                    }
                    (ExtractionStrategy::Deterministic, _) => {
                        parse::extract_findings(&transcript.text)
                    }
                };
                (findings, Vec::new())
            }
            DocumentType::Prescription => {
                let medications = match &self.extractor {
                    Some(extractor) => {
                        assisted::assisted_medications(extractor.as_ref(), &transcript.text)
                    }
                    None => Vec::new(),
                };
                (Vec::new(), medications)
            }
            // Advisory notes carry no structured records; the narrative
            // works from the raw text alone.
            DocumentType::Advice => (Vec::new(), Vec::new()),
        };
        Ok(result)
    }

    /// Forces the run into the `error` terminal state with the cause
    /// attached to the trace, then writes the audit record.
    fn fail_run(
        &self,
        conn: &Connection,
        report: &mut ReportRecord,
        mut trace: ReasoningTrace,
        err: &PipelineError,
    ) -> Result<(), PipelineError> {
        tracing::error!(report_id = %report.id, error = %err, "pipeline run failed");
        trace.error = Some(err.to_string());
        report.status = ReportStatus::Error;
        report.reasoning_trace = Some(trace);
        report.updated_at = Utc::now();
        repository::update_report(conn, report)?;
        repository::insert_audit(
            conn,
            &AuditEntry {
                id: Uuid::new_v4(),
                report_id: report.id,
                action: "pipeline_error".to_string(),
                details: json!({ "error": err.to_string() }),
                created_at: Utc::now(),
            },
        )?;
        Ok(())
    }
}
