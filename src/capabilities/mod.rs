//! External capability seams.
//!
//! Every fallible external service the pipeline calls goes through one of
//! these traits, so the orchestrator stays fully testable with mock
//! implementations. Production implementations live in `remote`.

pub mod remote;

use thiserror::Error;

use crate::models::{DocumentType, Finding, Language, Medication, PersonalizationLevel};

/// Errors from any external capability call.
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Capability call timed out")]
    Timeout,

    #[error("Malformed capability response: {0}")]
    MalformedResponse(String),

    #[error("Capability unavailable: {0}")]
    Unavailable(String),
}

/// Result of transcribing a raw document.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    /// Transcription quality estimate in [0,1].
    pub quality: f32,
}

/// Vision/text transcription: raw document bytes → plain text + quality.
/// Failure is fatal for the run; there is no sample-data substitution.
pub trait TranscriptionEngine {
    fn transcribe(&self, document: &[u8], mime_type: &str) -> Result<Transcript, CapabilityError>;
}

/// Single categorical decision per run; gates which extractor runs.
/// Callers default to `lab_report` on failure.
pub trait DocumentClassifier {
    fn classify(&self, text: &str) -> Result<DocumentType, CapabilityError>;
}

/// AI-assisted structured extraction. Callers treat failure as an empty
/// result; the orchestrator decides whether emptiness is fatal.
pub trait RecordExtractor {
    fn extract_findings(&self, text: &str) -> Result<Vec<Finding>, CapabilityError>;
    fn extract_medications(&self, text: &str) -> Result<Vec<Medication>, CapabilityError>;
}

/// Everything the narrative model needs to produce an explanation.
#[derive(Debug, Clone)]
pub struct NarrativeRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub level: PersonalizationLevel,
    pub language: Language,
}

/// Narrative generation capability. Returns the raw model output; parsing
/// and the deterministic fallback live in `pipeline::narrative`.
pub trait NarrativeModel {
    fn generate(&self, request: &NarrativeRequest) -> Result<String, CapabilityError>;
    /// Identifier recorded in the reasoning trace.
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Mock implementations (used in tests and offline wiring)
// ---------------------------------------------------------------------------

/// Fixed-output transcription engine.
pub struct MockTranscription {
    text: String,
    quality: f32,
    fail: bool,
}

impl MockTranscription {
    pub fn new(text: &str, quality: f32) -> Self {
        Self {
            text: text.to_string(),
            quality,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            text: String::new(),
            quality: 0.0,
            fail: true,
        }
    }
}

impl TranscriptionEngine for MockTranscription {
    fn transcribe(&self, _document: &[u8], _mime: &str) -> Result<Transcript, CapabilityError> {
        if self.fail {
            return Err(CapabilityError::Unavailable("mock transcription".into()));
        }
        Ok(Transcript {
            text: self.text.clone(),
            quality: self.quality,
        })
    }
}

/// Classifier that always returns a fixed type (or fails).
pub struct MockClassifier {
    doc_type: Option<DocumentType>,
}

impl MockClassifier {
    pub fn new(doc_type: DocumentType) -> Self {
        Self {
            doc_type: Some(doc_type),
        }
    }

    pub fn failing() -> Self {
        Self { doc_type: None }
    }
}

impl DocumentClassifier for MockClassifier {
    fn classify(&self, _text: &str) -> Result<DocumentType, CapabilityError> {
        self.doc_type
            .clone()
            .ok_or_else(|| CapabilityError::Unavailable("mock classifier".into()))
    }
}

/// Extractor returning fixed record sets.
#[derive(Default)]
pub struct MockRecordExtractor {
    findings: Vec<Finding>,
    medications: Vec<Medication>,
    fail: bool,
}

impl MockRecordExtractor {
    pub fn with_findings(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            ..Self::default()
        }
    }

    pub fn with_medications(medications: Vec<Medication>) -> Self {
        Self {
            medications,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl RecordExtractor for MockRecordExtractor {
    fn extract_findings(&self, _text: &str) -> Result<Vec<Finding>, CapabilityError> {
        if self.fail {
            return Err(CapabilityError::Timeout);
        }
        Ok(self.findings.clone())
    }

    fn extract_medications(&self, _text: &str) -> Result<Vec<Medication>, CapabilityError> {
        if self.fail {
            return Err(CapabilityError::Timeout);
        }
        Ok(self.medications.clone())
    }
}

/// Narrative model returning a canned response (or failing, to exercise the
/// deterministic fallback).
pub struct MockNarrativeModel {
    response: Option<String>,
}

impl MockNarrativeModel {
    pub fn new(response: &str) -> Self {
        Self {
            response: Some(response.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { response: None }
    }
}

impl NarrativeModel for MockNarrativeModel {
    fn generate(&self, _request: &NarrativeRequest) -> Result<String, CapabilityError> {
        self.response
            .clone()
            .ok_or(CapabilityError::Timeout)
    }

    fn model_name(&self) -> &str {
        "mock-narrative"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_transcription_returns_fixed_text() {
        let engine = MockTranscription::new("Hemoglobin: 11.2 g/dL", 0.95);
        let t = engine.transcribe(b"bytes", "image/png").unwrap();
        assert_eq!(t.text, "Hemoglobin: 11.2 g/dL");
        assert!((t.quality - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn failing_mocks_fail() {
        assert!(MockTranscription::failing()
            .transcribe(b"", "image/png")
            .is_err());
        assert!(MockClassifier::failing().classify("text").is_err());
        assert!(MockRecordExtractor::failing().extract_findings("x").is_err());
        assert!(MockNarrativeModel::failing()
            .generate(&NarrativeRequest {
                system_prompt: String::new(),
                user_prompt: String::new(),
                level: PersonalizationLevel::Standard,
                language: Language::En,
            })
            .is_err());
    }
}
