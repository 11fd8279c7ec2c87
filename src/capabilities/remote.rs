//! Remote model client over a chat-completions HTTP API.
//!
//! One blocking client with an explicit timeout implements transcription,
//! classification, structured extraction, and narrative generation. These
//! are the only operations in the pipeline that may block on external
//! latency.

use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;

use super::{
    CapabilityError, DocumentClassifier, NarrativeModel, NarrativeRequest, RecordExtractor,
    Transcript, TranscriptionEngine,
};
use crate::models::{DocumentType, Finding, FindingStatus, Medication};

/// Vision transcription quality reported by the remote model path.
const TRANSCRIPTION_QUALITY: f32 = 0.95;

/// Classification only needs the head of the document.
const CLASSIFY_TEXT_LIMIT: usize = 2000;

pub struct RemoteModelClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl RemoteModelClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, CapabilityError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CapabilityError::Unavailable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        })
    }

    /// POST a chat-completions request and return the first message content.
    fn chat(&self, messages: serde_json::Value) -> Result<String, CapabilityError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.0,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(CapabilityError::Http(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| CapabilityError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CapabilityError::MalformedResponse("empty choices".into()))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> CapabilityError {
    if e.is_timeout() {
        CapabilityError::Timeout
    } else {
        CapabilityError::Http(e.to_string())
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl TranscriptionEngine for RemoteModelClient {
    fn transcribe(&self, document: &[u8], mime_type: &str) -> Result<Transcript, CapabilityError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(document);
        let messages = json!([{
            "role": "user",
            "content": [
                {
                    "type": "text",
                    "text": "Transcribe all text from this medical report exactly as it \
                             appears. Maintain the tables, test names, values, units, and \
                             reference ranges. Do not add any interpretations or summaries. \
                             Output only the transcribed text."
                },
                {
                    "type": "image_url",
                    "image_url": { "url": format!("data:{mime_type};base64,{encoded}") }
                }
            ]
        }]);

        let text = self.chat(messages)?;
        Ok(Transcript {
            text,
            quality: TRANSCRIPTION_QUALITY,
        })
    }
}

impl DocumentClassifier for RemoteModelClient {
    fn classify(&self, text: &str) -> Result<DocumentType, CapabilityError> {
        let head: String = text.chars().take(CLASSIFY_TEXT_LIMIT).collect();
        let prompt = format!(
            "Classify the following medical document text into exactly one of three \
             categories:\n\
             1. \"lab_report\": laboratory test names with numerical results and reference ranges.\n\
             2. \"prescription\": medication names, dosages (e.g. mg, ml), and frequencies (e.g. 1-0-1).\n\
             3. \"advice\": general clinical advice, symptoms, or non-drug recommendations.\n\n\
             Return ONLY the category name.\n\nTEXT:\n{head}"
        );

        let answer = self.chat(json!([{"role": "user", "content": prompt}]))?;
        Ok(parse_classification(&answer))
    }
}

impl RecordExtractor for RemoteModelClient {
    fn extract_findings(&self, text: &str) -> Result<Vec<Finding>, CapabilityError> {
        let prompt = format!(
            "Analyze the following document text and extract ONLY laboratory test \
             results. Return a JSON array of objects with: test_name, value, unit, \
             reference_range, category, confidence.\n\nTEXT:\n{text}"
        );
        let content = self.chat(json!([{"role": "user", "content": prompt}]))?;
        parse_findings_payload(&content)
    }

    fn extract_medications(&self, text: &str) -> Result<Vec<Medication>, CapabilityError> {
        let prompt = format!(
            "Analyze the following document text and extract ONLY medications and \
             prescriptions. IGNORE headers, clinic names, and administrative details.\n\
             Return a JSON array of objects with:\n\
             - name: medication name (e.g. Augmentin)\n\
             - dosage: strength (e.g. 625mg)\n\
             - frequency: how often (e.g. 1-0-1 or Twice daily)\n\
             - duration: how long (e.g. 5 days)\n\
             - instructions: special notes (e.g. After meals)\n\nTEXT:\n{text}"
        );
        let content = self.chat(json!([{"role": "user", "content": prompt}]))?;
        parse_medications_payload(&content)
    }
}

impl NarrativeModel for RemoteModelClient {
    fn generate(&self, request: &NarrativeRequest) -> Result<String, CapabilityError> {
        self.chat(json!([
            {"role": "system", "content": request.system_prompt},
            {"role": "user", "content": request.user_prompt}
        ]))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Map a free-form classification answer onto a known type.
/// Unknown answers resolve to `lab_report` (the dominant document type).
pub(crate) fn parse_classification(answer: &str) -> DocumentType {
    let lower = answer.trim().to_lowercase();
    if lower.contains("prescription") {
        DocumentType::Prescription
    } else if lower.contains("advice") {
        DocumentType::Advice
    } else {
        DocumentType::LabReport
    }
}

/// Strip markdown code fences around a JSON payload.
pub(crate) fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    for fence in ["```json", "```"] {
        if let Some(inner) = trimmed.strip_prefix(fence) {
            if let Some(end) = inner.rfind("```") {
                return inner[..end].trim();
            }
            return inner.trim();
        }
    }
    trimmed
}

/// A JSON array, or an object whose first array value is the payload.
fn extract_array(value: serde_json::Value) -> Vec<serde_json::Value> {
    match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => map
            .into_iter()
            .find_map(|(_, v)| match v {
                serde_json::Value::Array(items) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[derive(Deserialize)]
struct RawFinding {
    test_name: Option<String>,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    unit: String,
    #[serde(default)]
    reference_range: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Parse a findings payload. Records without a test name or value are
/// dropped; `status` is left to the extraction boundary, which recomputes
/// it from value vs. reference range.
pub(crate) fn parse_findings_payload(content: &str) -> Result<Vec<Finding>, CapabilityError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fences(content))
        .map_err(|e| CapabilityError::MalformedResponse(e.to_string()))?;

    let mut findings = Vec::new();
    for item in extract_array(value) {
        let raw: RawFinding = match serde_json::from_value(item) {
            Ok(raw) => raw,
            Err(_) => continue,
        };
        let Some(test_name) = raw.test_name.filter(|n| !n.trim().is_empty()) else {
            continue;
        };
        let value = match raw.value {
            serde_json::Value::String(s) if !s.trim().is_empty() => s,
            serde_json::Value::Number(n) => n.to_string(),
            _ => continue,
        };
        findings.push(Finding {
            test_name,
            value,
            unit: raw.unit,
            reference_range: raw.reference_range,
            status: FindingStatus::Normal,
            category: raw.category.unwrap_or_else(|| "General".to_string()),
            confidence: raw.confidence.unwrap_or(0.5),
        });
    }
    Ok(findings)
}

#[derive(Deserialize)]
struct RawMedication {
    name: Option<String>,
    #[serde(default)]
    dosage: Option<String>,
    #[serde(default)]
    frequency: Option<String>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    instructions: Option<String>,
}

pub(crate) fn parse_medications_payload(
    content: &str,
) -> Result<Vec<Medication>, CapabilityError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fences(content))
        .map_err(|e| CapabilityError::MalformedResponse(e.to_string()))?;

    let mut medications = Vec::new();
    for item in extract_array(value) {
        let raw: RawMedication = match serde_json::from_value(item) {
            Ok(raw) => raw,
            Err(_) => continue,
        };
        let Some(name) = raw.name.filter(|n| !n.trim().is_empty()) else {
            continue;
        };
        medications.push(Medication {
            name,
            dosage: raw.dosage,
            frequency: raw.frequency,
            duration: raw.duration,
            instructions: raw.instructions,
        });
    }
    Ok(medications)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_keywords() {
        assert_eq!(
            parse_classification(" Prescription\n"),
            DocumentType::Prescription
        );
        assert_eq!(parse_classification("advice"), DocumentType::Advice);
        assert_eq!(parse_classification("lab_report"), DocumentType::LabReport);
        assert_eq!(parse_classification("no idea"), DocumentType::LabReport);
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fences("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("[1]"), "[1]");
    }

    #[test]
    fn findings_payload_parses_array() {
        let content = r#"```json
        [
            {"test_name": "Glucose", "value": 118, "unit": "mg/dL",
             "reference_range": "70-100", "category": "Metabolic", "confidence": 0.9},
            {"test_name": "", "value": "12"},
            {"value": "5.0"}
        ]
        ```"#;
        let findings = parse_findings_payload(content).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].test_name, "Glucose");
        assert_eq!(findings[0].value, "118");
    }

    #[test]
    fn findings_payload_accepts_wrapping_object() {
        let content = r#"{"results": [{"test_name": "TSH", "value": "5.2"}]}"#;
        let findings = parse_findings_payload(content).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, "General");
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(parse_findings_payload("not json at all").is_err());
    }

    #[test]
    fn medications_payload_parses() {
        let content = r#"[{"name": "Augmentin", "dosage": "625mg", "frequency": "1-0-1"}]"#;
        let meds = parse_medications_payload(content).unwrap();
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].frequency.as_deref(), Some("1-0-1"));
        assert!(meds[0].duration.is_none());
    }
}
