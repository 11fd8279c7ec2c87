use serde::{Deserialize, Serialize};

use super::enums::FindingStatus;

/// One structured lab measurement derived from a document.
///
/// `status` is always computed from `value` vs. the parsed
/// `reference_range` (see `pipeline::extraction::parse::derive_status`),
/// never hand-entered. Findings are replaced wholesale on every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub test_name: String,
    /// Raw value as printed on the report; numeric-parseable.
    pub value: String,
    pub unit: String,
    /// May be open-ended ("<200", ">40") or a closed interval ("70-100").
    pub reference_range: String,
    pub status: FindingStatus,
    pub category: String,
    /// Extraction confidence in [0,1].
    pub confidence: f32,
}

/// One prescribed medication extracted from a prescription-type document.
/// Mutually exclusive with `Finding` population within one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abnormal_statuses() {
        assert!(FindingStatus::Low.is_abnormal());
        assert!(FindingStatus::Critical.is_abnormal());
        assert!(!FindingStatus::Normal.is_abnormal());
    }

    #[test]
    fn finding_serializes_with_snake_case_status() {
        let f = Finding {
            test_name: "Hemoglobin".into(),
            value: "11.2".into(),
            unit: "g/dL".into(),
            reference_range: "12.0-17.5".into(),
            status: FindingStatus::Low,
            category: "Hematology".into(),
            confidence: 0.85,
        };
        let json = serde_json::to_string(&f).unwrap();
        assert!(json.contains("\"status\":\"low\""));
    }
}
