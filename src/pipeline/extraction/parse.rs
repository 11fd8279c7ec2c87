//! Deterministic extraction: reference-range parsing, status derivation,
//! and the regex passes over transcribed text.
//!
//! This is a best-effort normalizer, not a grammar for every real-world
//! report format. Unparseable inputs get explicit outcomes
//! (`(None, None)` ranges, `normal` status) rather than guesses.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::tables::{display_name, COMMON_TESTS};
use crate::models::{Finding, FindingStatus};

/// Confidence assigned to lookup-table matches.
pub const TABLE_CONFIDENCE: f32 = 0.85;
/// Confidence assigned to generic-pattern matches.
pub const GENERIC_CONFIDENCE: f32 = 0.6;

/// Below `lower * CRITICAL_LOW_FACTOR` a low value becomes critical.
const CRITICAL_LOW_FACTOR: f64 = 0.7;
/// Above `upper * CRITICAL_HIGH_FACTOR` a high value becomes critical.
const CRITICAL_HIGH_FACTOR: f64 = 1.5;

// ---------------------------------------------------------------------------
// Reference ranges
// ---------------------------------------------------------------------------

static RANGE_LT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[<≤]\s*(\d+\.?\d*)").unwrap());
static RANGE_GT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[>≥]\s*(\d+\.?\d*)").unwrap());
static RANGE_CLOSED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\.?\d*)\s*(?:[-–—]|to)\s*(\d+\.?\d*)").unwrap());

/// Parse a reference range string into (lower, upper) bounds.
///
/// Recognized shapes: "<X" / "≤X", ">X" / "≥X", and closed intervals
/// "A-B" with dash, en-dash, em-dash, or "to". Anything else is
/// `(None, None)`.
pub fn parse_reference_range(range: &str) -> (Option<f64>, Option<f64>) {
    let range = range.trim();
    if range.is_empty() {
        return (None, None);
    }
    if let Some(caps) = RANGE_LT.captures(range) {
        return (None, caps[1].parse().ok());
    }
    if let Some(caps) = RANGE_GT.captures(range) {
        return (caps[1].parse().ok(), None);
    }
    if let Some(caps) = RANGE_CLOSED.captures(range) {
        return (caps[1].parse().ok(), caps[2].parse().ok());
    }
    (None, None)
}

/// Compute the status of a value against its reference range.
///
/// Values exactly at a bound are normal; an unparseable range is normal.
pub fn derive_status(value: f64, reference_range: &str) -> FindingStatus {
    let (lower, upper) = parse_reference_range(reference_range);
    if let Some(lower) = lower {
        if value < lower {
            return if value < lower * CRITICAL_LOW_FACTOR {
                FindingStatus::Critical
            } else {
                FindingStatus::Low
            };
        }
    }
    if let Some(upper) = upper {
        if value > upper {
            return if value > upper * CRITICAL_HIGH_FACTOR {
                FindingStatus::Critical
            } else {
                FindingStatus::High
            };
        }
    }
    FindingStatus::Normal
}

// ---------------------------------------------------------------------------
// Lookup-table pass
// ---------------------------------------------------------------------------

/// One compiled pattern per table synonym: "synonym [:.-|]? value (unit)?".
static TABLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    COMMON_TESTS
        .iter()
        .map(|(synonym, info)| {
            Regex::new(&format!(
                r"(?i)\b{}\s*[:.\-|]?\s*(\d+\.?\d*)\s*({})?",
                regex::escape(synonym),
                regex::escape(info.unit),
            ))
            .unwrap()
        })
        .collect()
});

/// Generic line pattern used when the table pass finds nothing:
/// "name-like-token separator value (unit)? (range)?".
static GENERIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([A-Za-z][A-Za-z\s\.]{2,30}?)\s*[:.\-|]+\s*(\d+\.?\d*)\s*([A-Za-z/%]+)?\s*(?:[\(\[]?\s*(\d+\.?\d*\s*[-–]\s*\d+\.?\d*)\s*[\)\]]?)?",
    )
    .unwrap()
});

/// Extract findings from transcribed text.
///
/// First pass: the synonym lookup table, one finding per synonym per
/// document at confidence 0.85. If that yields nothing, a generic
/// name/value/unit/range pass at confidence 0.6.
pub fn extract_findings(text: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut captured: HashSet<usize> = HashSet::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        for (idx, (synonym, info)) in COMMON_TESTS.iter().enumerate() {
            if captured.contains(&idx) {
                continue;
            }
            let Some(caps) = TABLE_PATTERNS[idx].captures(line) else {
                continue;
            };
            let value_str = &caps[1];
            let Ok(value) = value_str.parse::<f64>() else {
                continue;
            };
            captured.insert(idx);
            findings.push(Finding {
                test_name: display_name(synonym),
                value: value_str.to_string(),
                unit: info.unit.to_string(),
                reference_range: info.reference_range.to_string(),
                status: derive_status(value, info.reference_range),
                category: info.category.to_string(),
                confidence: TABLE_CONFIDENCE,
            });
        }
    }

    if findings.is_empty() {
        findings = extract_generic(text);
    }
    findings
}

fn extract_generic(text: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for line in text.lines() {
        for caps in GENERIC_PATTERN.captures_iter(line) {
            let name = caps[1].trim();
            let value_str = &caps[2];
            let Ok(value) = value_str.parse::<f64>() else {
                continue;
            };
            let unit = caps.get(3).map(|m| m.as_str()).unwrap_or("");
            let range = caps.get(4).map(|m| m.as_str());
            let status = match range {
                Some(range) => derive_status(value, range),
                None => FindingStatus::Normal,
            };
            findings.push(Finding {
                test_name: title_case(name),
                value: value_str.to_string(),
                unit: unit.to_string(),
                reference_range: range.unwrap_or("N/A").to_string(),
                status,
                category: "General".to_string(),
                confidence: GENERIC_CONFIDENCE,
            });
        }
    }
    findings
}

fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Reference ranges ---------------------------------------------------

    #[test]
    fn parses_all_four_range_shapes() {
        assert_eq!(parse_reference_range("<200"), (None, Some(200.0)));
        assert_eq!(parse_reference_range(">40"), (Some(40.0), None));
        assert_eq!(parse_reference_range("70-100"), (Some(70.0), Some(100.0)));
        assert_eq!(parse_reference_range("70 – 100"), (Some(70.0), Some(100.0)));
        assert_eq!(parse_reference_range("70 to 100"), (Some(70.0), Some(100.0)));
        assert_eq!(parse_reference_range("negative"), (None, None));
        assert_eq!(parse_reference_range(""), (None, None));
    }

    #[test]
    fn values_at_bounds_are_normal() {
        assert_eq!(derive_status(70.0, "70-100"), FindingStatus::Normal);
        assert_eq!(derive_status(100.0, "70-100"), FindingStatus::Normal);
    }

    #[test]
    fn low_and_critical_low() {
        assert_eq!(derive_status(69.9, "70-100"), FindingStatus::Low);
        // 0.7 * 70 = 49
        assert_eq!(derive_status(49.0, "70-100"), FindingStatus::Low);
        assert_eq!(derive_status(48.9, "70-100"), FindingStatus::Critical);
    }

    #[test]
    fn high_and_critical_high() {
        assert_eq!(derive_status(100.1, "70-100"), FindingStatus::High);
        // 1.5 * 100 = 150
        assert_eq!(derive_status(150.0, "70-100"), FindingStatus::High);
        assert_eq!(derive_status(150.1, "70-100"), FindingStatus::Critical);
    }

    #[test]
    fn open_ended_ranges() {
        assert_eq!(derive_status(180.0, "<200"), FindingStatus::Normal);
        assert_eq!(derive_status(250.0, "<200"), FindingStatus::High);
        assert_eq!(derive_status(35.0, ">40"), FindingStatus::Low);
        assert_eq!(derive_status(20.0, ">40"), FindingStatus::Critical);
    }

    #[test]
    fn unparseable_range_is_normal() {
        assert_eq!(derive_status(999.0, "see note"), FindingStatus::Normal);
    }

    #[test]
    fn hemoglobin_11_2_is_low_not_critical() {
        // 11.2 < 12.0 but not < 8.4
        assert_eq!(derive_status(11.2, "12.0-17.5"), FindingStatus::Low);
    }

    // -- Table pass ---------------------------------------------------------

    const SAMPLE_REPORT: &str = "COMPLETE BLOOD COUNT (CBC)\n\
        Hemoglobin: 11.2 g/dL (12.0-17.5)\n\
        WBC: 12.5 K/uL (4.5-11.0)\n\
        Platelet: 185 K/uL (150-400)\n\
        Glucose: 118 mg/dL (70-100)\n";

    #[test]
    fn table_pass_extracts_known_tests() {
        let findings = extract_findings(SAMPLE_REPORT);
        let names: Vec<&str> = findings.iter().map(|f| f.test_name.as_str()).collect();
        assert!(names.contains(&"Hemoglobin"));
        assert!(names.contains(&"WBC"));
        assert!(names.contains(&"Platelet"));
        assert!(names.contains(&"Glucose"));
        for f in &findings {
            assert!((f.confidence - TABLE_CONFIDENCE).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn table_pass_derives_status() {
        let findings = extract_findings(SAMPLE_REPORT);
        let hgb = findings.iter().find(|f| f.test_name == "Hemoglobin").unwrap();
        assert_eq!(hgb.status, FindingStatus::Low);
        let wbc = findings.iter().find(|f| f.test_name == "WBC").unwrap();
        assert_eq!(wbc.status, FindingStatus::High);
        let plt = findings.iter().find(|f| f.test_name == "Platelet").unwrap();
        assert_eq!(plt.status, FindingStatus::Normal);
    }

    #[test]
    fn duplicate_synonym_captured_once() {
        let text = "Glucose: 118 mg/dL\nGlucose: 90 mg/dL\n";
        let findings = extract_findings(text);
        let glucose: Vec<_> = findings
            .iter()
            .filter(|f| f.test_name == "Glucose")
            .collect();
        assert_eq!(glucose.len(), 1);
        assert_eq!(glucose[0].value, "118");
    }

    #[test]
    fn generic_fallback_when_table_misses() {
        let text = "Obscure Marker: 42.5 U/mL (10-40)\n";
        let findings = extract_findings(text);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].test_name, "Obscure Marker");
        assert_eq!(findings[0].category, "General");
        assert_eq!(findings[0].status, FindingStatus::High);
        assert!((findings[0].confidence - GENERIC_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn generic_fallback_without_range_is_normal() {
        let text = "Mystery Level: 7.3\n";
        let findings = extract_findings(text);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reference_range, "N/A");
        assert_eq!(findings[0].status, FindingStatus::Normal);
    }

    #[test]
    fn empty_text_yields_no_findings() {
        assert!(extract_findings("").is_empty());
        assert!(extract_findings("\n\n  \n").is_empty());
    }
}
