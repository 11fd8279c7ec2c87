//! Safety guardrails over the generated narrative.
//!
//! Pure annotation: the text is scanned against fixed pattern sets and every
//! hit becomes a flag. Content is never rewritten or removed here.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{FlagSeverity, GeneratedExplanation, GuardrailFlag};

/// Characters of surrounding text captured with each flag.
const CONTEXT_RADIUS: usize = 40;

/// Diagnostic assertions. These contradict the no-diagnosis rule and always
/// produce warning-severity flags.
pub static DIAGNOSTIC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\byou have\b",
        r"\byou are diagnosed\b",
        r"\bthis confirms\b",
        r"\bthis means you have\b",
        r"\byou are suffering from\b",
        r"\bdefinitely\b",
        r"\bcertainly indicates\b",
        r"\bproves that\b",
        r"\bno doubt\b",
        r"\bwithout question\b",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("static pattern"))
    .collect()
});

/// Alarmist vocabulary. Flagged at info severity so the narrative still
/// passes unless diagnostic language is also present.
pub const ALARMIST_WORDS: &[&str] = &[
    "dangerous",
    "alarming",
    "severe",
    "critical condition",
    "emergency",
    "life-threatening",
    "fatal",
    "deadly",
    "extremely worried",
    "panic",
];

#[derive(Debug, Clone)]
pub struct GuardrailReport {
    pub flags: Vec<GuardrailFlag>,
    /// True when no warning-severity flag was raised.
    pub passed: bool,
}

impl GuardrailReport {
    pub fn warning_count(&self) -> usize {
        self.flags
            .iter()
            .filter(|f| f.severity == FlagSeverity::Warning)
            .count()
    }

    pub fn info_count(&self) -> usize {
        self.flags
            .iter()
            .filter(|f| f.severity == FlagSeverity::Info)
            .count()
    }
}

/// Scans the summary and every section of the explanation.
pub fn scan(explanation: &GeneratedExplanation) -> GuardrailReport {
    let mut flags = scan_text(&explanation.summary);
    for section in &explanation.sections {
        flags.extend(scan_text(&section.content));
    }
    let passed = !flags.iter().any(|f| f.severity == FlagSeverity::Warning);
    if !passed {
        tracing::warn!(flags = flags.len(), "guardrail warnings raised");
    }
    GuardrailReport { flags, passed }
}

/// Scans one block of text against both pattern sets.
pub fn scan_text(text: &str) -> Vec<GuardrailFlag> {
    let mut flags = Vec::new();

    for pattern in DIAGNOSTIC_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            flags.push(GuardrailFlag {
                severity: FlagSeverity::Warning,
                pattern: pattern.as_str().trim_start_matches("(?i)").to_string(),
                context: context_around(text, m.start(), m.end()),
            });
        }
    }

    let lower = text.to_lowercase();
    for word in ALARMIST_WORDS {
        for (start, matched) in lower.match_indices(word) {
            flags.push(GuardrailFlag {
                severity: FlagSeverity::Info,
                pattern: (*word).to_string(),
                context: context_around(text, start, start + matched.len()),
            });
        }
    }

    flags
}

/// Extracts surrounding context on char boundaries.
fn context_around(text: &str, start: usize, end: usize) -> String {
    let mut from = start.saturating_sub(CONTEXT_RADIUS);
    while from > 0 && !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (end + CONTEXT_RADIUS).min(text.len());
    while to < text.len() && !text.is_char_boundary(to) {
        to += 1;
    }
    text[from..to].trim().to_string()
}
