//! Post-hoc quality evaluation of a finished explanation.
//!
//! Four independent metrics computed from the persisted narrative. The
//! evaluation reads the explanation and never writes back into it.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::{
    Citation, EvaluationDetails, EvaluationRecord, ExplanationSection, Finding, FlagSeverity,
    Grade, GuardrailFlag, Severity,
};
use crate::pipeline::confidence::round3;
use crate::pipeline::guardrail::{ALARMIST_WORDS, DIAGNOSTIC_PATTERNS};
use crate::pipeline::PipelineError;
use crate::store::repository;

const WEIGHT_COMPLETENESS: f32 = 0.30;
const WEIGHT_SAFETY: f32 = 0.30;
const WEIGHT_CITATION: f32 = 0.20;
const WEIGHT_HALLUCINATION: f32 = 0.20;

const VIOLATION_PENALTY: f32 = 0.1;

/// Sentences at or below this length are ignored by the hallucination scan.
const MIN_SENTENCE_LEN: usize = 20;

/// Hedging markers accepted as grounding. Matched as substrings, so
/// "indicates" and "suggests" count too.
const HEDGING_MARKERS: &[&str] = &["may", "could", "might", "suggest", "indicate"];

static CITATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]").expect("static pattern"));

static GOLD_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z]{3,}\b").expect("static pattern"));

/// Everything the evaluator reads. Borrowed from the persisted report.
pub struct EvaluationInput<'a> {
    pub explanation_text: &'a str,
    pub sections: &'a [ExplanationSection],
    pub citations: &'a [Citation],
    pub findings: &'a [Finding],
    pub guardrail_flags: &'a [GuardrailFlag],
    pub gold_standard: Option<&'a str>,
}

/// Metric scores plus auditability details, before persistence.
pub struct EvaluationOutcome {
    pub completeness: f32,
    pub safety: f32,
    pub citation_density: f32,
    pub hallucination_risk: f32,
    pub overall: f32,
    pub grade: Grade,
    pub details: EvaluationDetails,
}

/// Loads a finished report, evaluates it, and persists the result.
pub fn evaluate_report(
    conn: &Connection,
    report_id: &Uuid,
    gold_standard: Option<&str>,
) -> Result<EvaluationRecord, PipelineError> {
    let report = repository::get_report(conn, report_id)?
        .ok_or(PipelineError::ReportNotFound(*report_id))?;
    let findings = repository::get_findings(conn, report_id)?;

    let sections = report.sections.unwrap_or_default();
    let citations = report.citations.unwrap_or_default();
    let flags = report.guardrail_flags.unwrap_or_default();
    let outcome = evaluate(&EvaluationInput {
        explanation_text: report.explanation_text.as_deref().unwrap_or(""),
        sections: &sections,
        citations: &citations,
        findings: &findings,
        guardrail_flags: &flags,
        gold_standard,
    });

    let record = EvaluationRecord {
        id: Uuid::new_v4(),
        report_id: *report_id,
        completeness: outcome.completeness,
        safety: outcome.safety,
        citation_density: outcome.citation_density,
        hallucination_risk: outcome.hallucination_risk,
        overall: outcome.overall,
        grade: outcome.grade,
        details: outcome.details,
        created_at: Utc::now(),
    };
    repository::insert_evaluation(conn, &record)?;
    Ok(record)
}

/// Pure multi-metric evaluation.
pub fn evaluate(input: &EvaluationInput<'_>) -> EvaluationOutcome {
    let completeness = score_completeness(input.sections, input.findings, input.gold_standard);
    let safety = score_safety(input.explanation_text, input.sections, input.guardrail_flags);
    let citation_density = score_citation_density(input.sections);
    let hallucination_risk = score_hallucination_risk(
        input.explanation_text,
        input.sections,
        input.findings,
        input.citations,
    );

    let overall = WEIGHT_COMPLETENESS * completeness
        + WEIGHT_SAFETY * safety
        + WEIGHT_CITATION * citation_density
        + WEIGHT_HALLUCINATION * (1.0 - hallucination_risk);

    let covered = covered_findings(input.sections, input.findings);
    let covered_lower: HashSet<String> = covered.iter().map(|n| n.to_lowercase()).collect();
    let missed = input
        .findings
        .iter()
        .filter(|f| !covered_lower.contains(&f.test_name.to_lowercase()))
        .map(|f| f.test_name.clone())
        .collect();

    EvaluationOutcome {
        completeness: round3(completeness),
        safety: round3(safety),
        citation_density: round3(citation_density),
        hallucination_risk: round3(hallucination_risk),
        overall: round3(overall),
        grade: letter_grade(overall),
        details: EvaluationDetails {
            findings_covered: covered,
            findings_missed: missed,
            safety_issues: safety_issues(input.explanation_text, input.sections),
            uncited_sections: uncited_sections(input.sections),
        },
    }
}

fn joined_content(sections: &[ExplanationSection]) -> String {
    sections
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fraction of findings mentioned in the narrative, optionally blended
/// 0.7/0.3 with keyword overlap against a gold-standard text.
fn score_completeness(
    sections: &[ExplanationSection],
    findings: &[Finding],
    gold_standard: Option<&str>,
) -> f32 {
    if findings.is_empty() {
        return 1.0;
    }

    let all_content = joined_content(sections).to_lowercase();
    let mut covered: HashSet<String> = HashSet::new();
    for f in findings {
        let name = f.test_name.to_lowercase();
        if !name.is_empty() && all_content.contains(&name) {
            covered.insert(name);
        }
    }
    for section in sections {
        for name in &section.findings_covered {
            covered.insert(name.to_lowercase());
        }
    }

    let mut score = covered.len() as f32 / findings.len() as f32;

    if let Some(gold) = gold_standard {
        let keywords: HashSet<&str> = GOLD_KEYWORD
            .find_iter(gold)
            .map(|m| m.as_str())
            .collect();
        let gold_score = if keywords.is_empty() {
            1.0
        } else {
            let matched = keywords
                .iter()
                .filter(|kw| all_content.contains(&kw.to_lowercase()))
                .count();
            matched as f32 / keywords.len() as f32
        };
        score = 0.7 * score + 0.3 * gold_score;
    }

    score.min(1.0)
}

/// One violation = one diagnostic-pattern hit, one alarmist word present,
/// or one guardrail warning.
fn score_safety(
    text: &str,
    sections: &[ExplanationSection],
    flags: &[GuardrailFlag],
) -> f32 {
    let all_text = format!("{} {}", text, joined_content(sections));

    let diagnostic: usize = DIAGNOSTIC_PATTERNS
        .iter()
        .map(|p| p.find_iter(&all_text).count())
        .sum();
    let lower = all_text.to_lowercase();
    let alarmist = ALARMIST_WORDS.iter().filter(|w| lower.contains(**w)).count();
    let warnings = flags
        .iter()
        .filter(|f| f.severity == FlagSeverity::Warning)
        .count();

    (1.0 - VIOLATION_PENALTY * (diagnostic + alarmist + warnings) as f32).max(0.0)
}

/// Fraction of attention/concern sections carrying a "[N]" citation.
/// Vacuously 1.0 when no section is abnormal.
fn score_citation_density(sections: &[ExplanationSection]) -> f32 {
    let abnormal: Vec<&ExplanationSection> = sections
        .iter()
        .filter(|s| matches!(s.severity, Severity::Attention | Severity::Concern))
        .collect();
    if abnormal.is_empty() {
        return 1.0;
    }
    let cited = abnormal
        .iter()
        .filter(|s| CITATION_MARKER.is_match(&s.content))
        .count();
    cited as f32 / abnormal.len() as f32
}

/// Fraction of content sentences with no grounding at all: no term from the
/// findings or citations, no citation marker, no hedging language.
fn score_hallucination_risk(
    text: &str,
    sections: &[ExplanationSection],
    findings: &[Finding],
    citations: &[Citation],
) -> f32 {
    let all_content = format!("{} {}", text, joined_content(sections));

    let mut grounded_terms: HashSet<String> = HashSet::new();
    for f in findings {
        grounded_terms.insert(f.test_name.to_lowercase());
        grounded_terms.insert(f.value.to_lowercase());
    }
    for c in citations {
        for word in c.text.to_lowercase().split_whitespace() {
            if word.len() > 4 {
                grounded_terms.insert(word.to_string());
            }
        }
    }
    grounded_terms.retain(|t| !t.is_empty());

    let sentences: Vec<&str> = all_content
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.len() > MIN_SENTENCE_LEN)
        .collect();
    if sentences.is_empty() {
        return 0.0;
    }

    let ungrounded = sentences
        .iter()
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            let has_grounding = grounded_terms.iter().any(|t| lower.contains(t));
            let has_citation = CITATION_MARKER.is_match(sentence);
            let has_hedging = HEDGING_MARKERS.iter().any(|h| lower.contains(h));
            !has_grounding && !has_citation && !has_hedging
        })
        .count();

    ungrounded as f32 / sentences.len() as f32
}

fn letter_grade(score: f32) -> Grade {
    if score >= 0.90 {
        Grade::A
    } else if score >= 0.80 {
        Grade::B
    } else if score >= 0.70 {
        Grade::C
    } else if score >= 0.60 {
        Grade::D
    } else {
        Grade::F
    }
}

fn covered_findings(sections: &[ExplanationSection], findings: &[Finding]) -> Vec<String> {
    let all_content = joined_content(sections).to_lowercase();
    findings
        .iter()
        .filter(|f| all_content.contains(&f.test_name.to_lowercase()))
        .map(|f| f.test_name.clone())
        .collect()
}

fn safety_issues(text: &str, sections: &[ExplanationSection]) -> Vec<String> {
    let all_text = format!("{} {}", text, joined_content(sections));
    let mut issues = Vec::new();
    for pattern in DIAGNOSTIC_PATTERNS.iter() {
        for m in pattern.find_iter(&all_text) {
            issues.push(format!("Diagnostic language: '{}'", m.as_str()));
        }
    }
    let lower = all_text.to_lowercase();
    for word in ALARMIST_WORDS {
        if lower.contains(word) {
            issues.push(format!("Alarmist term: '{word}'"));
        }
    }
    issues
}

fn uncited_sections(sections: &[ExplanationSection]) -> Vec<String> {
    sections
        .iter()
        .filter(|s| matches!(s.severity, Severity::Attention | Severity::Concern))
        .filter(|s| !CITATION_MARKER.is_match(&s.content))
        .map(|s| s.title.clone())
        .collect()
}
