//! Presentation transform for generated explanations.
//!
//! Consumes a [`GeneratedExplanation`] and produces a [`PresentedExplanation`]
//! exactly once per run. Because the input type is consumed, a presented
//! explanation can never be re-wrapped with another prefix and closing.

use crate::models::{
    AnxietyLevel, Finding, FindingStatus, GeneratedExplanation, PersonalizationLevel,
    PresentedExplanation,
};

struct Template {
    prefix: &'static str,
    closing: &'static str,
    tone: &'static str,
}

const SIMPLE: Template = Template {
    prefix: "Here's what your test results mean in simple terms:\n\n",
    closing: "\n\nRemember: These are just numbers, and your doctor knows your full health picture. Don't worry, many of these can be improved with simple lifestyle changes.",
    tone: "warm",
};

const STANDARD: Template = Template {
    prefix: "## Your Lab Results Interpretation\n\n",
    closing: "\n\nPlease consult your healthcare provider for a comprehensive evaluation and personalized recommendations.",
    tone: "professional",
};

const DETAILED: Template = Template {
    prefix: "## Detailed Laboratory Analysis\n\n",
    closing: "\n\nThis analysis is based on established medical literature and clinical guidelines. Interpretation should be contextualized within the patient's clinical presentation and history.",
    tone: "clinical",
};

/// Jargon to plain-language substitutions applied at the "simple" level.
const JARGON_REPLACEMENTS: &[(&str, &str)] = &[
    ("hyperuricemia", "high uric acid levels"),
    ("hyperlipidemia", "high cholesterol"),
    ("dyslipidemia", "imbalanced cholesterol levels"),
    ("hypothyroidism", "underactive thyroid"),
    ("hyperthyroidism", "overactive thyroid"),
    ("leukocytosis", "high white blood cell count"),
    ("anemia", "low red blood cell or hemoglobin levels"),
    ("hepatocellular", "liver cell"),
    ("atherosclerosis", "plaque buildup in arteries"),
    ("pathophysiology", "how the condition develops"),
    ("microvascular", "small blood vessel"),
    ("megaloblastic", "a type of"),
    ("subclinical", "mild or early-stage"),
    ("pharmacological", "medication-based"),
    ("etiology", "cause"),
    ("prognosis", "outlook"),
    ("comorbidity", "related condition"),
];

fn template_for(level: PersonalizationLevel) -> &'static Template {
    match level {
        PersonalizationLevel::Simple => &SIMPLE,
        PersonalizationLevel::Standard => &STANDARD,
        PersonalizationLevel::Detailed => &DETAILED,
    }
}

/// One-shot presentation transform.
pub fn personalize(
    explanation: GeneratedExplanation,
    level: PersonalizationLevel,
) -> PresentedExplanation {
    let template = template_for(level);

    let mut sections = explanation.sections;
    if level == PersonalizationLevel::Simple {
        for section in &mut sections {
            section.content = simplify_text(&section.content);
        }
    }

    PresentedExplanation {
        summary: format!("{}{}{}", template.prefix, explanation.summary, template.closing),
        sections,
        citations: explanation.citations,
        recommended_actions: explanation.recommended_actions,
        disclaimer: explanation.disclaimer,
        level,
        tone: template.tone.to_string(),
        model: explanation.model,
    }
}

/// Replaces medical jargon with plain language, case-preserving for
/// capitalized occurrences.
pub fn simplify_text(text: &str) -> String {
    let mut result = text.to_string();
    for (term, simple) in JARGON_REPLACEMENTS {
        result = result.replace(term, simple);
        result = result.replace(&capitalize(term), &capitalize(simple));
    }
    result
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Anxiety risk estimate used to pick presentation defaults.
pub fn anxiety_level(findings: &[Finding]) -> AnxietyLevel {
    let critical = findings
        .iter()
        .filter(|f| f.status == FindingStatus::Critical)
        .count();
    let abnormal = findings
        .iter()
        .filter(|f| matches!(f.status, FindingStatus::High | FindingStatus::Low))
        .count();

    if critical >= 2 {
        AnxietyLevel::High
    } else if critical >= 1 || abnormal >= 5 {
        AnxietyLevel::Moderate
    } else {
        AnxietyLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExplanationSection, Severity};

    fn explanation(summary: &str, section_content: &str) -> GeneratedExplanation {
        GeneratedExplanation {
            summary: summary.to_string(),
            sections: vec![ExplanationSection {
                title: "Hematology".to_string(),
                content: section_content.to_string(),
                findings_covered: Vec::new(),
                severity: Severity::Attention,
                source_mapping: Vec::new(),
                certainty_level: None,
            }],
            citations: Vec::new(),
            recommended_actions: Vec::new(),
            disclaimer: "Not a diagnosis.".to_string(),
            model: Some("test-model".to_string()),
        }
    }

    fn finding(status: FindingStatus) -> Finding {
        Finding {
            test_name: "Hemoglobin".to_string(),
            value: "11.2".to_string(),
            unit: "g/dL".to_string(),
            reference_range: "12.0-17.5".to_string(),
            status,
            category: "Hematology".to_string(),
            confidence: 0.85,
        }
    }

    #[test]
    fn standard_wraps_summary_without_simplifying() {
        let presented = personalize(
            explanation("Low hemoglobin.", "This may indicate anemia."),
            PersonalizationLevel::Standard,
        );
        assert!(presented
            .summary
            .starts_with("## Your Lab Results Interpretation"));
        assert!(presented.summary.contains("Low hemoglobin."));
        assert!(presented.summary.ends_with("personalized recommendations."));
        assert_eq!(presented.tone, "professional");
        // Jargon untouched at standard level.
        assert!(presented.sections[0].content.contains("anemia"));
    }

    #[test]
    fn simple_replaces_jargon_case_preserving() {
        let presented = personalize(
            explanation("Summary.", "Anemia is suspected. Chronic anemia may persist."),
            PersonalizationLevel::Simple,
        );
        let content = &presented.sections[0].content;
        assert!(content.starts_with("Low red blood cell or hemoglobin levels is suspected."));
        assert!(content.contains("Chronic low red blood cell or hemoglobin levels"));
        assert_eq!(presented.tone, "warm");
    }

    #[test]
    fn simplify_is_idempotent() {
        let once = simplify_text("Subclinical hypothyroidism with anemia.");
        let twice = simplify_text(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn substitution_table_is_not_self_referential() {
        // Idempotence of simplify_text depends on no plain-language
        // replacement containing another jargon term.
        for (_, simple) in JARGON_REPLACEMENTS {
            for (term, _) in JARGON_REPLACEMENTS {
                assert!(
                    !simple.to_lowercase().contains(term),
                    "replacement '{simple}' contains jargon term '{term}'"
                );
            }
        }
    }

    #[test]
    fn anxiety_thresholds() {
        assert_eq!(anxiety_level(&[]), AnxietyLevel::Low);
        assert_eq!(
            anxiety_level(&[finding(FindingStatus::Critical)]),
            AnxietyLevel::Moderate
        );
        assert_eq!(
            anxiety_level(&[
                finding(FindingStatus::Critical),
                finding(FindingStatus::Critical)
            ]),
            AnxietyLevel::High
        );
        let five_abnormal: Vec<Finding> =
            (0..5).map(|_| finding(FindingStatus::High)).collect();
        assert_eq!(anxiety_level(&five_abnormal), AnxietyLevel::Moderate);
        let four_abnormal: Vec<Finding> =
            (0..4).map(|_| finding(FindingStatus::Low)).collect();
        assert_eq!(anxiety_level(&four_abnormal), AnxietyLevel::Low);
    }
}
