//! Prompt assembly for the narrative model.

use crate::models::{EvidenceItem, Finding, Language, Medication, PersonalizationLevel};

pub fn build_system_prompt(language: Language) -> String {
    let target = language.display_name().to_uppercase();
    format!(
        r#"You are a medical document interpretation system. You DO NOT diagnose.
You explain medical lab results AND other medical documents (like prescriptions or advisory notes) based on structured findings and raw document text.

CRITICAL RULES:
1. GENERATE ALL OUTPUT (summary, section titles, section content, recommended actions, and disclaimer) IN {target}.
2. NEVER make a diagnosis. Use phrases like "may suggest", "is commonly associated with", "per original document".
3. EVERY claim must reference a citation number [N] if from medical evidence, or explicitly mention it's from the original document.
4. If blood test findings are available, prioritize explaining them.
5. If no blood test findings but raw text is present, interpret the raw text (e.g., explain medications, dosages, or hospital instructions).
6. Clearly distinguish between normal results, abnormal results, and general medical instructions.
7. Express uncertainty when text is unclear or evidence is limited.
8. Always include "Recommended Actions" (e.g., "Follow the prescribed course", "Consult your doctor").
9. For each section, provide a "source_mapping" array that traces each key claim back to its source.

OUTPUT FORMAT (JSON):
{{
  "summary": "Brief overall summary paragraph",
  "sections": [
    {{
      "title": "Category Name (e.g. Medications, Hematology, Instructions)",
      "content": "Detailed explanation with [N] citations where applicable",
      "findings_covered": ["Test1", "MedicationA"],
      "severity": "normal|attention|concern",
      "source_mapping": [
        {{"sentence": "Key claim sentence", "source_type": "finding|evidence|document", "source_ref": "Test name or citation ID or 'original document'"}}
      ]
    }}
  ],
  "citations": [
    {{"id": 1, "source": "Source Name", "text": "Key quote"}}
  ],
  "recommended_actions": ["Action 1", "Action 2"],
  "disclaimer": "Standard medical disclaimer text"
}}"#
    )
}

pub fn build_user_prompt(
    findings: &[Finding],
    medications: &[Medication],
    evidence: &[EvidenceItem],
    raw_text: Option<&str>,
    level: PersonalizationLevel,
    language: Language,
) -> String {
    let target = language.display_name();
    let complexity = match level {
        PersonalizationLevel::Simple => format!(
            "Use very simple language in {target} at a 6th-grade reading level. Avoid medical jargon. Be reassuring."
        ),
        PersonalizationLevel::Standard => format!(
            "Use clear, accessible language in {target}. Briefly explain medical terms when used."
        ),
        PersonalizationLevel::Detailed => format!(
            "Provide thorough clinical detail in {target}. Include pathophysiology context where relevant."
        ),
    };

    let findings_text = format_findings(findings);
    let medications_text = format_medications(medications);
    let evidence_text = format_evidence(evidence);

    format!(
        r#"## Raw Document Text
{raw}

## Structured Findings (Primary Lab Data)
{findings}

## Medications & Dosages
{medications}

## Retrieved Medical Evidence
{evidence}

## Personalization & Language
Target Language: {target}
{complexity}

Generate a structured, grounded explanation for this medical document in {target}.
If it is a prescription/advisory note, summarize the medications and instructions accurately.
If it is a lab report, focus on values and their significance.
Be factual and clinical, never alarmist. Ensure ALL fields in the JSON response are in {target}."#,
        raw = raw_text.unwrap_or("Not available"),
        findings = if findings_text.is_empty() {
            "No structured lab data extracted".to_string()
        } else {
            findings_text
        },
        medications = if medications_text.is_empty() {
            "No structured medication data extracted".to_string()
        } else {
            medications_text
        },
        evidence = if evidence_text.is_empty() {
            "No direct medical evidence found".to_string()
        } else {
            evidence_text
        },
    )
}

fn format_findings(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(|f| {
            let marker = if f.status.is_abnormal() { "[!]" } else { "[ok]" };
            format!(
                "{marker} {}: {} {} (Ref: {}) - Status: {}",
                f.test_name,
                f.value,
                f.unit,
                if f.reference_range.is_empty() {
                    "N/A"
                } else {
                    &f.reference_range
                },
                f.status.as_str().to_uppercase()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_medications(medications: &[Medication]) -> String {
    medications
        .iter()
        .map(|m| {
            format!(
                "- {} ({}): {} for {}. Instructions: {}",
                m.name,
                m.dosage.as_deref().unwrap_or("N/A"),
                m.frequency.as_deref().unwrap_or("N/A"),
                m.duration.as_deref().unwrap_or("N/A"),
                m.instructions.as_deref().unwrap_or("None"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_evidence(evidence: &[EvidenceItem]) -> String {
    evidence
        .iter()
        .enumerate()
        .map(|(i, e)| format!("[{}] ({}) {}", i + 1, e.source, e.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
