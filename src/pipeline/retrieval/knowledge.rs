//! Curated medical reference corpus.
//!
//! Read-only and shared across runs: it seeds the semantic index once per
//! process and doubles as the keyword-fallback base when no index is
//! available.

/// One reference snippet of the corpus.
#[derive(Debug, Clone, Copy)]
pub struct KnowledgeEntry {
    pub category: &'static str,
    pub source: &'static str,
    pub content: &'static str,
}

/// Relevance assigned to keyword-fallback matches.
pub const FALLBACK_RELEVANCE: f32 = 0.75;

pub const KNOWLEDGE_BASE: &[KnowledgeEntry] = &[
    KnowledgeEntry {
        category: "Hematology",
        source: "WHO Guidelines",
        content: "Hemoglobin levels below 12 g/dL in women and 13 g/dL in men indicate anemia. Low hemoglobin can result from iron deficiency, chronic disease, or vitamin deficiencies. Mild anemia (10-12 g/dL) often presents with fatigue and pallor. Values below 8 g/dL require urgent medical attention.",
    },
    KnowledgeEntry {
        category: "Hematology",
        source: "Harrison's Principles",
        content: "Elevated WBC count (leukocytosis) above 11 K/uL may indicate infection, inflammation, stress response, or rarely leukemia. Mild elevations (11-15 K/uL) are commonly associated with bacterial infections. The differential count helps determine the specific type of immune response.",
    },
    KnowledgeEntry {
        category: "Hematology",
        source: "Clinical Pathology Guidelines",
        content: "ESR (Erythrocyte Sedimentation Rate) is a nonspecific marker of inflammation. Values above 20 mm/hr may indicate infection, autoimmune conditions, or tissue injury. ESR naturally increases with age. Markedly elevated ESR (>100 mm/hr) warrants investigation for serious conditions.",
    },
    KnowledgeEntry {
        category: "Hematology",
        source: "WHO Clinical Guidelines",
        content: "Low hematocrit values indicate reduced red blood cell volume and may suggest anemia, overhydration, or blood loss. Hematocrit below 36% in women and 39% in men is considered low. Combined with low hemoglobin, it confirms anemia diagnosis.",
    },
    KnowledgeEntry {
        category: "Metabolic",
        source: "ADA Standards of Medical Care",
        content: "Fasting glucose between 100-125 mg/dL indicates prediabetes. Values above 126 mg/dL on two separate tests indicate diabetes mellitus. HbA1c between 5.7-6.4% confirms prediabetic state. Lifestyle modifications can prevent progression to diabetes in prediabetic patients.",
    },
    KnowledgeEntry {
        category: "Metabolic",
        source: "ADA Guidelines 2024",
        content: "HbA1c reflects average blood glucose over 2-3 months. Values of 5.7-6.4% indicate prediabetes, while 6.5% or above indicates diabetes. For diagnosed diabetics, target HbA1c is generally below 7%. Each 1% reduction in HbA1c reduces microvascular complications by approximately 40%.",
    },
    KnowledgeEntry {
        category: "Kidney",
        source: "KDIGO Guidelines",
        content: "Elevated uric acid above 7 mg/dL in men or 6 mg/dL in women (hyperuricemia) increases risk of gout and kidney stones. Chronic hyperuricemia may also be associated with cardiovascular disease and metabolic syndrome. Dietary modification and adequate hydration are first-line interventions.",
    },
    KnowledgeEntry {
        category: "Lipid",
        source: "ACC/AHA Cholesterol Guidelines",
        content: "Total cholesterol above 200 mg/dL is considered borderline high. LDL cholesterol above 100 mg/dL increases cardiovascular risk. Elevated triglycerides above 150 mg/dL are associated with metabolic syndrome. The total cholesterol to HDL ratio is a strong predictor of cardiovascular risk.",
    },
    KnowledgeEntry {
        category: "Lipid",
        source: "ESC Cardiovascular Prevention",
        content: "LDL cholesterol is the primary driver of atherosclerosis. Values above 100 mg/dL warrant lifestyle intervention, and above 130 mg/dL may require pharmacological treatment depending on overall cardiovascular risk. Statin therapy reduces LDL by 30-50% and is first-line treatment.",
    },
    KnowledgeEntry {
        category: "Lipid",
        source: "AHA Lipid Guidelines",
        content: "Triglycerides above 150 mg/dL indicate hypertriglyceridemia. Elevated triglycerides combined with low HDL and high LDL constitute atherogenic dyslipidemia, significantly increasing cardiovascular risk. Dietary changes, exercise, and omega-3 supplementation can help reduce triglycerides.",
    },
    KnowledgeEntry {
        category: "Liver",
        source: "AASLD Practice Guidelines",
        content: "SGPT (ALT) is more specific to liver injury than SGOT (AST). ALT above 56 U/L may indicate hepatocellular damage. Common causes include fatty liver disease, medications, viral hepatitis, and alcohol use. ALT/AST ratio helps differentiate causes: a ratio above 2 suggests alcoholic liver disease.",
    },
    KnowledgeEntry {
        category: "Thyroid",
        source: "ATA Thyroid Guidelines",
        content: "TSH above 4.0 mIU/L with normal free T4 indicates subclinical hypothyroidism. TSH above 10 mIU/L typically requires treatment. Symptoms include fatigue, weight gain, cold intolerance, and cognitive changes. Treatment with levothyroxine is standard when TSH is persistently elevated.",
    },
    KnowledgeEntry {
        category: "Iron Studies",
        source: "WHO Iron Deficiency Guidelines",
        content: "Serum iron below 60 ug/dL combined with low ferritin suggests iron deficiency. This is the most common nutritional deficiency worldwide. Iron deficiency anemia presents with fatigue, pallor, and reduced exercise tolerance. Oral iron supplementation is first-line treatment, best absorbed with vitamin C.",
    },
    KnowledgeEntry {
        category: "Vitamins",
        source: "Endocrine Society Guidelines",
        content: "Vitamin D levels below 30 ng/mL indicate insufficiency, and below 20 ng/mL indicate deficiency. Vitamin D deficiency is associated with bone loss, muscle weakness, and increased infection risk. Supplementation with 1000-4000 IU daily is generally recommended for deficiency correction.",
    },
    KnowledgeEntry {
        category: "Vitamins",
        source: "Clinical Nutrition Guidelines",
        content: "Vitamin B12 deficiency (below 200 pg/mL) can cause megaloblastic anemia and neurological symptoms. Common in vegetarians, elderly, and patients with pernicious anemia. Early supplementation prevents irreversible neurological damage. Oral or intramuscular supplementation is effective.",
    },
    KnowledgeEntry {
        category: "General",
        source: "Clinical Interpretation Guidelines",
        content: "When multiple blood parameters are abnormal simultaneously, they often point to interconnected conditions. For example, low hemoglobin with low iron and low ferritin suggests iron-deficiency anemia. Elevated glucose with elevated HbA1c confirms diabetes. Pattern recognition across parameters improves diagnostic accuracy.",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_is_nonempty_and_sourced() {
        assert_eq!(KNOWLEDGE_BASE.len(), 16);
        for entry in KNOWLEDGE_BASE {
            assert!(!entry.content.is_empty());
            assert!(!entry.source.is_empty());
            assert!(!entry.category.is_empty());
        }
    }
}
