//! Lookup table for the deterministic extraction pass.
//!
//! Maps lowercase test-name synonyms to their conventional unit, reference
//! range, and category. Order matters: synonyms are tried per line in table
//! order, and the first match per synonym per document wins.

/// Unit, reference range, and category for one test-name synonym.
#[derive(Debug, Clone, Copy)]
pub struct TestInfo {
    pub unit: &'static str,
    pub reference_range: &'static str,
    pub category: &'static str,
}

pub const COMMON_TESTS: &[(&str, TestInfo)] = &[
    // Hematology / CBC
    ("hemoglobin", TestInfo { unit: "g/dL", reference_range: "12.0-17.5", category: "Hematology" }),
    ("hgb", TestInfo { unit: "g/dL", reference_range: "12.0-17.5", category: "Hematology" }),
    ("hematocrit", TestInfo { unit: "%", reference_range: "36-51", category: "Hematology" }),
    ("hct", TestInfo { unit: "%", reference_range: "36-51", category: "Hematology" }),
    ("rbc", TestInfo { unit: "M/uL", reference_range: "4.0-5.5", category: "Hematology" }),
    ("red blood cell", TestInfo { unit: "M/uL", reference_range: "4.0-5.5", category: "Hematology" }),
    ("wbc", TestInfo { unit: "K/uL", reference_range: "4.5-11.0", category: "Hematology" }),
    ("white blood cell", TestInfo { unit: "K/uL", reference_range: "4.5-11.0", category: "Hematology" }),
    ("platelet", TestInfo { unit: "K/uL", reference_range: "150-400", category: "Hematology" }),
    ("plt", TestInfo { unit: "K/uL", reference_range: "150-400", category: "Hematology" }),
    ("mcv", TestInfo { unit: "fL", reference_range: "80-100", category: "Hematology" }),
    ("mch", TestInfo { unit: "pg", reference_range: "27-31", category: "Hematology" }),
    ("mchc", TestInfo { unit: "g/dL", reference_range: "32-36", category: "Hematology" }),
    ("esr", TestInfo { unit: "mm/hr", reference_range: "0-20", category: "Hematology" }),
    // Metabolic panel
    ("glucose", TestInfo { unit: "mg/dL", reference_range: "70-100", category: "Metabolic" }),
    ("fasting glucose", TestInfo { unit: "mg/dL", reference_range: "70-100", category: "Metabolic" }),
    ("blood sugar", TestInfo { unit: "mg/dL", reference_range: "70-100", category: "Metabolic" }),
    ("hba1c", TestInfo { unit: "%", reference_range: "4.0-5.6", category: "Metabolic" }),
    ("glycated hemoglobin", TestInfo { unit: "%", reference_range: "4.0-5.6", category: "Metabolic" }),
    // Kidney
    ("creatinine", TestInfo { unit: "mg/dL", reference_range: "0.7-1.3", category: "Kidney" }),
    ("bun", TestInfo { unit: "mg/dL", reference_range: "7-20", category: "Kidney" }),
    ("blood urea nitrogen", TestInfo { unit: "mg/dL", reference_range: "7-20", category: "Kidney" }),
    ("urea", TestInfo { unit: "mg/dL", reference_range: "15-40", category: "Kidney" }),
    ("uric acid", TestInfo { unit: "mg/dL", reference_range: "3.5-7.2", category: "Kidney" }),
    // Electrolytes
    ("sodium", TestInfo { unit: "mEq/L", reference_range: "136-145", category: "Electrolytes" }),
    ("potassium", TestInfo { unit: "mEq/L", reference_range: "3.5-5.0", category: "Electrolytes" }),
    ("chloride", TestInfo { unit: "mEq/L", reference_range: "98-106", category: "Electrolytes" }),
    ("calcium", TestInfo { unit: "mg/dL", reference_range: "8.5-10.5", category: "Electrolytes" }),
    // Lipid panel
    ("total cholesterol", TestInfo { unit: "mg/dL", reference_range: "<200", category: "Lipid" }),
    ("cholesterol", TestInfo { unit: "mg/dL", reference_range: "<200", category: "Lipid" }),
    ("hdl", TestInfo { unit: "mg/dL", reference_range: ">40", category: "Lipid" }),
    ("ldl", TestInfo { unit: "mg/dL", reference_range: "<100", category: "Lipid" }),
    ("triglycerides", TestInfo { unit: "mg/dL", reference_range: "<150", category: "Lipid" }),
    ("vldl", TestInfo { unit: "mg/dL", reference_range: "5-40", category: "Lipid" }),
    // Liver function
    ("sgot", TestInfo { unit: "U/L", reference_range: "10-40", category: "Liver" }),
    ("ast", TestInfo { unit: "U/L", reference_range: "10-40", category: "Liver" }),
    ("sgpt", TestInfo { unit: "U/L", reference_range: "7-56", category: "Liver" }),
    ("alt", TestInfo { unit: "U/L", reference_range: "7-56", category: "Liver" }),
    ("alkaline phosphatase", TestInfo { unit: "U/L", reference_range: "44-147", category: "Liver" }),
    ("alp", TestInfo { unit: "U/L", reference_range: "44-147", category: "Liver" }),
    ("total bilirubin", TestInfo { unit: "mg/dL", reference_range: "0.1-1.2", category: "Liver" }),
    ("bilirubin", TestInfo { unit: "mg/dL", reference_range: "0.1-1.2", category: "Liver" }),
    ("direct bilirubin", TestInfo { unit: "mg/dL", reference_range: "0.0-0.3", category: "Liver" }),
    ("albumin", TestInfo { unit: "g/dL", reference_range: "3.5-5.5", category: "Liver" }),
    ("total protein", TestInfo { unit: "g/dL", reference_range: "6.0-8.3", category: "Liver" }),
    ("ggt", TestInfo { unit: "U/L", reference_range: "9-48", category: "Liver" }),
    // Thyroid
    ("tsh", TestInfo { unit: "mIU/L", reference_range: "0.4-4.0", category: "Thyroid" }),
    ("t3", TestInfo { unit: "ng/dL", reference_range: "80-200", category: "Thyroid" }),
    ("t4", TestInfo { unit: "ug/dL", reference_range: "5.0-12.0", category: "Thyroid" }),
    ("free t3", TestInfo { unit: "pg/mL", reference_range: "2.0-4.4", category: "Thyroid" }),
    ("free t4", TestInfo { unit: "ng/dL", reference_range: "0.8-1.8", category: "Thyroid" }),
    // Iron studies
    ("iron", TestInfo { unit: "ug/dL", reference_range: "60-170", category: "Iron Studies" }),
    ("ferritin", TestInfo { unit: "ng/mL", reference_range: "12-300", category: "Iron Studies" }),
    ("tibc", TestInfo { unit: "ug/dL", reference_range: "250-370", category: "Iron Studies" }),
    // Vitamins
    ("vitamin d", TestInfo { unit: "ng/mL", reference_range: "30-100", category: "Vitamins" }),
    ("vitamin b12", TestInfo { unit: "pg/mL", reference_range: "200-900", category: "Vitamins" }),
    ("folate", TestInfo { unit: "ng/mL", reference_range: "2.7-17.0", category: "Vitamins" }),
    ("folic acid", TestInfo { unit: "ng/mL", reference_range: "2.7-17.0", category: "Vitamins" }),
];

/// Display form of a synonym: short codes uppercase ("WBC"), everything
/// else title-cased ("Uric Acid").
pub fn display_name(synonym: &str) -> String {
    if synonym.len() <= 4 {
        return synonym.to_uppercase();
    }
    synonym
        .split_whitespace()
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
