//! Evidence retrieval for abnormal findings.
//!
//! Builds one query per abnormal finding, gathers the top matches from the
//! injected search index, then merges, deduplicates, and ranks the pool.

pub mod index;
pub mod knowledge;

use std::collections::HashSet;

use crate::models::{EvidenceItem, Finding, FindingStatus};

pub use index::{EvidenceSearch, KeywordSearch, SemanticIndex};

/// Matches fetched per finding before the merged pool is ranked.
const PER_FINDING_LIMIT: usize = 3;

/// Content prefix length used for deduplication across findings.
const DEDUPE_PREFIX_CHARS: usize = 100;

pub struct EvidenceRetriever {
    search: Box<dyn EvidenceSearch>,
    top_k: usize,
}

impl EvidenceRetriever {
    pub fn new(search: Box<dyn EvidenceSearch>, top_k: usize) -> Self {
        Self { search, top_k }
    }

    /// Retrieves supporting evidence for the abnormal subset of `findings`.
    ///
    /// Normal findings never generate queries; an all-normal input returns
    /// an empty list without touching the index.
    pub fn retrieve(&self, findings: &[Finding]) -> Vec<EvidenceItem> {
        let abnormal: Vec<&Finding> = findings
            .iter()
            .filter(|f| f.status.is_abnormal())
            .collect();
        if abnormal.is_empty() {
            return Vec::new();
        }

        let mut pool: Vec<EvidenceItem> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for finding in &abnormal {
            let query = build_query(finding);
            for item in self.search.search(&query, PER_FINDING_LIMIT) {
                let key: String = item.content.chars().take(DEDUPE_PREFIX_CHARS).collect();
                if seen.insert(key) {
                    pool.push(item);
                }
            }
        }

        pool.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        pool.truncate(self.top_k);

        tracing::debug!(
            abnormal = abnormal.len(),
            evidence = pool.len(),
            "evidence retrieval complete"
        );
        pool
    }
}

fn build_query(finding: &Finding) -> String {
    let qualifier = match finding.status {
        FindingStatus::Low => "low",
        _ => "elevated",
    };
    format!(
        "{} {} {} {} clinical significance",
        finding.test_name, qualifier, finding.value, finding.unit
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(name: &str, value: &str, status: FindingStatus) -> Finding {
        Finding {
            test_name: name.to_string(),
            value: value.to_string(),
            unit: "g/dL".to_string(),
            reference_range: "12.0-17.5".to_string(),
            status,
            category: "Hematology".to_string(),
            confidence: 0.85,
        }
    }

    struct CannedSearch {
        items: Vec<EvidenceItem>,
    }

    impl EvidenceSearch for CannedSearch {
        fn search(&self, _query: &str, limit: usize) -> Vec<EvidenceItem> {
            self.items.iter().take(limit).cloned().collect()
        }
    }

    fn item(content: &str, relevance: f32) -> EvidenceItem {
        EvidenceItem {
            content: content.to_string(),
            source: "Test Source".to_string(),
            category: "General".to_string(),
            relevance,
        }
    }

    #[test]
    fn normal_findings_short_circuit() {
        struct PanicSearch;
        impl EvidenceSearch for PanicSearch {
            fn search(&self, _: &str, _: usize) -> Vec<EvidenceItem> {
                panic!("index must not be queried for normal findings");
            }
        }
        let retriever = EvidenceRetriever::new(Box::new(PanicSearch), 5);
        let findings = vec![finding("Hemoglobin", "14.0", FindingStatus::Normal)];
        assert!(retriever.retrieve(&findings).is_empty());
    }

    #[test]
    fn query_qualifier_tracks_status() {
        let low = finding("Hemoglobin", "11.2", FindingStatus::Low);
        assert_eq!(
            build_query(&low),
            "Hemoglobin low 11.2 g/dL clinical significance"
        );
        let high = finding("Glucose", "130", FindingStatus::High);
        assert!(build_query(&high).contains("elevated"));
        let critical = finding("Glucose", "250", FindingStatus::Critical);
        assert!(build_query(&critical).contains("elevated"));
    }

    #[test]
    fn dedupes_by_content_prefix_and_ranks() {
        let shared = "x".repeat(120);
        let retriever = EvidenceRetriever::new(
            Box::new(CannedSearch {
                items: vec![item(&shared, 0.6), item("unique snippet", 0.9)],
            }),
            5,
        );
        let findings = vec![
            finding("Hemoglobin", "11.2", FindingStatus::Low),
            finding("Glucose", "130", FindingStatus::High),
        ];
        let results = retriever.retrieve(&findings);
        // Both findings return the same pair; the shared-prefix item survives once.
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].relevance, 0.9);
        assert_eq!(results[1].relevance, 0.6);
    }

    #[test]
    fn truncates_to_top_k() {
        let items: Vec<EvidenceItem> = (0..3)
            .map(|i| item(&format!("snippet {i}"), 0.5 + i as f32 * 0.1))
            .collect();
        let retriever = EvidenceRetriever::new(Box::new(CannedSearch { items }), 2);
        let findings = vec![finding("Hemoglobin", "11.2", FindingStatus::Low)];
        let results = retriever.retrieve(&findings);
        assert_eq!(results.len(), 2);
        assert!(results[0].relevance >= results[1].relevance);
    }

    #[test]
    fn end_to_end_against_corpus() {
        let retriever = EvidenceRetriever::new(Box::new(SemanticIndex::open()), 5);
        let findings = vec![finding("Hemoglobin", "11.2", FindingStatus::Low)];
        let results = retriever.retrieve(&findings);
        assert!(!results.is_empty());
        assert!(results.len() <= 5);
    }
}
