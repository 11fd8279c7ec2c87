//! Semantic evidence index.
//!
//! `SemanticIndex` scores corpus entries by token overlap with the query.
//! It is seeded once from [`KNOWLEDGE_BASE`] and is safe to share across
//! concurrent readers since it is never mutated after construction.

use std::collections::HashSet;

use super::knowledge::{KnowledgeEntry, FALLBACK_RELEVANCE, KNOWLEDGE_BASE};
use crate::models::EvidenceItem;

/// Minimum token length considered meaningful for overlap scoring.
const MIN_TOKEN_LEN: usize = 3;

/// Search seam over the evidence corpus.
pub trait EvidenceSearch: Send + Sync {
    /// Returns up to `limit` evidence items ranked by relevance descending.
    fn search(&self, query: &str, limit: usize) -> Vec<EvidenceItem>;
}

struct IndexedEntry {
    entry: &'static KnowledgeEntry,
    tokens: HashSet<String>,
}

/// Token-overlap index over the curated corpus.
pub struct SemanticIndex {
    entries: Vec<IndexedEntry>,
}

impl SemanticIndex {
    pub fn open() -> Self {
        let entries = KNOWLEDGE_BASE
            .iter()
            .map(|entry| IndexedEntry {
                entry,
                tokens: tokenize(entry.content),
            })
            .collect();
        Self { entries }
    }
}

impl Default for SemanticIndex {
    fn default() -> Self {
        Self::open()
    }
}

impl EvidenceSearch for SemanticIndex {
    fn search(&self, query: &str, limit: usize) -> Vec<EvidenceItem> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(f32, &'static KnowledgeEntry)> = self
            .entries
            .iter()
            .filter_map(|indexed| {
                let overlap = indexed.tokens.intersection(&query_tokens).count();
                if overlap == 0 {
                    return None;
                }
                let score = overlap as f32 / query_tokens.len() as f32;
                Some((score.min(1.0), indexed.entry))
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(limit)
            .map(|(score, entry)| EvidenceItem {
                content: entry.content.to_string(),
                source: entry.source.to_string(),
                category: entry.category.to_string(),
                relevance: score,
            })
            .collect()
    }
}

/// Substring fallback used when no semantic index is configured.
pub struct KeywordSearch;

impl EvidenceSearch for KeywordSearch {
    fn search(&self, query: &str, limit: usize) -> Vec<EvidenceItem> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }
        KNOWLEDGE_BASE
            .iter()
            .filter(|entry| {
                let content = entry.content.to_lowercase();
                query_tokens.iter().any(|token| content.contains(token))
            })
            .take(limit)
            .map(|entry| EvidenceItem {
                content: entry.content.to_string(),
                source: entry.source.to_string(),
                category: entry.category.to_string(),
                relevance: FALLBACK_RELEVANCE,
            })
            .collect()
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '.')
        .filter(|token| token.len() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}
