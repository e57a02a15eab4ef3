//! Embedding search adapter contract.
//!
//! The actual vector store and embedding generation live outside this crate;
//! the router only depends on this call shape. `StaticEmbeddingIndex` is a
//! lightweight term-overlap stand-in for tests and offline benchmarks.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One similarity hit. `similarity` is a cosine-derived score already mapped
/// to [0, 1] by the adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingHit {
    pub id: String,
    pub title: String,
    /// Human-readable locator, e.g. "Lei 14.133/2021, art. 75".
    pub reference: String,
    pub content: String,
    pub similarity: f32,
}

#[async_trait]
pub trait EmbeddingSearch: Send + Sync {
    async fn find_similar(
        &self,
        query: &str,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<EmbeddingHit>>;
}

/// In-memory adapter scoring documents by query-term overlap.
///
/// Not a real vector search; the score is the fraction of query terms found
/// in the entry's title + content, which is enough to exercise routing,
/// normalization and benchmarking deterministically.
#[derive(Default)]
pub struct StaticEmbeddingIndex {
    entries: Vec<EmbeddingHit>,
}

impl StaticEmbeddingIndex {
    pub fn new(entries: Vec<EmbeddingHit>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: EmbeddingHit) {
        self.entries.push(entry);
    }

    fn score(entry: &EmbeddingHit, terms: &HashSet<String>) -> f32 {
        if terms.is_empty() {
            return 0.0;
        }
        let haystack = format!("{} {}", entry.title, entry.content).to_lowercase();
        let matched = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
        matched as f32 / terms.len() as f32
    }
}

#[async_trait]
impl EmbeddingSearch for StaticEmbeddingIndex {
    async fn find_similar(
        &self,
        query: &str,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<EmbeddingHit>> {
        let terms: HashSet<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.chars().count() > 2)
            .map(|w| w.to_string())
            .collect();

        let mut hits: Vec<EmbeddingHit> = self
            .entries
            .iter()
            .map(|e| {
                let mut hit = e.clone();
                hit.similarity = Self::score(e, &terms);
                hit
            })
            .filter(|h| h.similarity >= threshold && h.similarity > 0.0)
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> StaticEmbeddingIndex {
        StaticEmbeddingIndex::new(vec![
            EmbeddingHit {
                id: "e1".into(),
                title: "Tabela de precos de computadores".into(),
                reference: "catalogo-ti".into(),
                content: "notebook desktop computador monitor".into(),
                similarity: 0.0,
            },
            EmbeddingHit {
                id: "e2".into(),
                title: "Mobiliario de escritorio".into(),
                reference: "catalogo-moveis".into(),
                content: "mesa cadeira armario".into(),
                similarity: 0.0,
            },
        ])
    }

    #[tokio::test]
    async fn test_ranks_by_term_overlap() {
        let hits = index()
            .find_similar("preco de computador", 10, 0.0)
            .await
            .unwrap();
        assert_eq!(hits[0].id, "e1");
        assert!(hits[0].similarity > 0.0);
        assert!(hits[0].similarity <= 1.0);
    }

    #[tokio::test]
    async fn test_threshold_and_limit() {
        let hits = index().find_similar("computador", 10, 0.99).await.unwrap();
        assert_eq!(hits.len(), 1);
        let none = index().find_similar("zzz", 10, 0.0).await.unwrap();
        assert!(none.is_empty());
    }
}
