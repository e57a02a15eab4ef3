//! Hybrid search facade.
//!
//! Normalizes whichever raw result the router produced — embedding hits or
//! tree-search results — into a uniform context string plus source list, so
//! downstream consumers (answer generation, citation rendering) never care
//! which retrieval path ran.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::classifier::Complexity;
use crate::router::{RagRouter, RagResult, RetrievalPath, RouteOptions};
use crate::types::{truncate_chars, Source, SourceType};

const SNIPPET_CHARS: usize = 500;
const CONTEXT_EXCERPT_CHARS: usize = 1000;
const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Judicial-body abbreviations and decision markers used to classify tree
/// nodes as jurisprudence.
const JURISPRUDENCE_MARKERS: &[&str] = &[
    "tcu", "stf", "stj", "tst", "trf", "tjsp", "sumula", "súmula", "acordao", "acórdão",
];

/// Legislation markers. "in " catches normative instructions ("IN 65/2021").
const LEGISLATION_MARKERS: &[&str] = &["lei", "decreto", "in "];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridSearchResult {
    /// Concatenated context blocks, "---"-separated; empty when nothing was
    /// retrieved.
    pub context: String,
    pub sources: Vec<Source>,
    pub confidence: f32,
    pub path: RetrievalPath,
    /// Wall-clock time of the whole facade call, normalization included.
    pub latency_ms: u64,
    pub metadata: SearchMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub complexity: Complexity,
    pub classifier_confidence: f32,
    pub result_count: usize,
    /// Latency of the underlying router call alone.
    pub router_latency_ms: u64,
}

pub struct HybridFacade {
    router: Arc<RagRouter>,
}

impl HybridFacade {
    pub fn new(router: Arc<RagRouter>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Arc<RagRouter> {
        &self.router
    }

    pub async fn search(&self, query: &str, options: &RouteOptions) -> HybridSearchResult {
        let start = Instant::now();
        let raw = self.router.route(query, options).await;

        let (context, sources) = match raw.path {
            RetrievalPath::Embeddings => normalize_embeddings(&raw, options.include_content),
            RetrievalPath::PageIndex => normalize_tree_results(&raw),
        };

        HybridSearchResult {
            context,
            confidence: raw.confidence,
            path: raw.path,
            latency_ms: start.elapsed().as_millis() as u64,
            metadata: SearchMetadata {
                complexity: raw.classification.complexity,
                classifier_confidence: raw.classification.confidence,
                result_count: sources.len(),
                router_latency_ms: raw.latency_ms,
            },
            sources,
        }
    }
}

fn normalize_embeddings(raw: &RagResult, include_content: bool) -> (String, Vec<Source>) {
    let hits = raw.embeddings_results.as_deref().unwrap_or_default();

    let sources: Vec<Source> = hits
        .iter()
        .map(|hit| Source {
            id: hit.id.clone(),
            title: hit.title.clone(),
            source_type: SourceType::Legislation,
            reference: hit.reference.clone(),
            score: hit.similarity,
            snippet: include_content.then(|| truncate_chars(&hit.content, SNIPPET_CHARS)),
        })
        .collect();

    let context = hits
        .iter()
        .map(|hit| {
            format!(
                "[{}] {}\n{}",
                hit.reference,
                hit.title,
                truncate_chars(&hit.content, SNIPPET_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    (context, sources)
}

fn normalize_tree_results(raw: &RagResult) -> (String, Vec<Source>) {
    let results = raw.page_index_results.as_deref().unwrap_or_default();

    let mut sources = Vec::new();
    let mut blocks = Vec::new();

    for result in results {
        let reference = result.path.join(" > ");
        let lead_snippet = result
            .relevant_nodes
            .first()
            .and_then(|n| n.content.as_deref())
            .map(|text| truncate_chars(text, SNIPPET_CHARS));

        for node in &result.relevant_nodes {
            sources.push(Source {
                id: result.tree_id.clone(),
                title: node.title.clone(),
                source_type: classify_source(&node.title),
                reference: reference.clone(),
                score: result.confidence,
                snippet: lead_snippet.clone(),
            });

            let mut block = format!("[{}] {}", result.document_name, reference);
            if let Some(content) = node.content.as_deref() {
                block.push('\n');
                block.push_str(&truncate_chars(content, CONTEXT_EXCERPT_CHARS));
            }
            blocks.push(block);
        }
    }

    (blocks.join(CONTEXT_SEPARATOR), sources)
}

/// Title-substring heuristic: judicial markers win over legislation markers,
/// anything else is a plain document.
fn classify_source(title: &str) -> SourceType {
    let lower = title.to_lowercase();
    if JURISPRUDENCE_MARKERS.iter().any(|m| lower.contains(m)) {
        return SourceType::Jurisprudencia;
    }
    if LEGISLATION_MARKERS.iter().any(|m| lower.contains(m)) {
        return SourceType::Legislation;
    }
    SourceType::Document
}
