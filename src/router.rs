//! RAG Router
//!
//! Decides per query whether to answer via embedding similarity search or
//! via reasoning-guided tree navigation, executes the chosen path, and keeps
//! a bounded in-memory log of its decisions for diagnostics.
//!
//! Failures on either path degrade to an empty zero-confidence result; a
//! route() call never propagates an adapter error.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::classifier::{ClassificationResult, Complexity, QueryComplexityClassifier};
use crate::config::{ClassifierConfig, RouterConfig};
use crate::search::{
    EmbeddingHit, EmbeddingSearch, TreeSearchEngine, TreeSearchOptions, TreeSearchResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalPath {
    Embeddings,
    PageIndex,
}

impl std::fmt::Display for RetrievalPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalPath::Embeddings => write!(f, "embeddings"),
            RetrievalPath::PageIndex => write!(f, "pageindex"),
        }
    }
}

/// Per-call routing options.
#[derive(Debug, Clone)]
pub struct RouteOptions {
    /// Highest-precedence path override.
    pub force_path: Option<RetrievalPath>,
    pub limit: Option<usize>,
    pub threshold: Option<f32>,
    /// Trees to search on the pageindex path; falls back to the configured
    /// defaults.
    pub tree_ids: Option<Vec<String>>,
    /// Strip node text from tree results when false.
    pub include_content: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            force_path: None,
            limit: None,
            threshold: None,
            tree_ids: None,
            include_content: true,
        }
    }
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forcing(path: RetrievalPath) -> Self {
        Self {
            force_path: Some(path),
            ..Self::default()
        }
    }
}

/// Raw, path-specific routing outcome. Exactly one result slot is populated,
/// matching `path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResult {
    pub path: RetrievalPath,
    pub classification: ClassificationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeddings_results: Option<Vec<EmbeddingHit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_index_results: Option<Vec<TreeSearchResult>>,
    pub confidence: f32,
    pub latency_ms: u64,
}

/// One logged routing decision. Only a one-way hash of the query is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub query_hash: String,
    pub complexity: Complexity,
    pub path_chosen: RetrievalPath,
    pub latency_ms: u64,
    pub result_count: usize,
    pub confidence: f32,
}

/// Aggregates over the current decision-log contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterStats {
    pub total_decisions: usize,
    pub by_path: HashMap<String, usize>,
    pub by_complexity: HashMap<String, usize>,
    pub avg_latency_ms: f64,
    pub avg_confidence: f64,
}

pub struct RagRouter {
    classifier: QueryComplexityClassifier,
    embeddings: Arc<dyn EmbeddingSearch>,
    tree_search: TreeSearchEngine,
    config: RouterConfig,
    decision_log: Mutex<VecDeque<DecisionLogEntry>>,
}

impl RagRouter {
    pub fn new(
        classifier_config: ClassifierConfig,
        router_config: RouterConfig,
        embeddings: Arc<dyn EmbeddingSearch>,
        tree_search: TreeSearchEngine,
    ) -> Self {
        let capacity = router_config.decision_log_capacity;
        Self {
            classifier: QueryComplexityClassifier::new(classifier_config),
            embeddings,
            tree_search,
            config: router_config,
            decision_log: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn classifier(&self) -> &QueryComplexityClassifier {
        &self.classifier
    }

    /// Classify, pick a path, execute it, log the decision.
    pub async fn route(&self, query: &str, options: &RouteOptions) -> RagResult {
        let start = Instant::now();
        let classification = self.classifier.classify_with_details(query);

        // Precedence: caller override > configured override > classification.
        let path = options
            .force_path
            .or(self.config.force_path)
            .unwrap_or(match classification.complexity {
                Complexity::Simple => RetrievalPath::Embeddings,
                Complexity::Legal | Complexity::Complex => RetrievalPath::PageIndex,
            });

        let limit = options.limit.unwrap_or(self.config.default_limit);
        let threshold = options.threshold.unwrap_or(self.config.default_threshold);

        let mut result = match path {
            RetrievalPath::Embeddings => {
                let hits = match self.embeddings.find_similar(query, limit, threshold).await {
                    Ok(hits) => hits,
                    Err(error) => {
                        tracing::warn!(%error, "embedding search failed, degrading to empty result");
                        Vec::new()
                    }
                };
                let confidence = hits
                    .iter()
                    .map(|h| h.similarity)
                    .fold(0.0f32, f32::max);
                RagResult {
                    path,
                    classification,
                    embeddings_results: Some(hits),
                    page_index_results: None,
                    confidence,
                    latency_ms: 0,
                }
            }
            RetrievalPath::PageIndex => {
                let tree_ids = options
                    .tree_ids
                    .clone()
                    .unwrap_or_else(|| self.config.default_tree_ids.clone());
                let mut tree_options = TreeSearchOptions::new();
                tree_options.max_results = Some(limit);
                tree_options.include_content = options.include_content;
                let results = self
                    .tree_search
                    .search_many(&tree_ids, query, &tree_options)
                    .await;
                let confidence = results
                    .iter()
                    .map(|r| r.confidence)
                    .fold(0.0f32, f32::max);
                RagResult {
                    path,
                    classification,
                    embeddings_results: None,
                    page_index_results: Some(results),
                    confidence,
                    latency_ms: 0,
                }
            }
        };
        result.latency_ms = start.elapsed().as_millis() as u64;

        let result_count = result
            .embeddings_results
            .as_ref()
            .map(|h| h.len())
            .unwrap_or_else(|| {
                result
                    .page_index_results
                    .as_ref()
                    .map(|r| r.iter().map(|t| t.relevant_nodes.len()).sum())
                    .unwrap_or(0)
            });

        tracing::info!(
            path = %result.path,
            complexity = %result.classification.complexity,
            confidence = result.confidence,
            result_count,
            latency_ms = result.latency_ms,
            "routing decision"
        );

        self.log_decision(DecisionLogEntry {
            timestamp: Utc::now(),
            query_hash: hash_query(query),
            complexity: result.classification.complexity,
            path_chosen: result.path,
            latency_ms: result.latency_ms,
            result_count,
            confidence: result.confidence,
        });

        result
    }

    fn log_decision(&self, entry: DecisionLogEntry) {
        let mut log = self.decision_log.lock();
        if log.len() >= self.config.decision_log_capacity {
            log.pop_front();
        }
        log.push_back(entry);
    }

    /// Aggregate counts and means over the logged decisions.
    pub fn stats(&self) -> RouterStats {
        let log = self.decision_log.lock();
        let total = log.len();

        let mut by_path: HashMap<String, usize> = HashMap::new();
        let mut by_complexity: HashMap<String, usize> = HashMap::new();
        let mut latency_sum = 0u64;
        let mut confidence_sum = 0f64;

        for entry in log.iter() {
            *by_path.entry(entry.path_chosen.to_string()).or_insert(0) += 1;
            *by_complexity.entry(entry.complexity.to_string()).or_insert(0) += 1;
            latency_sum += entry.latency_ms;
            confidence_sum += entry.confidence as f64;
        }

        let (avg_latency_ms, avg_confidence) = if total > 0 {
            (latency_sum as f64 / total as f64, confidence_sum / total as f64)
        } else {
            (0.0, 0.0)
        };

        RouterStats {
            total_decisions: total,
            by_path,
            by_complexity,
            avg_latency_ms,
            avg_confidence,
        }
    }

    /// Most recent decisions, newest first.
    pub fn recent_decisions(&self, limit: usize) -> Vec<DecisionLogEntry> {
        let log = self.decision_log.lock();
        log.iter().rev().take(limit).cloned().collect()
    }

    pub fn clear_decision_log(&self) {
        self.decision_log.lock().clear();
    }
}

/// One-way hash of the query text; raw queries never enter the log.
fn hash_query(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}
