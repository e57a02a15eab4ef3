//! Reasoning-guided tree search.
//!
//! Bounded breadth-first traversal of a PageIndex document tree driven by a
//! `DecisionOracle`. The engine owns the bookkeeping — exploration queue,
//! iteration and depth bounds, deduplication, confidence aggregation — while
//! the oracle owns the judgment calls. A failing oracle degrades a single
//! step, never the whole search.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::oracle::{DecisionOracle, NavigationAction, NavigationDecision, NodePreview};
use super::tree_store::{DocumentTreeStore, TreeStatus};
use super::SearchError;
use crate::config::TreeSearchConfig;
use crate::types::{truncate_chars, TreeNode};

/// Per-call overrides for the engine's configured bounds.
#[derive(Debug, Clone)]
pub struct TreeSearchOptions {
    pub max_depth: Option<usize>,
    pub max_iterations: Option<usize>,
    pub max_results: Option<usize>,
    pub min_confidence: Option<f32>,
    /// When false, returned nodes have their text content stripped
    /// recursively; metadata (id, title, level, shape) is kept.
    pub include_content: bool,
}

impl Default for TreeSearchOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_iterations: None,
            max_results: None,
            min_confidence: None,
            include_content: true,
        }
    }
}

impl TreeSearchOptions {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSearchResult {
    pub tree_id: String,
    pub document_name: String,
    /// Deduplicated by node id, in insertion order.
    pub relevant_nodes: Vec<TreeNode>,
    /// Titles of FOUND-selected nodes along the explored route.
    pub path: Vec<String>,
    /// Running maximum over all FOUND decision confidences.
    pub confidence: f32,
    pub reasoning: String,
    pub search_time_ms: u64,
}

pub struct TreeSearchEngine {
    store: Arc<dyn DocumentTreeStore>,
    oracle: Arc<dyn DecisionOracle>,
    config: TreeSearchConfig,
}

impl TreeSearchEngine {
    pub fn new(
        store: Arc<dyn DocumentTreeStore>,
        oracle: Arc<dyn DecisionOracle>,
        config: TreeSearchConfig,
    ) -> Self {
        Self {
            store,
            oracle,
            config,
        }
    }

    /// Search one indexed tree. Refuses trees whose status is not `Indexed`.
    pub async fn search(
        &self,
        tree_id: &str,
        query: &str,
        options: &TreeSearchOptions,
    ) -> Result<TreeSearchResult, SearchError> {
        let start = Instant::now();
        let stored = self.store.load(tree_id).await?;
        if stored.status != TreeStatus::Indexed {
            return Err(SearchError::TreeNotIndexed {
                tree_id: tree_id.to_string(),
                status: stored.status,
            });
        }

        let max_depth = options.max_depth.unwrap_or(self.config.max_depth);
        let max_iterations = options.max_iterations.unwrap_or(self.config.max_iterations);
        let max_results = options.max_results.unwrap_or(self.config.max_results);
        let min_confidence = options.min_confidence.unwrap_or(self.config.min_confidence);

        let root = &stored.root;

        // Single-node tree: the root is the only possible answer.
        if root.children.is_empty() {
            let mut node = root.clone();
            if !options.include_content {
                strip_content(&mut node);
            }
            return Ok(TreeSearchResult {
                tree_id: stored.tree_id,
                document_name: stored.document_name,
                relevant_nodes: vec![node],
                path: vec![root.title.clone()],
                confidence: 1.0,
                reasoning: "single-node tree, returning root".to_string(),
                search_time_ms: start.elapsed().as_millis() as u64,
            });
        }

        // (node, depth, titles along the route) — seeded with the root.
        let mut queue: VecDeque<(&TreeNode, usize, Vec<String>)> = VecDeque::new();
        queue.push_back((root, 0, vec![root.title.clone()]));

        // Each found node carries the confidence in effect when it was added,
        // which is what min_confidence filters at the end.
        let mut found: Vec<(TreeNode, f32)> = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut confidence: f32 = 0.0;
        let mut result_path: Vec<String> = Vec::new();
        let mut reasoning_trail: Vec<String> = Vec::new();
        let mut oracle_calls = 0usize;

        while oracle_calls < max_iterations && found.len() < max_results {
            let Some((node, depth, path)) = queue.pop_front() else {
                break;
            };

            if depth >= max_depth {
                tracing::debug!(node_id = %node.id, depth, "max depth reached, abandoning branch");
                continue;
            }

            if node.children.is_empty() {
                // Leaf reached through exploration. The bare root of a
                // multi-node tree is never a leaf result.
                if depth > 0 && seen_ids.insert(node.id.clone()) {
                    found.push((node.clone(), confidence));
                }
                continue;
            }

            let candidates: Vec<NodePreview> = node
                .children
                .iter()
                .map(|c| NodePreview {
                    id: c.id.clone(),
                    title: c.title.clone(),
                    preview: c
                        .content
                        .as_deref()
                        .map(|text| truncate_chars(text, self.config.preview_chars)),
                })
                .collect();
            let child_by_id: HashMap<&str, &TreeNode> =
                node.children.iter().map(|c| (c.id.as_str(), c)).collect();

            oracle_calls += 1;
            let decision = match self
                .oracle
                .decide(query, depth, &candidates, &path)
                .await
            {
                Ok(decision) => decision.clamped(),
                Err(error) => {
                    // Degraded step: keep exploring the first few children so
                    // one flaky oracle call cannot sink the search.
                    tracing::warn!(
                        tree_id = %stored.tree_id,
                        node_id = %node.id,
                        %error,
                        "oracle call failed, synthesizing fallback explore"
                    );
                    NavigationDecision {
                        action: NavigationAction::Explore,
                        selected_node_ids: node
                            .children
                            .iter()
                            .take(3)
                            .map(|c| c.id.clone())
                            .collect(),
                        confidence: 0.3,
                        reasoning: "degraded decision after oracle failure".to_string(),
                    }
                }
            };

            match decision.action {
                NavigationAction::Found => {
                    for id in &decision.selected_node_ids {
                        if let Some(child) = child_by_id.get(id.as_str()) {
                            if seen_ids.insert(child.id.clone()) {
                                found.push(((*child).clone(), decision.confidence));
                            }
                        }
                    }
                    confidence = confidence.max(decision.confidence);
                    if let Some(last) = decision
                        .selected_node_ids
                        .last()
                        .and_then(|id| child_by_id.get(id.as_str()))
                    {
                        result_path.push(last.title.clone());
                    }
                    if !decision.reasoning.is_empty() {
                        reasoning_trail.push(decision.reasoning);
                    }
                }
                NavigationAction::Explore => {
                    for id in &decision.selected_node_ids {
                        if let Some(child) = child_by_id.get(id.as_str()) {
                            let mut extended = path.clone();
                            extended.push(child.title.clone());
                            queue.push_back((child, depth + 1, extended));
                        }
                    }
                    if !decision.reasoning.is_empty() {
                        reasoning_trail.push(decision.reasoning);
                    }
                }
                NavigationAction::NotFound => {
                    if !decision.reasoning.is_empty() {
                        reasoning_trail.push(decision.reasoning);
                    }
                }
            }
        }

        if found.is_empty() {
            let reasoning = if reasoning_trail.is_empty() {
                "no relevant section located within the search bounds".to_string()
            } else {
                reasoning_trail.join("; ")
            };
            return Ok(TreeSearchResult {
                tree_id: stored.tree_id,
                document_name: stored.document_name,
                relevant_nodes: Vec::new(),
                path: result_path,
                confidence: 0.0,
                reasoning,
                search_time_ms: start.elapsed().as_millis() as u64,
            });
        }

        let mut relevant_nodes: Vec<TreeNode> = found
            .into_iter()
            .filter(|(_, recorded)| *recorded >= min_confidence)
            .map(|(node, _)| node)
            .take(max_results)
            .collect();

        if !options.include_content {
            for node in &mut relevant_nodes {
                strip_content(node);
            }
        }

        tracing::debug!(
            tree_id = %stored.tree_id,
            results = relevant_nodes.len(),
            oracle_calls,
            confidence,
            "tree search finished"
        );

        Ok(TreeSearchResult {
            tree_id: stored.tree_id,
            document_name: stored.document_name,
            relevant_nodes,
            path: result_path,
            confidence,
            reasoning: reasoning_trail.join("; "),
            search_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Search several independently indexed trees concurrently.
    ///
    /// Trees whose search fails are dropped; partial failure never fails the
    /// fan-out. Results come back sorted by descending confidence.
    pub async fn search_many(
        &self,
        tree_ids: &[String],
        query: &str,
        options: &TreeSearchOptions,
    ) -> Vec<TreeSearchResult> {
        let searches = tree_ids.iter().map(|id| self.search(id, query, options));
        let mut results: Vec<TreeSearchResult> = futures::future::join_all(searches)
            .await
            .into_iter()
            .zip(tree_ids)
            .filter_map(|(outcome, tree_id)| match outcome {
                Ok(result) => Some(result),
                Err(error) => {
                    tracing::warn!(%tree_id, %error, "tree skipped in fan-out");
                    None
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results
    }
}

/// Remove text content from a node and its entire subtree, keeping metadata.
pub fn strip_content(node: &mut TreeNode) {
    node.content = None;
    for child in &mut node.children {
        strip_content(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tree_store::{StaticTreeStore, StoredTree};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Oracle that replays a scripted list of decisions in order.
    struct ScriptedOracle {
        script: Mutex<VecDeque<anyhow::Result<NavigationDecision>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedOracle {
        fn new(script: Vec<anyhow::Result<NavigationDecision>>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl DecisionOracle for ScriptedOracle {
        async fn decide(
            &self,
            _query: &str,
            _depth: usize,
            candidates: &[NodePreview],
            _path: &[String],
        ) -> anyhow::Result<NavigationDecision> {
            *self.calls.lock() += 1;
            match self.script.lock().pop_front() {
                Some(entry) => entry,
                // Script exhausted: keep exploring everything.
                None => Ok(NavigationDecision {
                    action: NavigationAction::Explore,
                    selected_node_ids: candidates.iter().map(|c| c.id.clone()).collect(),
                    confidence: 0.2,
                    reasoning: String::new(),
                }),
            }
        }
    }

    fn found(ids: &[&str], confidence: f32) -> anyhow::Result<NavigationDecision> {
        Ok(NavigationDecision {
            action: NavigationAction::Found,
            selected_node_ids: ids.iter().map(|s| s.to_string()).collect(),
            confidence,
            reasoning: format!("selected {}", ids.join(",")),
        })
    }

    fn explore(ids: &[&str]) -> anyhow::Result<NavigationDecision> {
        Ok(NavigationDecision {
            action: NavigationAction::Explore,
            selected_node_ids: ids.iter().map(|s| s.to_string()).collect(),
            confidence: 0.0,
            reasoning: String::new(),
        })
    }

    fn sample_root() -> TreeNode {
        TreeNode::new("root", "Lei 14.133", 0).with_children(vec![
            TreeNode::new("t1", "Titulo I", 1)
                .with_content("disposicoes preliminares")
                .with_children(vec![
                    TreeNode::new("a5", "Art. 5", 2).with_content("principios"),
                    TreeNode::new("a6", "Art. 6", 2).with_content("definicoes"),
                ]),
            TreeNode::new("t2", "Titulo II", 1).with_content("licitacoes"),
        ])
    }

    fn engine_with(
        root: TreeNode,
        oracle: Arc<dyn DecisionOracle>,
        config: TreeSearchConfig,
    ) -> TreeSearchEngine {
        let mut store = StaticTreeStore::new();
        store.insert_indexed("t1", "Lei 14.133/2021", root);
        TreeSearchEngine::new(Arc::new(store), oracle, config)
    }

    #[test]
    fn test_default_options_keep_content() {
        assert!(TreeSearchOptions::default().include_content);
        assert!(TreeSearchOptions::new().include_content);
        let updated = TreeSearchOptions {
            max_results: Some(1),
            ..Default::default()
        };
        assert!(updated.include_content);
    }

    #[tokio::test]
    async fn test_single_node_tree_returns_root() {
        let root = TreeNode::new("only", "Nota Tecnica", 0).with_content("texto");
        let engine = engine_with(root, Arc::new(ScriptedOracle::new(vec![])), TreeSearchConfig::default());
        let result = engine
            .search("t1", "qualquer consulta", &TreeSearchOptions::new())
            .await
            .unwrap();
        assert_eq!(result.relevant_nodes.len(), 1);
        assert_eq!(result.relevant_nodes[0].id, "only");
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.path, vec!["Nota Tecnica"]);
    }

    #[tokio::test]
    async fn test_found_collects_selected_children() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            explore(&["t1"]),
            found(&["a5", "a6"], 0.8),
        ]));
        let engine = engine_with(sample_root(), oracle, TreeSearchConfig::default());
        let result = engine
            .search("t1", "principios e definicoes", &TreeSearchOptions::new())
            .await
            .unwrap();
        let ids: Vec<&str> = result.relevant_nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a5", "a6"]);
        assert!((result.confidence - 0.8).abs() < 1e-6);
        assert_eq!(result.path, vec!["Art. 6"]);
    }

    #[tokio::test]
    async fn test_duplicate_selections_deduplicated() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            found(&["t1", "t1"], 0.6),
        ]));
        let engine = engine_with(sample_root(), oracle, TreeSearchConfig::default());
        let result = engine
            .search("t1", "titulo", &TreeSearchOptions::new())
            .await
            .unwrap();
        assert_eq!(result.relevant_nodes.len(), 1);
    }

    #[tokio::test]
    async fn test_max_iterations_bounds_oracle_calls() {
        // Oracle always explores everything; a wide tree would otherwise
        // produce unbounded calls.
        let oracle = Arc::new(ScriptedOracle::new(vec![]));
        let wide = TreeNode::new("root", "Doc", 0).with_children(
            (0..20)
                .map(|i| {
                    TreeNode::new(format!("n{}", i), format!("Secao {}", i), 1).with_children(
                        vec![TreeNode::new(format!("n{}a", i), "Sub", 2).with_children(vec![
                            TreeNode::new(format!("n{}b", i), "SubSub", 3),
                        ])],
                    )
                })
                .collect(),
        );
        let mut config = TreeSearchConfig::default();
        config.max_iterations = 4;
        config.max_depth = 10;
        let engine = engine_with(wide, oracle.clone(), config);
        engine
            .search("t1", "consulta", &TreeSearchOptions::new())
            .await
            .unwrap();
        assert!(oracle.call_count() <= 4);
    }

    #[tokio::test]
    async fn test_max_results_truncation() {
        let oracle = Arc::new(ScriptedOracle::new(vec![found(&["t1", "t2"], 0.9)]));
        let mut config = TreeSearchConfig::default();
        config.max_results = 1;
        let engine = engine_with(sample_root(), oracle, config);
        let result = engine
            .search("t1", "titulos", &TreeSearchOptions::new())
            .await
            .unwrap();
        assert_eq!(result.relevant_nodes.len(), 1);
    }

    #[tokio::test]
    async fn test_max_depth_abandons_branches() {
        // With max_depth 1, entries enqueued at depth 1 are dequeued and
        // discarded before reaching the oracle.
        let oracle = Arc::new(ScriptedOracle::new(vec![explore(&["t1", "t2"])]));
        let mut config = TreeSearchConfig::default();
        config.max_depth = 1;
        let engine = engine_with(sample_root(), oracle.clone(), config);
        let result = engine
            .search("t1", "consulta", &TreeSearchOptions::new())
            .await
            .unwrap();
        assert!(result.relevant_nodes.is_empty());
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn test_leaf_found_via_exploration() {
        let oracle = Arc::new(ScriptedOracle::new(vec![explore(&["t2"])]));
        let engine = engine_with(sample_root(), oracle, TreeSearchConfig::default());
        let result = engine
            .search("t1", "licitacoes", &TreeSearchOptions::new())
            .await
            .unwrap();
        assert_eq!(result.relevant_nodes.len(), 1);
        assert_eq!(result.relevant_nodes[0].id, "t2");
        // No FOUND decision ever fired.
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_oracle_failure_degrades_to_explore() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Err(anyhow!("llm timeout")),
            found(&["a5"], 0.7),
        ]));
        let engine = engine_with(sample_root(), oracle, TreeSearchConfig::default());
        let result = engine
            .search("t1", "principios", &TreeSearchOptions::new())
            .await
            .unwrap();
        // Fallback explored t1 (and the leaf t2); the scripted FOUND then
        // fired on t1's children.
        assert!(result.relevant_nodes.iter().any(|n| n.id == "a5"));
        assert!((result.confidence - 0.7).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_empty_search_has_reasoning() {
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(NavigationDecision::not_found(
            "nenhuma secao relevante",
        ))]));
        let engine = engine_with(sample_root(), oracle, TreeSearchConfig::default());
        let result = engine
            .search("t1", "tema ausente", &TreeSearchOptions::new())
            .await
            .unwrap();
        assert!(result.relevant_nodes.is_empty());
        assert_eq!(result.confidence, 0.0);
        assert!(result.reasoning.contains("nenhuma secao relevante"));
    }

    #[tokio::test]
    async fn test_min_confidence_filters_results() {
        let oracle = Arc::new(ScriptedOracle::new(vec![found(&["t1"], 0.2)]));
        let mut config = TreeSearchConfig::default();
        config.min_confidence = 0.5;
        config.max_iterations = 1;
        let engine = engine_with(sample_root(), oracle, config);
        let result = engine
            .search("t1", "titulo", &TreeSearchOptions::new())
            .await
            .unwrap();
        assert!(result.relevant_nodes.is_empty());
    }

    #[tokio::test]
    async fn test_strip_content_is_recursive() {
        let oracle = Arc::new(ScriptedOracle::new(vec![found(&["t1"], 0.9)]));
        let engine = engine_with(sample_root(), oracle, TreeSearchConfig::default());
        let mut options = TreeSearchOptions::new();
        options.include_content = false;
        let result = engine.search("t1", "titulo", &options).await.unwrap();

        fn assert_no_content(node: &TreeNode) {
            assert!(node.content.is_none(), "content left on {}", node.id);
            for child in &node.children {
                assert_no_content(child);
            }
        }
        for node in &result.relevant_nodes {
            assert_no_content(node);
            assert!(!node.title.is_empty());
        }
    }

    #[tokio::test]
    async fn test_refuses_unindexed_tree() {
        let mut store = StaticTreeStore::new();
        store.insert(StoredTree {
            tree_id: "pending".into(),
            document_name: "Edital".into(),
            status: TreeStatus::Processing,
            root: TreeNode::new("r", "Edital", 0),
        });
        let engine = TreeSearchEngine::new(
            Arc::new(store),
            Arc::new(ScriptedOracle::new(vec![])),
            TreeSearchConfig::default(),
        );
        let err = engine
            .search("pending", "consulta", &TreeSearchOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::TreeNotIndexed { .. }));
    }

    #[tokio::test]
    async fn test_fan_out_survives_partial_failure() {
        let mut store = StaticTreeStore::new();
        store.insert_indexed("ok", "Lei 14.133", sample_root());
        store.insert(StoredTree {
            tree_id: "broken".into(),
            document_name: "Edital".into(),
            status: TreeStatus::Failed,
            root: TreeNode::new("r", "Edital", 0),
        });
        let engine = TreeSearchEngine::new(
            Arc::new(store),
            Arc::new(ScriptedOracle::new(vec![found(&["t2"], 0.9)])),
            TreeSearchConfig::default(),
        );
        let ids = vec!["broken".to_string(), "ok".to_string(), "missing".to_string()];
        let results = engine
            .search_many(&ids, "licitacoes", &TreeSearchOptions::new())
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tree_id, "ok");
    }

    #[tokio::test]
    async fn test_fan_out_sorts_by_confidence() {
        let mut store = StaticTreeStore::new();
        store.insert_indexed("low", "Doc A", sample_root());
        store.insert_indexed("high", "Doc B", sample_root());
        let engine = TreeSearchEngine::new(
            Arc::new(store),
            Arc::new(ScriptedOracle::new(vec![
                found(&["t2"], 0.3),
                found(&["t2"], 0.9),
            ])),
            TreeSearchConfig::default(),
        );
        let ids = vec!["low".to_string(), "high".to_string()];
        let results = engine
            .search_many(&ids, "licitacoes", &TreeSearchOptions::new())
            .await;
        assert_eq!(results.len(), 2);
        assert!(results[0].confidence >= results[1].confidence);
    }
}
