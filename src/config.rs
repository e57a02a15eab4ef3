use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::router::RetrievalPath;

/// Top-level configuration for the retrieval router and its collaborators.
///
/// Immutable after construction: components receive their section by value at
/// build time, so independently configured instances can coexist (e.g. in
/// tests).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagConfig {
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub tree_search: TreeSearchConfig,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Character length at which a query may be considered complex.
    pub complexity_threshold: usize,
    /// Character length at which a query is always complex.
    pub high_complexity_threshold: usize,
    /// Minimum number of matched legal keywords for the legal label.
    pub legal_keyword_threshold: usize,
    /// Substring-matched keyword list. Defaults cover Brazilian procurement
    /// law; callers may extend it.
    pub legal_keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            complexity_threshold: 50,
            high_complexity_threshold: 100,
            legal_keyword_threshold: 1,
            legal_keywords: default_legal_keywords(),
        }
    }
}

/// Default legal keyword set, matched as substrings of the lowercased query.
/// Accented and plain spellings are both present since user input varies.
pub fn default_legal_keywords() -> Vec<String> {
    [
        "lei",
        "artigo",
        "decreto",
        "inciso",
        "paragrafo",
        "parágrafo",
        "sumula",
        "súmula",
        "acordao",
        "acórdão",
        "jurisprudencia",
        "jurisprudência",
        "licitacao",
        "licitação",
        "pregao",
        "pregão",
        "edital",
        "portaria",
        "resolucao",
        "resolução",
        "instrucao normativa",
        "instrução normativa",
        "medida provisoria",
        "constituicao",
        "constituição",
        "14133",
        "8666",
        "tcu",
        "stf",
        "stj",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Testing override: when set, every route() call uses this path unless
    /// the caller forces one explicitly.
    pub force_path: Option<RetrievalPath>,
    /// Ring-buffer capacity for the decision log.
    pub decision_log_capacity: usize,
    /// Default result limit passed to adapters.
    pub default_limit: usize,
    /// Default similarity threshold for the embeddings adapter.
    pub default_threshold: f32,
    /// Trees searched on the pageindex path when the caller names none.
    pub default_tree_ids: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            force_path: None,
            decision_log_capacity: 1000,
            default_limit: 10,
            default_threshold: 0.3,
            default_tree_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSearchConfig {
    pub max_depth: usize,
    /// Upper bound on oracle calls per search.
    pub max_iterations: usize,
    pub max_results: usize,
    /// Results recorded below this running confidence are dropped.
    pub min_confidence: f32,
    /// Characters of node content shown to the oracle per candidate.
    pub preview_chars: usize,
}

impl Default for TreeSearchConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_iterations: 25,
            max_results: 10,
            min_confidence: 0.0,
            preview_chars: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Per-(query, path) timeout raced against the real call.
    pub query_timeout_ms: u64,
    /// Warm-up queries run before measurement (errors ignored).
    pub warmup_queries: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: 30_000,
            warmup_queries: 0,
        }
    }
}

impl RagConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.classifier.complexity_threshold == 0 {
            return Err("classifier.complexity_threshold must be > 0".into());
        }
        if self.classifier.high_complexity_threshold < self.classifier.complexity_threshold {
            return Err(
                "classifier.high_complexity_threshold must be >= complexity_threshold".into(),
            );
        }
        if self.classifier.legal_keyword_threshold == 0 {
            return Err("classifier.legal_keyword_threshold must be > 0".into());
        }
        if self.router.decision_log_capacity == 0 {
            return Err("router.decision_log_capacity must be > 0".into());
        }
        if self.router.default_limit == 0 {
            return Err("router.default_limit must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.router.default_threshold) {
            return Err("router.default_threshold must be in [0.0, 1.0]".into());
        }
        if self.tree_search.max_depth == 0
            || self.tree_search.max_iterations == 0
            || self.tree_search.max_results == 0
        {
            return Err("tree_search bounds must all be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.tree_search.min_confidence) {
            return Err("tree_search.min_confidence must be in [0.0, 1.0]".into());
        }
        if self.benchmark.query_timeout_ms == 0 {
            return Err("benchmark.query_timeout_ms must be > 0".into());
        }
        Ok(())
    }

    /// Load config from a JSON file, falling back to defaults for missing fields.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RagConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_log_capacity() {
        let mut config = RagConfig::default();
        config.router.decision_log_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_inverted_thresholds() {
        let mut config = RagConfig::default();
        config.classifier.complexity_threshold = 200;
        config.classifier.high_complexity_threshold = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RagConfig =
            serde_json::from_str(r#"{"router":{"decision_log_capacity":5,"default_limit":3,"default_threshold":0.5,"default_tree_ids":[],"force_path":null}}"#)
                .unwrap();
        assert_eq!(config.router.decision_log_capacity, 5);
        assert_eq!(config.classifier.complexity_threshold, 50);
    }

    #[test]
    fn test_default_keywords_cover_procurement_law() {
        let keywords = default_legal_keywords();
        assert!(keywords.iter().any(|k| k == "lei"));
        assert!(keywords.iter().any(|k| k == "14133"));
        assert!(keywords.iter().any(|k| k == "sumula"));
    }
}
