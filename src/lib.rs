//! Hybrid retrieval router for Brazilian procurement documents.
//!
//! A deterministic classifier labels each query simple, complex or legal and
//! routes it to the cheap embeddings path or to a reasoning-guided search over
//! hierarchical document trees driven by an external decision oracle. The
//! [`HybridFacade`] normalizes both outcomes into one context-plus-sources
//! shape, and the [`bench`] module measures the paths against a built-in
//! corpus.

pub mod bench;
pub mod classifier;
pub mod config;
pub mod hybrid;
pub mod router;
pub mod search;
pub mod types;

// Re-export primary types for convenience
pub use classifier::{ClassificationResult, Complexity, QueryComplexityClassifier, QueryFeatures};
pub use config::{
    default_legal_keywords, BenchmarkConfig, ClassifierConfig, RagConfig, RouterConfig,
    TreeSearchConfig,
};
pub use hybrid::{HybridFacade, HybridSearchResult, SearchMetadata};
pub use router::{
    DecisionLogEntry, RagResult, RagRouter, RetrievalPath, RouteOptions, RouterStats,
};
pub use search::{
    strip_content, DecisionOracle, DocumentTreeStore, EmbeddingHit, EmbeddingSearch,
    KeywordOracle, NavigationAction, NavigationDecision, NodePreview, SearchError,
    StaticEmbeddingIndex, StaticTreeStore, StoredTree, TreeSearchEngine, TreeSearchOptions,
    TreeSearchResult, TreeStatus,
};
pub use types::{Source, SourceType, TreeNode};

pub use bench::{
    format_report, BenchPath, BenchmarkHarness, BenchmarkOptions, BenchmarkResult, QueryType,
};

// Re-export common types
pub use anyhow::{Error, Result};
