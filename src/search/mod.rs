//! Retrieval backends: vector-similarity adapter contract, the decision
//! oracle abstraction, the document tree store, and the reasoning-guided
//! tree search engine.

pub mod embedding;
pub mod oracle;
pub mod tree_search;
pub mod tree_store;

pub use embedding::{EmbeddingHit, EmbeddingSearch, StaticEmbeddingIndex};
pub use oracle::{
    build_decision_prompt, parse_decision_response, DecisionOracle, KeywordOracle,
    NavigationAction, NavigationDecision, NodePreview,
};
pub use tree_search::{strip_content, TreeSearchEngine, TreeSearchOptions, TreeSearchResult};
pub use tree_store::{DocumentTreeStore, StaticTreeStore, StoredTree, TreeStatus};

/// Errors surfaced by the tree-search side of the system.
///
/// Everything else in the retrieval core degrades to empty results instead of
/// failing; these are the few conditions a caller genuinely has to handle.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("tree '{0}' not found")]
    TreeNotFound(String),

    #[error("tree '{tree_id}' is not searchable (status: {status:?})")]
    TreeNotIndexed {
        tree_id: String,
        status: tree_store::TreeStatus,
    },
}
