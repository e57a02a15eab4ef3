//! Document tree store contract.
//!
//! Trees are built and persisted elsewhere (the PageIndex ingestion
//! pipeline); the search engine only loads them read-only and checks their
//! indexing status. `StaticTreeStore` is the in-memory implementation used by
//! tests and offline benchmarks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::SearchError;
use crate::types::TreeNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeStatus {
    Pending,
    Processing,
    Indexed,
    Failed,
}

/// A persisted document tree plus the metadata the facade needs to render
/// context blocks without a second store round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTree {
    pub tree_id: String,
    pub document_name: String,
    pub status: TreeStatus,
    pub root: TreeNode,
}

#[async_trait]
pub trait DocumentTreeStore: Send + Sync {
    /// Load a tree by id. Status is returned as-is; refusing to search
    /// non-indexed trees is the engine's responsibility.
    async fn load(&self, tree_id: &str) -> Result<StoredTree, SearchError>;
}

#[derive(Default)]
pub struct StaticTreeStore {
    trees: HashMap<String, StoredTree>,
}

impl StaticTreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tree: StoredTree) {
        self.trees.insert(tree.tree_id.clone(), tree);
    }

    /// Convenience for registering an already-indexed tree.
    pub fn insert_indexed(
        &mut self,
        tree_id: impl Into<String>,
        document_name: impl Into<String>,
        root: TreeNode,
    ) {
        let tree_id = tree_id.into();
        self.insert(StoredTree {
            tree_id: tree_id.clone(),
            document_name: document_name.into(),
            status: TreeStatus::Indexed,
            root,
        });
    }
}

#[async_trait]
impl DocumentTreeStore for StaticTreeStore {
    async fn load(&self, tree_id: &str) -> Result<StoredTree, SearchError> {
        self.trees
            .get(tree_id)
            .cloned()
            .ok_or_else(|| SearchError::TreeNotFound(tree_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_round_trip() {
        let mut store = StaticTreeStore::new();
        store.insert_indexed("t1", "Lei 14.133", TreeNode::new("root", "Lei 14.133", 0));
        let tree = store.load("t1").await.unwrap();
        assert_eq!(tree.document_name, "Lei 14.133");
        assert_eq!(tree.status, TreeStatus::Indexed);
    }

    #[tokio::test]
    async fn test_missing_tree_errors() {
        let store = StaticTreeStore::new();
        let err = store.load("nope").await.unwrap_err();
        assert!(matches!(err, SearchError::TreeNotFound(_)));
    }
}
