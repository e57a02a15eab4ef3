use serde::{Deserialize, Serialize};

/// A node in a PageIndex-style document tree.
///
/// Trees are owned by the tree store; the search engine only reads them for
/// the duration of a single search and clones the nodes it returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: String,
    pub title: String,
    pub level: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(id: impl Into<String>, title: impl Into<String>, level: usize) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            level,
            content: None,
            children: Vec::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Total number of nodes in this subtree, including self.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }

    /// Maximum depth below this node (0 for a leaf).
    pub fn max_depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.max_depth())
            .max()
            .unwrap_or(0)
    }
}

/// Where a normalized source came from, inferred from node titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Legislation,
    Jurisprudencia,
    Document,
}

/// A normalized retrieval source produced by the hybrid facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub title: String,
    pub source_type: SourceType,
    /// Human-readable locator: embedding reference or tree path joined by " > ".
    pub reference: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Truncate to at most `max` characters without splitting a UTF-8 boundary.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> TreeNode {
        TreeNode::new("root", "Edital", 0).with_children(vec![
            TreeNode::new("a", "Objeto", 1).with_content("fornecimento de bens"),
            TreeNode::new("b", "Habilitacao", 1).with_children(vec![TreeNode::new(
                "b1",
                "Documentos",
                2,
            )]),
        ])
    }

    #[test]
    fn test_node_count_and_depth() {
        let tree = sample_tree();
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.max_depth(), 2);
        assert_eq!(TreeNode::new("x", "leaf", 0).max_depth(), 0);
    }

    #[test]
    fn test_truncate_chars_respects_utf8() {
        let text = "licitação pública";
        let cut = truncate_chars(text, 8);
        assert_eq!(cut, "licitaçã");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_tree_node_deserializes_without_optional_fields() {
        let node: TreeNode =
            serde_json::from_str(r#"{"id":"n1","title":"Secao I","level":1}"#).unwrap();
        assert!(node.content.is_none());
        assert!(node.is_leaf());
    }
}
