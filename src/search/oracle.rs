//! Navigation decision oracle.
//!
//! At every tree-search step an oracle looks at the current node's children
//! and decides whether the answer is there (FOUND), worth descending into
//! (EXPLORE), or absent (NOT_FOUND) — simulating how a person skims a
//! document outline. The production oracle is an LLM; the trait keeps the
//! traversal algorithm independent of any provider SDK, and `KeywordOracle`
//! gives a deterministic rule-based fallback for tests and offline runs.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Oracles may select at most this many children per decision.
pub const MAX_SELECTED_NODES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationAction {
    Found,
    Explore,
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationDecision {
    #[serde(rename = "decision")]
    pub action: NavigationAction,
    #[serde(default)]
    pub selected_node_ids: Vec<String>,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub reasoning: String,
}

impl NavigationDecision {
    pub fn not_found(reasoning: impl Into<String>) -> Self {
        Self {
            action: NavigationAction::NotFound,
            selected_node_ids: Vec::new(),
            confidence: 0.0,
            reasoning: reasoning.into(),
        }
    }

    /// Enforce the contract bounds: at most `MAX_SELECTED_NODES` selections
    /// and confidence in [0, 1].
    pub fn clamped(mut self) -> Self {
        self.selected_node_ids.truncate(MAX_SELECTED_NODES);
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }
}

/// What the oracle sees of each candidate child: title plus a truncated
/// content preview, never the full subtree.
#[derive(Debug, Clone, Serialize)]
pub struct NodePreview {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn decide(
        &self,
        query: &str,
        depth: usize,
        candidates: &[NodePreview],
        path_so_far: &[String],
    ) -> Result<NavigationDecision>;
}

// ---------------------------------------------------------------------------
// Prompt building for LLM-backed oracles
// ---------------------------------------------------------------------------

const DECISION_SYSTEM_PROMPT: &str = r#"You are navigating the outline of a legal document to answer a user query. Given the query and the sections listed below, output a JSON object with exactly these fields:

{"decision":"found|explore|not_found","selected_node_ids":["..."],"confidence":0.0,"reasoning":"..."}

RULES:
- "found": one or more listed sections directly answer the query. Select them (at most 3) and set confidence to how certain you are (0.0-1.0).
- "explore": a listed section likely contains the answer deeper inside. Select the sections worth opening (at most 3).
- "not_found": nothing here is relevant to the query.
- reasoning: one sentence explaining the decision.

Output ONLY the JSON object, nothing else."#;

/// Build the prompt an LLM-backed oracle sends per exploration step.
pub fn build_decision_prompt(
    query: &str,
    depth: usize,
    candidates: &[NodePreview],
    path_so_far: &[String],
) -> String {
    let mut parts = Vec::with_capacity(4);
    parts.push(DECISION_SYSTEM_PROMPT.to_string());

    if !path_so_far.is_empty() {
        parts.push(format!("\nCurrent location: {}", path_so_far.join(" > ")));
    }

    let mut sections = String::new();
    for candidate in candidates {
        match &candidate.preview {
            Some(preview) => {
                sections.push_str(&format!(
                    "- [{}] {}: {}\n",
                    candidate.id, candidate.title, preview
                ));
            }
            None => sections.push_str(&format!("- [{}] {}\n", candidate.id, candidate.title)),
        }
    }
    parts.push(format!("\nSections (depth {}):\n{}", depth, sections));
    parts.push(format!("\nQuery: \"{}\"\nJSON:", query));
    parts.join("\n")
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parse an oracle LLM response into a `NavigationDecision`.
///
/// Handles common LLM quirks: markdown fences, trailing text, partial JSON.
/// Anything unparsable degrades to NOT_FOUND with confidence 0 — a malformed
/// decision abandons one branch, never the whole search.
pub fn parse_decision_response(raw: &str) -> NavigationDecision {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let json_str = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if end > start => &cleaned[start..=end],
        _ => cleaned,
    };

    // Strict parse first
    if let Ok(decision) = serde_json::from_str::<NavigationDecision>(json_str) {
        return decision.clamped();
    }

    // Lenient parse: extract fields manually
    let action = if json_str.contains("\"not_found\"") {
        NavigationAction::NotFound
    } else if json_str.contains("\"found\"") {
        NavigationAction::Found
    } else if json_str.contains("\"explore\"") {
        NavigationAction::Explore
    } else {
        return NavigationDecision::not_found("unparsable oracle response");
    };

    let selected_node_ids = extract_json_array(json_str, "selected_node_ids").unwrap_or_default();
    let confidence = extract_json_number(json_str, "confidence").unwrap_or(0.0);
    let reasoning = extract_json_string(json_str, "reasoning")
        .unwrap_or_else(|| "oracle decision (partial parse)".to_string());

    NavigationDecision {
        action,
        selected_node_ids,
        confidence,
        reasoning,
    }
    .clamped()
}

/// Extract a JSON string field value by scanning for `"field":"value"`.
fn extract_json_string(json: &str, field: &str) -> Option<String> {
    let pattern = format!("\"{}\"", field);
    let pos = json.find(&pattern)?;
    let after_key = &json[pos + pattern.len()..];
    let after_colon = after_key.trim_start().strip_prefix(':')?;
    let trimmed = after_colon.trim_start();

    if !trimmed.starts_with('"') {
        return None;
    }

    let content = &trimmed[1..];
    let mut end = 0;
    let mut escaped = false;
    for (i, ch) in content.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if ch == '"' {
            end = i;
            break;
        }
    }

    if end > 0 {
        Some(content[..end].to_string())
    } else {
        None
    }
}

/// Extract a JSON string array field by scanning for `"field":["v1","v2"]`.
fn extract_json_array(json: &str, field: &str) -> Option<Vec<String>> {
    let pattern = format!("\"{}\"", field);
    let pos = json.find(&pattern)?;
    let after_key = &json[pos + pattern.len()..];
    let after_colon = after_key.trim_start().strip_prefix(':')?.trim_start();

    if !after_colon.starts_with('[') {
        return None;
    }

    let bracket_end = after_colon.find(']')?;
    let arr_str = &after_colon[1..bracket_end];

    let items: Vec<String> = arr_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim().trim_matches('"');
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect();

    Some(items)
}

/// Extract a bare JSON number field by scanning for `"field":0.8`.
fn extract_json_number(json: &str, field: &str) -> Option<f32> {
    let pattern = format!("\"{}\"", field);
    let pos = json.find(&pattern)?;
    let after_key = &json[pos + pattern.len()..];
    let after_colon = after_key.trim_start().strip_prefix(':')?.trim_start();

    let num_str: String = after_colon
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    num_str.parse::<f32>().ok()
}

// ---------------------------------------------------------------------------
// Rule-based oracle
// ---------------------------------------------------------------------------

/// Deterministic oracle scoring candidates by query-term overlap.
///
/// Used when no LLM is available and as the ground truth in tests. A
/// candidate whose title + preview covers at least `found_threshold` of the
/// query terms is FOUND; partial overlap is EXPLORE; zero overlap NOT_FOUND.
pub struct KeywordOracle {
    found_threshold: f32,
}

impl KeywordOracle {
    pub fn new(found_threshold: f32) -> Self {
        Self { found_threshold }
    }

    fn query_terms(query: &str) -> HashSet<String> {
        const STOP_WORDS: &[&str] = &[
            "de", "da", "do", "das", "dos", "a", "o", "as", "os", "e", "em", "no", "na", "um",
            "uma", "para", "com", "que", "qual", "como", "sobre", "por",
        ];
        query
            .to_lowercase()
            .split_whitespace()
            .filter(|w| !STOP_WORDS.contains(w) && w.chars().count() > 1)
            .map(|w| w.to_string())
            .collect()
    }

    fn overlap(candidate: &NodePreview, terms: &HashSet<String>) -> f32 {
        if terms.is_empty() {
            return 0.0;
        }
        let haystack = format!(
            "{} {}",
            candidate.title,
            candidate.preview.as_deref().unwrap_or("")
        )
        .to_lowercase();
        let matched = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
        matched as f32 / terms.len() as f32
    }
}

impl Default for KeywordOracle {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[async_trait]
impl DecisionOracle for KeywordOracle {
    async fn decide(
        &self,
        query: &str,
        _depth: usize,
        candidates: &[NodePreview],
        _path_so_far: &[String],
    ) -> Result<NavigationDecision> {
        let terms = Self::query_terms(query);

        let mut scored: Vec<(f32, &NodePreview)> = candidates
            .iter()
            .map(|c| (Self::overlap(c, &terms), c))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(MAX_SELECTED_NODES);

        if scored.is_empty() {
            return Ok(NavigationDecision::not_found(
                "no candidate shares terms with the query",
            ));
        }

        let best = scored[0].0;
        let selected: Vec<String> = scored.iter().map(|(_, c)| c.id.clone()).collect();

        if best >= self.found_threshold {
            Ok(NavigationDecision {
                action: NavigationAction::Found,
                selected_node_ids: selected,
                confidence: best,
                reasoning: format!("term overlap {:.2} meets found threshold", best),
            }
            .clamped())
        } else {
            Ok(NavigationDecision {
                action: NavigationAction::Explore,
                selected_node_ids: selected,
                confidence: best,
                reasoning: format!("partial term overlap {:.2}, descending", best),
            }
            .clamped())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_json() {
        let raw = r#"{"decision":"found","selected_node_ids":["n1","n2"],"confidence":0.85,"reasoning":"sections match"}"#;
        let decision = parse_decision_response(raw);
        assert_eq!(decision.action, NavigationAction::Found);
        assert_eq!(decision.selected_node_ids, vec!["n1", "n2"]);
        assert!((decision.confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_parse_json_with_fences() {
        let raw = "```json\n{\"decision\":\"explore\",\"selected_node_ids\":[\"n3\"],\"confidence\":0.4,\"reasoning\":\"worth opening\"}\n```";
        let decision = parse_decision_response(raw);
        assert_eq!(decision.action, NavigationAction::Explore);
        assert_eq!(decision.selected_node_ids, vec!["n3"]);
    }

    #[test]
    fn test_parse_json_with_trailing_text() {
        let raw = r#"Sure! {"decision":"not_found","selected_node_ids":[],"confidence":0,"reasoning":"irrelevant"} Let me know."#;
        let decision = parse_decision_response(raw);
        assert_eq!(decision.action, NavigationAction::NotFound);
    }

    #[test]
    fn test_parse_partial_json() {
        let raw = r#"{"decision":"found","selected_node_ids":["a"],"confidence":0.9"#;
        let decision = parse_decision_response(raw);
        assert_eq!(decision.action, NavigationAction::Found);
        assert_eq!(decision.selected_node_ids, vec!["a"]);
        assert!((decision.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_parse_garbage_is_not_found_with_zero_confidence() {
        let decision = parse_decision_response("I cannot answer in that format");
        assert_eq!(decision.action, NavigationAction::NotFound);
        assert_eq!(decision.confidence, 0.0);
    }

    #[test]
    fn test_clamp_selection_and_confidence() {
        let raw = r#"{"decision":"found","selected_node_ids":["a","b","c","d","e"],"confidence":3.5,"reasoning":"over-eager"}"#;
        let decision = parse_decision_response(raw);
        assert_eq!(decision.selected_node_ids.len(), MAX_SELECTED_NODES);
        assert_eq!(decision.confidence, 1.0);
    }

    #[test]
    fn test_prompt_contains_sections_and_path() {
        let candidates = vec![
            NodePreview {
                id: "n1".into(),
                title: "Dispensa de licitacao".into(),
                preview: Some("hipoteses de contratacao direta".into()),
            },
            NodePreview {
                id: "n2".into(),
                title: "Sancoes".into(),
                preview: None,
            },
        ];
        let path = vec!["Lei 14.133".to_string(), "Titulo II".to_string()];
        let prompt = build_decision_prompt("dispensa de licitacao", 2, &candidates, &path);
        assert!(prompt.contains("Lei 14.133 > Titulo II"));
        assert!(prompt.contains("[n1] Dispensa de licitacao"));
        assert!(prompt.contains("depth 2"));
        assert!(prompt.contains("dispensa de licitacao"));
    }

    #[tokio::test]
    async fn test_keyword_oracle_found_on_strong_overlap() {
        let oracle = KeywordOracle::default();
        let candidates = vec![
            NodePreview {
                id: "n1".into(),
                title: "Garantia contratual".into(),
                preview: Some("percentual da garantia exigida".into()),
            },
            NodePreview {
                id: "n2".into(),
                title: "Pagamentos".into(),
                preview: None,
            },
        ];
        let decision = oracle
            .decide("garantia contratual", 0, &candidates, &[])
            .await
            .unwrap();
        assert_eq!(decision.action, NavigationAction::Found);
        assert_eq!(decision.selected_node_ids, vec!["n1"]);
        assert!(decision.confidence >= 0.5);
    }

    #[tokio::test]
    async fn test_keyword_oracle_not_found_on_zero_overlap() {
        let oracle = KeywordOracle::default();
        let candidates = vec![NodePreview {
            id: "n1".into(),
            title: "Sancoes administrativas".into(),
            preview: None,
        }];
        let decision = oracle
            .decide("prazo recursal", 0, &candidates, &[])
            .await
            .unwrap();
        assert_eq!(decision.action, NavigationAction::NotFound);
    }

    #[tokio::test]
    async fn test_keyword_oracle_is_deterministic() {
        let oracle = KeywordOracle::default();
        let candidates = vec![NodePreview {
            id: "n1".into(),
            title: "Prazos de pagamento".into(),
            preview: Some("ate 30 dias".into()),
        }];
        let a = oracle.decide("prazos pagamento", 1, &candidates, &[]).await.unwrap();
        let b = oracle.decide("prazos pagamento", 1, &candidates, &[]).await.unwrap();
        assert_eq!(a.action, b.action);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.selected_node_ids, b.selected_node_ids);
    }
}
