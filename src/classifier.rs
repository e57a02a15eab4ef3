//! Query Complexity Classifier
//!
//! Pure, deterministic function of query text + configuration. Decides which
//! retrieval path a query deserves: short lookups go to embeddings, long or
//! entity-heavy queries and anything citing legislation goes to the
//! reasoning-guided tree search.
//!
//! Rules fire in priority order; the first match wins, and the legal-keyword
//! rule always outranks the length-based ones.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::config::ClassifierConfig;

static NUMERIC_TOKEN_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\d{2,}").expect("numeric token regex is valid"));

/// Complexity label driving path selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Complex,
    Legal,
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Complexity::Simple => write!(f, "simple"),
            Complexity::Complex => write!(f, "complex"),
            Complexity::Legal => write!(f, "legal"),
        }
    }
}

/// Feature trace extracted from the normalized query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryFeatures {
    /// Character length of the trimmed query.
    pub length: usize,
    pub word_count: usize,
    /// Configured legal keywords found as substrings, deduplicated.
    pub legal_keywords_found: Vec<String>,
    /// At least one numeric token of two or more digits.
    pub has_numbers: bool,
    /// Two or more numeric tokens, or ten or more words.
    pub has_multiple_entities: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub complexity: Complexity,
    pub confidence: f32,
    /// Which rule fired and the feature values that triggered it.
    pub reason: String,
    pub features: QueryFeatures,
}

pub struct QueryComplexityClassifier {
    config: ClassifierConfig,
}

impl QueryComplexityClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, query: &str) -> Complexity {
        self.classify_with_details(query).complexity
    }

    pub fn classify_with_details(&self, query: &str) -> ClassificationResult {
        let normalized = query.trim().to_lowercase();
        let features = self.extract_features(&normalized);

        // Rule 1: legal keywords outrank everything length-based.
        if features.legal_keywords_found.len() >= self.config.legal_keyword_threshold {
            let keyword_bonus = (features.legal_keywords_found.len() as f32 * 0.05).min(0.2);
            let number_bonus = if features.has_numbers { 0.1 } else { 0.0 };
            let confidence = (0.7 + keyword_bonus + number_bonus).min(1.0);
            return ClassificationResult {
                complexity: Complexity::Legal,
                confidence,
                reason: format!(
                    "matched {} legal keyword(s): {}",
                    features.legal_keywords_found.len(),
                    features.legal_keywords_found.join(", ")
                ),
                features,
            };
        }

        // Rule 2: very long queries are complex regardless of structure.
        if features.length >= self.config.high_complexity_threshold {
            return ClassificationResult {
                complexity: Complexity::Complex,
                confidence: 0.9,
                reason: format!(
                    "length {} >= high complexity threshold {}",
                    features.length, self.config.high_complexity_threshold
                ),
                features,
            };
        }

        // Rule 3: moderately long queries naming several entities.
        if features.has_multiple_entities && features.length >= self.config.complexity_threshold {
            return ClassificationResult {
                complexity: Complexity::Complex,
                confidence: 0.75,
                reason: format!(
                    "multiple entities detected and length {} >= threshold {}",
                    features.length, self.config.complexity_threshold
                ),
                features,
            };
        }

        // Rule 4: long enough and wordy enough.
        if features.length >= self.config.complexity_threshold && features.word_count >= 8 {
            return ClassificationResult {
                complexity: Complexity::Complex,
                confidence: 0.6,
                reason: format!(
                    "length {} >= threshold {} with {} words",
                    features.length, self.config.complexity_threshold, features.word_count
                ),
                features,
            };
        }

        // Default: simple. Confidence erodes as the query grows.
        let mut confidence: f32 = 0.9;
        if features.length > 30 {
            confidence -= 0.1;
        }
        if features.word_count > 5 {
            confidence -= 0.1;
        }
        let confidence = confidence.max(0.5);
        ClassificationResult {
            complexity: Complexity::Simple,
            confidence,
            reason: format!(
                "no legal keywords, length {} below threshold {}",
                features.length, self.config.complexity_threshold
            ),
            features,
        }
    }

    fn extract_features(&self, normalized: &str) -> QueryFeatures {
        let length = normalized.chars().count();
        let word_count = normalized.split_whitespace().count();
        let numeric_tokens = NUMERIC_TOKEN_RE.find_iter(normalized).count();

        let mut legal_keywords_found: Vec<String> = Vec::new();
        for keyword in &self.config.legal_keywords {
            if normalized.contains(keyword.as_str()) && !legal_keywords_found.contains(keyword) {
                legal_keywords_found.push(keyword.clone());
            }
        }

        QueryFeatures {
            length,
            word_count,
            legal_keywords_found,
            has_numbers: numeric_tokens > 0,
            has_multiple_entities: numeric_tokens >= 2 || word_count >= 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> QueryComplexityClassifier {
        QueryComplexityClassifier::new(ClassifierConfig::default())
    }

    #[test]
    fn test_simple_short_query() {
        let result = classifier().classify_with_details("preco de computador");
        assert_eq!(result.complexity, Complexity::Simple);
        assert_eq!(result.features.length, 19);
        assert_eq!(result.features.word_count, 3);
        assert!((result.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_legal_citation_query() {
        let result = classifier().classify_with_details("artigo 75 da lei 14133");
        assert_eq!(result.complexity, Complexity::Legal);
        assert!(result.confidence >= 0.7);
        assert!(result
            .features
            .legal_keywords_found
            .iter()
            .any(|k| k == "14133"));
        assert!(result.features.legal_keywords_found.iter().any(|k| k == "lei"));
        assert!(result.features.has_numbers);
    }

    #[test]
    fn test_legal_outranks_length_rules() {
        let long_query = format!(
            "qual o procedimento completo descrito na lei para {}",
            "contratacao de servicos continuados de tecnologia ".repeat(4)
        );
        assert!(long_query.chars().count() > 100);
        let result = classifier().classify_with_details(&long_query);
        assert_eq!(result.complexity, Complexity::Legal);
    }

    #[test]
    fn test_high_length_is_complex() {
        let query = "a".repeat(120);
        let result = classifier().classify_with_details(&query);
        assert_eq!(result.complexity, Complexity::Complex);
        assert!((result.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_multiple_entities_medium_length() {
        // Two numeric tokens and >= 50 chars, but under 100 chars.
        let query = "comparar proposta 4500 com proposta 7800 para o mesmo fornecedor";
        let result = classifier().classify_with_details(query);
        assert_eq!(result.complexity, Complexity::Complex);
        assert!((result.confidence - 0.75).abs() < 1e-6);
        assert!(result.features.has_multiple_entities);
    }

    #[test]
    fn test_wordy_medium_query_is_complex() {
        // >= 50 chars and >= 8 words, no numeric tokens, under 10 words.
        let query = "como funciona processo de compra direta para pequenos valores";
        assert!(query.len() >= 50 && query.split_whitespace().count() >= 8);
        let result = classifier().classify_with_details(query);
        assert_eq!(result.complexity, Complexity::Complex);
    }

    #[test]
    fn test_simple_confidence_floor() {
        // > 30 chars and > 5 words but below the complexity threshold.
        let query = "onde comprar papel sulfite barato hoje";
        let result = classifier().classify_with_details(query);
        assert_eq!(result.complexity, Complexity::Simple);
        assert!((result.confidence - 0.7).abs() < 1e-6);
        assert!(result.confidence >= 0.5);
    }

    #[test]
    fn test_deterministic() {
        let c = classifier();
        let a = c.classify_with_details("valor do pregao eletronico 90 dias");
        let b = c.classify_with_details("valor do pregao eletronico 90 dias");
        assert_eq!(a.complexity, b.complexity);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.reason, b.reason);
    }

    #[test]
    fn test_confidence_always_in_unit_interval() {
        let c = classifier();
        let queries = [
            "",
            "oi",
            "preco de notebook",
            "artigo 75 da lei 14133 e decreto 10024 e sumula 222 do tcu com portaria",
            &"muito longa ".repeat(30),
        ];
        for query in queries {
            let result = c.classify_with_details(query);
            assert!(
                (0.0..=1.0).contains(&result.confidence),
                "confidence out of range for {:?}",
                query
            );
        }
    }

    #[test]
    fn test_custom_keyword_extension() {
        let mut config = ClassifierConfig::default();
        config.legal_keywords.push("chamamento publico".to_string());
        let c = QueryComplexityClassifier::new(config);
        assert_eq!(c.classify("regras do chamamento publico"), Complexity::Legal);
    }

    #[test]
    fn test_reason_mentions_fired_rule() {
        let c = classifier();
        let legal = c.classify_with_details("sumula 331");
        assert!(legal.reason.contains("legal keyword"));
        let simple = c.classify_with_details("mesa de escritorio");
        assert!(simple.reason.contains("below threshold"));
    }
}
