//! Query types for searching the knowledge graph

use serde::{Deserialize, Serialize};

/// Search query builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Text to search for
    pub text: String,

    /// Filter by entity types (empty = all types)
    #[serde(default)]
    pub entity_types: Vec<String>,

    /// Maximum number of hits
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Minimum similarity for semantic hits (0.0-1.0)
    #[serde(default)]
    pub similarity_threshold: f32,
}

fn default_limit() -> usize {
    10
}

/// Hard ceiling on `limit`
pub const MAX_SEARCH_LIMIT: usize = 1000;

impl SearchQuery {
    /// Create a new search query with text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entity_types: Vec::new(),
            limit: default_limit(),
            similarity_threshold: 0.0,
        }
    }

    /// Add entity type filter
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_types.push(entity_type.into());
        self
    }

    /// Replace the entity type filter
    pub fn with_entity_types(mut self, entity_types: Vec<String>) -> Self {
        self.entity_types = entity_types;
        self
    }

    /// Set the result limit (clamped to 1..=1000)
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        self
    }

    /// Set similarity threshold for semantic search
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Whether an entity type passes the type filter
    pub fn accepts_type(&self, entity_type: &str) -> bool {
        self.entity_types.is_empty() || self.entity_types.iter().any(|t| t == entity_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_builder() {
        let query = SearchQuery::new("vector store")
            .with_entity_type("class")
            .with_limit(5000)
            .with_similarity_threshold(1.5);

        assert_eq!(query.text, "vector store");
        assert_eq!(query.limit, MAX_SEARCH_LIMIT);
        assert_eq!(query.similarity_threshold, 1.0);
        assert!(query.accepts_type("class"));
        assert!(!query.accepts_type("function"));
    }

    #[test]
    fn test_empty_type_filter_accepts_all() {
        let query = SearchQuery::new("x").with_limit(0);
        assert_eq!(query.limit, 1);
        assert!(query.accepts_type("anything"));
    }

    #[test]
    fn test_deserialize_defaults() {
        let query: SearchQuery = serde_json::from_str(r#"{"text": "parse"}"#).unwrap();
        assert_eq!(query.limit, 10);
        assert!(query.entity_types.is_empty());
    }
}
