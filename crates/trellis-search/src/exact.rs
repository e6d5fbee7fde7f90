//! Exact search engine - case-insensitive substring matching

use async_trait::async_trait;

use crate::traits::{Result, SearchEngine};
use trellis_core::{Entity, SearchQuery};

/// Substring search over name, type and observations (stateless)
pub struct ExactSearchEngine;

impl ExactSearchEngine {
    pub fn new() -> Self {
        Self
    }

    fn searchable(entity: &Entity) -> String {
        let mut parts = vec![
            entity.name.to_lowercase(),
            entity.entity_type.as_str().to_lowercase(),
        ];
        parts.extend(entity.observations.iter().map(|o| o.to_lowercase()));
        parts.join(" ")
    }

    fn matches_query(entity: &Entity, query: &SearchQuery) -> bool {
        if !query.entity_types.is_empty()
            && !query
                .entity_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(entity.entity_type.as_str()))
        {
            return false;
        }

        let text = query.text.trim();
        text.is_empty() || Self::searchable(entity).contains(&text.to_lowercase())
    }
}

impl Default for ExactSearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchEngine for ExactSearchEngine {
    async fn search(&self, query: &SearchQuery, entities: &[Entity]) -> Result<Vec<Entity>> {
        let results: Vec<Entity> = entities
            .iter()
            .filter(|entity| Self::matches_query(entity, query))
            .take(query.limit)
            .cloned()
            .collect();

        tracing::debug!("Exact search for '{}' found {} entities", query.text, results.len());
        Ok(results)
    }
}
