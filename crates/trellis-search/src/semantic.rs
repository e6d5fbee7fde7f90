//! Semantic search through the vector store

use std::sync::Arc;

use trellis_core::SearchQuery;
use trellis_store::embedding::is_zero;
use trellis_store::{EmbeddingProvider, KnowledgeGraphStore, Payload, SearchHit, VectorStore};

use crate::error::{SearchError, SearchResult};
use crate::exact::ExactSearchEngine;
use crate::traits::SearchEngine;

/// Similarity search over a [`KnowledgeGraphStore`]
///
/// Queries that embed to a zero vector (nothing but punctuation, or
/// vocabulary the embedder cannot see) fall back to exact search over the
/// stored entities, scored 1.0.
pub struct SemanticSearch<V, E> {
    graph: Arc<KnowledgeGraphStore<V, E>>,
    exact: ExactSearchEngine,
}

impl<V: VectorStore, E: EmbeddingProvider> SemanticSearch<V, E> {
    pub fn new(graph: Arc<KnowledgeGraphStore<V, E>>) -> Self {
        Self {
            graph,
            exact: ExactSearchEngine::new(),
        }
    }

    pub async fn search(&self, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
        if query.text.trim().is_empty() {
            return Err(SearchError::Query("query text is empty".to_string()));
        }

        let vector = self.graph.embedder().embed(&query.text).await?;
        if is_zero(&vector) {
            tracing::debug!("Query '{}' has no embedding signal; using exact search", query.text);
            return self.exact_fallback(query).await;
        }

        let hits = self
            .graph
            .search_vector(
                &vector,
                &query.entity_types,
                query.limit,
                query.similarity_threshold,
            )
            .await?;

        tracing::debug!(
            "Semantic search found {} hits above threshold {}",
            hits.len(),
            query.similarity_threshold
        );
        Ok(hits)
    }

    async fn exact_fallback(&self, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
        let snapshot = self.graph.read_graph().await?;
        let entities = self.exact.search(query, &snapshot.entities).await?;
        Ok(entities
            .into_iter()
            .map(|entity| SearchHit {
                score: 1.0,
                payload: Payload::Entity(entity),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::NewEntity;
    use trellis_store::{HashingEmbedder, MemoryVectorStore};

    async fn search() -> SemanticSearch<MemoryVectorStore, HashingEmbedder> {
        let graph = KnowledgeGraphStore::new(MemoryVectorStore::new(), HashingEmbedder::default());
        graph
            .create_entities(vec![
                NewEntity::new("GraphStore", "class")
                    .with_observation("Persists entities in a vector store"),
                NewEntity::new("parse_args", "function")
                    .with_observation("Parses command line arguments"),
                NewEntity::new("C++", "language"),
            ])
            .await
            .unwrap();
        SemanticSearch::new(Arc::new(graph))
    }

    fn names(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter()
            .filter_map(|h| h.payload.as_entity())
            .map(|e| e.name.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_semantic_search_ranks_by_similarity() {
        let search = search().await;
        let hits = search
            .search(&SearchQuery::new("command line arguments"))
            .await
            .unwrap();
        assert_eq!(names(&hits)[0], "parse_args");
    }

    #[tokio::test]
    async fn test_threshold_and_type_filter() {
        let search = search().await;
        let query = SearchQuery::new("vector store")
            .with_entity_type("function")
            .with_similarity_threshold(0.3);
        let hits = search.search(&query).await.unwrap();
        assert!(hits.is_empty());

        let query = SearchQuery::new("vector store").with_entity_type("class");
        let hits = search.search(&query).await.unwrap();
        assert_eq!(names(&hits), vec!["GraphStore"]);
    }

    #[tokio::test]
    async fn test_symbol_query_falls_back_to_exact() {
        let search = search().await;
        let hits = search.search(&SearchQuery::new("++")).await.unwrap();
        assert_eq!(names(&hits), vec!["C++"]);
        assert_eq!(hits[0].score, 1.0);
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let search = search().await;
        let err = search.search(&SearchQuery::new("  ")).await.unwrap_err();
        assert!(matches!(err, SearchError::Query(_)));
    }
}
