//! Knowledge graph persistence on top of a vector store
//!
//! Owns the write-path integrity rules (validation, duplicate handling,
//! cascading deletes) and hands out materialized snapshots for the read
//! path.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use trellis_core::limits::{validate_batch_entities, validate_batch_relations, validate_relation};
use trellis_core::{Entity, Error, Graph, NewEntity, Relation};

use crate::embedding::EmbeddingProvider;
use crate::error::StorageResult;
use crate::point::{entity_point_id, relation_point_id, Payload, Point, PointFilter, PointKind};
use crate::traits::VectorStore;

/// Observations to append to one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationAddition {
    pub entity_name: String,
    pub contents: Vec<String>,
}

/// What [`KnowledgeGraphStore::add_observations`] actually appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedObservations {
    pub entity_name: String,
    pub added_observations: Vec<String>,
}

/// Observations to remove from one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationDeletion {
    pub entity_name: String,
    pub observations: Vec<String>,
}

/// A semantic search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub score: f32,
    #[serde(flatten)]
    pub payload: Payload,
}

/// Entity/relation persistence over any [`VectorStore`]
pub struct KnowledgeGraphStore<V, E> {
    store: V,
    embedder: E,
}

impl<V: VectorStore, E: EmbeddingProvider> KnowledgeGraphStore<V, E> {
    pub fn new(store: V, embedder: E) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &V {
        &self.store
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub async fn initialize(&self) -> StorageResult<()> {
        self.store.initialize().await
    }

    async fn to_points(&self, payloads: Vec<Payload>) -> StorageResult<Vec<Point>> {
        let texts: Vec<String> = payloads.iter().map(Payload::embedding_text).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        Ok(vectors
            .into_iter()
            .zip(payloads)
            .map(|(vector, payload)| Point::new(vector, payload))
            .collect())
    }

    pub async fn get_entity(&self, name: &str) -> StorageResult<Option<Entity>> {
        let point = self.store.get(&entity_point_id(name)).await?;
        Ok(point.and_then(|p| p.payload.into_entity()))
    }

    /// Create entities whose names are not taken yet. Returns the ones
    /// actually created.
    pub async fn create_entities(&self, inputs: Vec<NewEntity>) -> StorageResult<Vec<Entity>> {
        validate_batch_entities(inputs.len())?;

        let mut seen = HashSet::new();
        let mut created = Vec::new();
        for input in inputs {
            let entity = Entity::from(input);
            entity.validate()?;
            if !seen.insert(entity.name.clone()) {
                continue;
            }
            if self.store.get(&entity_point_id(&entity.name)).await?.is_some() {
                tracing::debug!("Entity {} already exists; skipped", entity.name);
                continue;
            }
            created.push(entity);
        }

        let points = self
            .to_points(created.iter().cloned().map(Payload::Entity).collect())
            .await?;
        self.store.upsert(points).await?;
        tracing::info!("Created {} entities", created.len());

        Ok(created)
    }

    /// Create relations that do not exist yet. Returns the ones actually
    /// created.
    pub async fn create_relations(&self, relations: Vec<Relation>) -> StorageResult<Vec<Relation>> {
        validate_batch_relations(relations.len())?;

        let mut seen = HashSet::new();
        let mut created = Vec::new();
        for relation in relations {
            validate_relation(&relation.from, &relation.to, &relation.relation_type)?;
            let id = relation_point_id(&relation);
            if !seen.insert(id.clone()) || self.store.get(&id).await?.is_some() {
                continue;
            }
            created.push(relation);
        }

        let points = self
            .to_points(created.iter().cloned().map(Payload::Relation).collect())
            .await?;
        self.store.upsert(points).await?;
        tracing::info!("Created {} relations", created.len());

        Ok(created)
    }

    /// Append unseen observations. Fails without writing anything if any
    /// target entity is missing.
    pub async fn add_observations(
        &self,
        additions: Vec<ObservationAddition>,
    ) -> StorageResult<Vec<AddedObservations>> {
        let mut updated = Vec::new();
        let mut results = Vec::new();

        for addition in additions {
            let mut entity = self
                .get_entity(&addition.entity_name)
                .await?
                .ok_or_else(|| Error::EntityNotFound(addition.entity_name.clone()))?;

            let added: Vec<String> = addition
                .contents
                .into_iter()
                .filter(|content| entity.add_observation(content.clone()))
                .collect();
            entity.validate()?;

            results.push(AddedObservations {
                entity_name: entity.name.clone(),
                added_observations: added,
            });
            updated.push(Payload::Entity(entity));
        }

        let points = self.to_points(updated).await?;
        self.store.upsert(points).await?;
        Ok(results)
    }

    /// Delete entities and every relation touching them. Returns the
    /// number of entities removed.
    pub async fn delete_entities(&self, names: Vec<String>) -> StorageResult<usize> {
        if names.is_empty() {
            return Ok(0);
        }
        let removed = self
            .store
            .delete(&PointFilter::entities().with_names(names.clone()))
            .await?;
        let relations = self
            .store
            .delete(&PointFilter::relations().touching(names))
            .await?;
        tracing::info!("Deleted {} entities and {} relations", removed, relations);
        Ok(removed)
    }

    /// Remove observations; missing entities are ignored. Returns the
    /// number of observations removed.
    pub async fn delete_observations(&self, deletions: Vec<ObservationDeletion>) -> StorageResult<usize> {
        let mut removed = 0;
        let mut updated = Vec::new();

        for deletion in deletions {
            let Some(mut entity) = self.get_entity(&deletion.entity_name).await? else {
                continue;
            };
            let count = entity.remove_observations(&deletion.observations);
            if count > 0 {
                removed += count;
                updated.push(Payload::Entity(entity));
            }
        }

        let points = self.to_points(updated).await?;
        self.store.upsert(points).await?;
        Ok(removed)
    }

    /// Delete exact relations. Returns how many existed.
    pub async fn delete_relations(&self, relations: Vec<Relation>) -> StorageResult<usize> {
        if relations.is_empty() {
            return Ok(0);
        }
        let ids = relations.iter().map(relation_point_id).collect();
        self.store
            .delete(&PointFilter::relations().with_ids(ids))
            .await
    }

    /// Materialize the whole graph: entities by name, relations by id
    pub async fn read_graph(&self) -> StorageResult<Graph> {
        let mut graph = Graph::new();
        for point in self.store.scroll_all(&PointFilter::all()).await? {
            match point.payload {
                Payload::Entity(entity) => graph.entities.push(entity),
                Payload::Relation(relation) => graph.relations.push(relation),
            }
        }
        tracing::debug!(
            "Read graph: {} entities, {} relations",
            graph.entities.len(),
            graph.relations.len()
        );
        Ok(graph)
    }

    /// Entities and relations most similar to `query`
    ///
    /// A non-empty `entity_types` restricts hits to entities of those types.
    pub async fn search_similar(
        &self,
        query: &str,
        entity_types: &[String],
        limit: usize,
        threshold: f32,
    ) -> StorageResult<Vec<SearchHit>> {
        let vector = self.embedder.embed(query).await?;
        self.search_vector(&vector, entity_types, limit, threshold)
            .await
    }

    /// [`search_similar`](Self::search_similar) with a precomputed query vector
    pub async fn search_vector(
        &self,
        vector: &[f32],
        entity_types: &[String],
        limit: usize,
        threshold: f32,
    ) -> StorageResult<Vec<SearchHit>> {
        let filter = if entity_types.is_empty() {
            PointFilter::all()
        } else {
            PointFilter {
                kind: Some(PointKind::Entity),
                ..PointFilter::all()
            }
            .with_entity_types(entity_types.to_vec())
        };

        let hits = self.store.search(vector, &filter, limit).await?;
        Ok(hits
            .into_iter()
            .filter(|hit| hit.score >= threshold)
            .map(|hit| SearchHit {
                score: hit.score,
                payload: hit.point.payload,
            })
            .collect())
    }
}
