//! Trellis Store - vector storage for the knowledge graph
//!
//! Entities and relations are persisted as points in a [`VectorStore`],
//! each carrying an embedding from an [`EmbeddingProvider`].
//! [`KnowledgeGraphStore`] enforces the write-path rules and materializes
//! graph snapshots for the response layer.

#![allow(clippy::result_large_err)]

pub mod embedding;
pub mod error;
pub mod graph;
pub mod memory;
pub mod point;
pub mod traits;

#[cfg(feature = "redb")]
pub mod redb;

pub use embedding::{cosine_similarity, EmbeddingConfig, EmbeddingProvider, HashingEmbedder};
pub use error::{StorageError, StorageResult};
pub use graph::{
    AddedObservations, KnowledgeGraphStore, ObservationAddition, ObservationDeletion, SearchHit,
};
pub use memory::MemoryVectorStore;
pub use point::{Payload, Point, PointFilter, PointKind, ScoredPoint, ScrollPage};
pub use traits::VectorStore;

#[cfg(feature = "redb")]
pub use redb::RedbVectorStore;
