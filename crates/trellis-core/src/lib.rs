//! Trellis Core - Graph types for the code knowledge graph
//!
//! This crate provides the entity/relation data model shared by the
//! storage, search, response and MCP crates, plus the adapter that turns
//! free-text observations into structured fields.

pub mod entity;
pub mod error;
pub mod graph;
pub mod limits;
pub mod observation;
pub mod query;
pub mod relation;

pub use entity::{Entity, EntityType, NewEntity};
pub use error::{Error, Result};
pub use graph::Graph;
pub use observation::ObservationFields;
pub use query::SearchQuery;
pub use relation::Relation;
