//! Search engine traits

use async_trait::async_trait;
use trellis_core::{Entity, SearchQuery};

pub use crate::error::{SearchError, SearchResult as Result};

/// Search over a materialized set of entities
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Entities matching `query`, at most `query.limit` of them
    async fn search(&self, query: &SearchQuery, entities: &[Entity]) -> Result<Vec<Entity>>;
}
