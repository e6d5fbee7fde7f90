//! Trellis Search - search engines for the knowledge graph
//!
//! Provides semantic search through the vector store and exact substring
//! search over a materialized snapshot.

pub mod error;
pub mod exact;
pub mod semantic;
pub mod traits;

pub use error::{SearchError, SearchResult};
pub use exact::ExactSearchEngine;
pub use semantic::SemanticSearch;
pub use traits::SearchEngine;
