//! Materialized graph snapshot

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::relation::Relation;

/// Graph containing entities and their relations
///
/// Serializes as `{"entities": [...], "relations": [...]}`, which is also
/// the import/export format and the raw view shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(mut self, entities: Vec<Entity>) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_relations(mut self, relations: Vec<Relation>) -> Self {
        self.relations = relations;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_builder() {
        let graph = Graph::new()
            .with_entities(vec![Entity::new("A", "class")])
            .with_relations(vec![Relation::new("A", "B", "inherits")]);

        assert!(!graph.is_empty());
        assert!(graph.entity("A").is_some());
        assert!(graph.entity("B").is_none());
    }

    #[test]
    fn test_graph_deserializes_with_missing_sections() {
        let graph: Graph = serde_json::from_str(r#"{"entities": []}"#).unwrap();
        assert!(graph.is_empty());
    }
}
