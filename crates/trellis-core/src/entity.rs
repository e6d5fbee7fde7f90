//! Entity (node) types and operations

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::limits::{validate_entity_name, validate_observation, validate_observation_count};

/// Entity type classification ("class", "function", "file", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityType(pub String);

impl EntityType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for EntityType {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An entity in the knowledge graph (a node)
///
/// `name` is the primary key within a graph. Observations are free-text
/// facts, some of which encode structured data as prefixed strings
/// (`"Defined in: src/app.py"`, `"Line: 12"`); see
/// [`ObservationFields`](crate::observation::ObservationFields).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Entity name (unique within a graph)
    pub name: String,

    /// Entity type/category
    pub entity_type: EntityType,

    /// Observations (facts) about this entity
    #[serde(default)]
    pub observations: Vec<String>,
}

impl Entity {
    /// Create a new entity without observations
    pub fn new(name: impl Into<String>, entity_type: impl Into<EntityType>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            observations: Vec::new(),
        }
    }

    /// Builder-style observation append
    pub fn with_observation(mut self, obs: impl Into<String>) -> Self {
        self.observations.push(obs.into());
        self
    }

    /// Add an observation unless an identical one is already present.
    ///
    /// Returns `true` if the observation was added.
    pub fn add_observation(&mut self, content: impl Into<String>) -> bool {
        let content = content.into();
        if self.observations.contains(&content) {
            return false;
        }
        self.observations.push(content);
        true
    }

    /// Remove every observation equal to one of `contents`.
    ///
    /// Returns the number of observations removed.
    pub fn remove_observations(&mut self, contents: &[String]) -> usize {
        let before = self.observations.len();
        self.observations.retain(|o| !contents.contains(o));
        before - self.observations.len()
    }

    /// Whether the name follows the leading-underscore private convention.
    ///
    /// Dunder names (`__init__`, `__eq__`) are protocol methods, not private.
    pub fn is_private(&self) -> bool {
        let name = self.name.as_str();
        if !name.starts_with('_') {
            return false;
        }
        let is_dunder = name.len() > 4 && name.starts_with("__") && name.ends_with("__");
        !is_dunder
    }

    /// Check the entity against the input limits
    pub fn validate(&self) -> Result<()> {
        validate_entity_name(&self.name)?;
        validate_observation_count(self.observations.len())?;
        for obs in &self.observations {
            validate_observation(obs)?;
        }
        Ok(())
    }
}

/// Data for creating a new entity, as received from tool calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntity {
    pub name: String,
    pub entity_type: String,
    #[serde(default)]
    pub observations: Vec<String>,
}

impl NewEntity {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            observations: Vec::new(),
        }
    }

    pub fn with_observation(mut self, obs: impl Into<String>) -> Self {
        self.observations.push(obs.into());
        self
    }
}

impl From<NewEntity> for Entity {
    fn from(input: NewEntity) -> Self {
        let mut entity = Entity::new(input.name, input.entity_type);
        for obs in input.observations {
            entity.add_observation(obs);
        }
        entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_creation() {
        let entity = Entity::new("GraphStore", "class");

        assert_eq!(entity.name, "GraphStore");
        assert_eq!(entity.entity_type.as_str(), "class");
        assert!(entity.observations.is_empty());
    }

    #[test]
    fn test_add_observation_dedupes() {
        let mut entity = Entity::new("GraphStore", "class");

        assert!(entity.add_observation("Defined in: src/store.py"));
        assert!(!entity.add_observation("Defined in: src/store.py"));
        assert_eq!(entity.observations.len(), 1);
    }

    #[test]
    fn test_remove_observations() {
        let mut entity = Entity::new("GraphStore", "class")
            .with_observation("a")
            .with_observation("b")
            .with_observation("c");

        let removed = entity.remove_observations(&["a".to_string(), "c".to_string()]);
        assert_eq!(removed, 2);
        assert_eq!(entity.observations, vec!["b".to_string()]);
    }

    #[test]
    fn test_private_names() {
        assert!(Entity::new("_helper", "function").is_private());
        assert!(Entity::new("__mangled", "function").is_private());
        assert!(!Entity::new("__init__", "function").is_private());
        assert!(!Entity::new("public", "function").is_private());
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let entity = Entity::new("parse", "function").with_observation("Line: 3");
        let json = serde_json::to_value(&entity).unwrap();

        assert_eq!(json["entityType"], "function");
        assert_eq!(json["observations"][0], "Line: 3");

        let back: Entity = serde_json::from_value(json).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        assert!(Entity::new("", "class").validate().is_err());
        assert!(Entity::new("Ok", "class").validate().is_ok());
    }
}
