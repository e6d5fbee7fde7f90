//! Points: what the vector store holds
//!
//! Every entity and relation is stored as one point whose payload is a
//! tagged variant, so readers never have to guess a record's shape.

use serde::{Deserialize, Serialize};
use trellis_core::{Entity, Relation};

/// Discriminant of a [`Payload`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Entity,
    Relation,
}

/// Graph record carried by a point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Payload {
    Entity(Entity),
    Relation(Relation),
}

impl Payload {
    pub fn kind(&self) -> PointKind {
        match self {
            Payload::Entity(_) => PointKind::Entity,
            Payload::Relation(_) => PointKind::Relation,
        }
    }

    /// Deterministic point id; re-upserting the same record replaces it
    pub fn point_id(&self) -> String {
        match self {
            Payload::Entity(entity) => entity_point_id(&entity.name),
            Payload::Relation(relation) => relation_point_id(relation),
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Payload::Entity(entity) => Some(entity),
            Payload::Relation(_) => None,
        }
    }

    pub fn as_relation(&self) -> Option<&Relation> {
        match self {
            Payload::Relation(relation) => Some(relation),
            Payload::Entity(_) => None,
        }
    }

    pub fn into_entity(self) -> Option<Entity> {
        match self {
            Payload::Entity(entity) => Some(entity),
            Payload::Relation(_) => None,
        }
    }

    pub fn into_relation(self) -> Option<Relation> {
        match self {
            Payload::Relation(relation) => Some(relation),
            Payload::Entity(_) => None,
        }
    }

    /// Text fed to the embedder for this record
    pub fn embedding_text(&self) -> String {
        match self {
            Payload::Entity(entity) => {
                let mut text = format!("{} ({})", entity.name, entity.entity_type);
                if !entity.observations.is_empty() {
                    text.push_str(": ");
                    text.push_str(&entity.observations.join(". "));
                }
                text
            }
            Payload::Relation(relation) => {
                format!("{} {} {}", relation.from, relation.relation_type, relation.to)
            }
        }
    }
}

pub fn entity_point_id(name: &str) -> String {
    format!("entity:{name}")
}

pub fn relation_point_id(relation: &Relation) -> String {
    format!(
        "relation:{}:{}:{}",
        relation.from, relation.relation_type, relation.to
    )
}

/// A stored vector with its payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

impl Point {
    pub fn new(vector: Vec<f32>, payload: Payload) -> Self {
        Self {
            id: payload.point_id(),
            vector,
            payload,
        }
    }
}

/// A search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPoint {
    pub point: Point,
    pub score: f32,
}

/// One page of a scroll
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollPage {
    pub points: Vec<Point>,
    /// Id to pass as `offset` for the next page; `None` on the last page
    pub next_offset: Option<String>,
}

/// Point selector. Every populated field must match.
///
/// `entity_types` and `names` only match entity points, `touching` only
/// matches relation points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointFilter {
    pub kind: Option<PointKind>,
    pub ids: Vec<String>,
    pub entity_types: Vec<String>,
    pub names: Vec<String>,
    pub touching: Vec<String>,
}

impl PointFilter {
    /// Match every point
    pub fn all() -> Self {
        Self::default()
    }

    pub fn entities() -> Self {
        Self {
            kind: Some(PointKind::Entity),
            ..Default::default()
        }
    }

    pub fn relations() -> Self {
        Self {
            kind: Some(PointKind::Relation),
            ..Default::default()
        }
    }

    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_entity_types(mut self, entity_types: Vec<String>) -> Self {
        self.entity_types = entity_types;
        self
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = names;
        self
    }

    pub fn touching(mut self, names: Vec<String>) -> Self {
        self.touching = names;
        self
    }

    pub fn matches(&self, point: &Point) -> bool {
        if self.kind.is_some_and(|kind| kind != point.payload.kind()) {
            return false;
        }
        if !self.ids.is_empty() && !self.ids.contains(&point.id) {
            return false;
        }

        match &point.payload {
            Payload::Entity(entity) => {
                self.touching.is_empty()
                    && (self.entity_types.is_empty()
                        || self.entity_types.iter().any(|t| t == entity.entity_type.as_str()))
                    && (self.names.is_empty() || self.names.contains(&entity.name))
            }
            Payload::Relation(relation) => {
                self.entity_types.is_empty()
                    && self.names.is_empty()
                    && (self.touching.is_empty() || self.touching.iter().any(|n| relation.touches(n)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_point(name: &str, entity_type: &str) -> Point {
        Point::new(vec![1.0], Payload::Entity(Entity::new(name, entity_type)))
    }

    fn relation_point(from: &str, to: &str) -> Point {
        Point::new(vec![1.0], Payload::Relation(Relation::new(from, to, "calls")))
    }

    #[test]
    fn test_point_ids_are_deterministic() {
        assert_eq!(entity_point("Store", "class").id, "entity:Store");
        assert_eq!(relation_point("a", "b").id, "relation:a:calls:b");
    }

    #[test]
    fn test_payload_is_tagged() {
        let payload = Payload::Entity(Entity::new("Store", "class").with_observation("Line: 1"));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "entity");
        assert_eq!(json["entityType"], "class");

        let back: Payload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);

        let relation: Payload =
            serde_json::from_str(r#"{"kind":"relation","from":"a","to":"b","relationType":"uses"}"#)
                .unwrap();
        assert_eq!(relation.kind(), PointKind::Relation);
    }

    #[test]
    fn test_untagged_record_is_rejected() {
        let result: Result<Payload, _> = serde_json::from_str(r#"{"name":"x","entityType":"y"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_embedding_text() {
        let entity = Payload::Entity(
            Entity::new("Store", "class")
                .with_observation("Persists points")
                .with_observation("Thread safe"),
        );
        assert_eq!(entity.embedding_text(), "Store (class): Persists points. Thread safe");

        let relation = Payload::Relation(Relation::new("Cli", "Store", "uses"));
        assert_eq!(relation.embedding_text(), "Cli uses Store");
    }

    #[test]
    fn test_filter_matching() {
        let class = entity_point("Store", "class");
        let function = entity_point("open", "function");
        let edge = relation_point("Store", "open");

        assert!(PointFilter::all().matches(&class));
        assert!(PointFilter::all().matches(&edge));
        assert!(!PointFilter::entities().matches(&edge));

        let classes = PointFilter::entities().with_entity_types(vec!["class".into()]);
        assert!(classes.matches(&class));
        assert!(!classes.matches(&function));

        let touching = PointFilter::relations().touching(vec!["open".into()]);
        assert!(touching.matches(&edge));
        assert!(!touching.matches(&class));

        let by_name = PointFilter::all().with_names(vec!["open".into()]);
        assert!(by_name.matches(&function));
        assert!(!by_name.matches(&edge));

        let by_id = PointFilter::all().with_ids(vec!["entity:Store".into()]);
        assert!(by_id.matches(&class));
        assert!(!by_id.matches(&function));
    }
}
