//! Output formatting utilities

use clap::ValueEnum;
use serde::Serialize;
use trellis_core::Entity;
use trellis_store::{Payload, SearchHit};

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn print_json<T: Serialize>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

pub fn entity_line(entity: &Entity) -> String {
    format!("{} ({})", entity.name, entity.entity_type)
}

pub fn hit_line(hit: &SearchHit) -> String {
    match &hit.payload {
        Payload::Entity(entity) => format!("{:.3}  {}", hit.score, entity_line(entity)),
        Payload::Relation(relation) => format!(
            "{:.3}  {} -[{}]-> {}",
            hit.score, relation.from, relation.relation_type, relation.to
        ),
    }
}
