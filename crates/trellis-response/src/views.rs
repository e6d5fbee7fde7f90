//! Named sections of the smart graph view
//!
//! Every builder here is a pure function of the entity and relation
//! snapshot, so the assembler can build sections lazily in priority order
//! and skip the ones the budget rules out before paying for them.

use std::collections::{BTreeMap, HashSet};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use trellis_core::observation::{defined_in, ObservationFields};
use trellis_core::{Entity, Relation};

use crate::config::ResponseConfig;
use crate::error::ResponseResult;

/// The sections of a smart view, in the order they are packed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Summary,
    Structure,
    ApiSurface,
    Dependencies,
    Relations,
}

impl SectionKind {
    /// Packing order, most important first
    pub const ORDER: [SectionKind; 5] = [
        SectionKind::Summary,
        SectionKind::Structure,
        SectionKind::ApiSurface,
        SectionKind::Dependencies,
        SectionKind::Relations,
    ];

    /// Key of the section in the response content
    pub fn name(&self) -> &'static str {
        match self {
            SectionKind::Summary => "summary",
            SectionKind::Structure => "structure",
            SectionKind::ApiSurface => "apiSurface",
            SectionKind::Dependencies => "dependencies",
            SectionKind::Relations => "relations",
        }
    }

    pub fn priority(&self) -> u32 {
        match self {
            SectionKind::Summary => 100,
            SectionKind::Structure => 80,
            SectionKind::ApiSurface => 60,
            SectionKind::Dependencies => 40,
            SectionKind::Relations => 20,
        }
    }

    /// Summary is never skipped; it degrades instead.
    pub fn is_mandatory(&self) -> bool {
        matches!(self, SectionKind::Summary)
    }

    /// Remaining budget a section needs before it is attempted at all
    pub fn reservation(&self, config: &ResponseConfig) -> usize {
        match self {
            SectionKind::Summary => 0,
            SectionKind::Structure => config.reservations.structure,
            SectionKind::ApiSurface => config.reservations.api_surface,
            SectionKind::Dependencies => config.reservations.dependencies,
            SectionKind::Relations => config.reservations.relations,
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, priority-tagged candidate piece of output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSection {
    pub name: String,
    pub content: Value,
    pub estimated_tokens: usize,
    pub priority: u32,
}

impl ContentSection {
    pub fn new(kind: SectionKind, content: Value, estimated_tokens: usize) -> Self {
        Self {
            name: kind.name().to_string(),
            content,
            estimated_tokens,
            priority: kind.priority(),
        }
    }
}

/// Orientation statistics for the whole graph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_entities: usize,
    pub total_relations: usize,
    /// Entity count per entity type
    pub breakdown: BTreeMap<String, usize>,
    /// Distinct top-level directories entities are defined in
    pub key_modules: Vec<String>,
    pub timestamp: String,
}

/// Last-resort summary when even a truncated [`Summary`] does not fit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountsSummary {
    pub total_entities: usize,
    pub total_relations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Directory,
}

/// One path of the file structure map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Entities defined in the file, or anywhere below the directory
    pub entity_count: usize,
}

/// Path to node; ordered so directories precede their contents
pub type FileStructure = BTreeMap<String, FileNode>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Public classes and functions, most valuable first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiSurface {
    pub classes: Vec<ApiEntry>,
    pub functions: Vec<ApiEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// `imports` relations split by whether the target is a path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dependencies {
    /// Distinct non-path targets (packages, modules)
    pub external: Vec<String>,
    pub internal: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRelations {
    pub inheritance: Vec<Edge>,
    pub key_usages: Vec<Relation>,
}

const KEY_USAGE_TYPES: [&str; 3] = ["calls", "uses", "implements"];

/// Score an entity for the API surface. Higher ranks first.
pub fn priority_score(entity: &Entity) -> u32 {
    let mut score = 0;
    if !entity.name.starts_with('_') {
        score += 5;
    }
    if ObservationFields::parse(&entity.observations).has_documentation {
        score += 10;
    }
    if matches!(entity.name.as_str(), "__init__" | "__new__") {
        score += 8;
    }
    score
}

/// Order entities by [`priority_score`], descending. Ties keep their
/// input order.
pub fn rank_entities<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Vec<&'a Entity> {
    let mut scored: Vec<(u32, &Entity)> = entities
        .into_iter()
        .map(|e| (priority_score(e), e))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, e)| e).collect()
}

fn is_path_like(target: &str) -> bool {
    target.contains('/') || target.contains('\\')
}

/// First directory component of a path, if it has one
fn top_level_module(path: &str) -> Option<&str> {
    let trimmed = path.trim_start_matches("./").trim_start_matches('/');
    match trimmed.split_once('/') {
        Some((head, _)) if !head.is_empty() => Some(head),
        _ => None,
    }
}

/// Builds the sections of a smart view from a graph snapshot
#[derive(Debug, Clone)]
pub struct GraphViewBuilder {
    max_key_modules: usize,
    max_dependencies: usize,
    max_key_usages: usize,
    docstring_preview_chars: usize,
}

impl GraphViewBuilder {
    pub fn new(config: &ResponseConfig) -> Self {
        Self {
            max_key_modules: config.max_key_modules,
            max_dependencies: config.max_dependencies,
            max_key_usages: config.max_key_usages,
            docstring_preview_chars: config.docstring_preview_chars,
        }
    }

    pub fn summary(&self, entities: &[Entity], relations: &[Relation]) -> Summary {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.summary_at(entities, relations, timestamp)
    }

    /// [`summary`](Self::summary) with a caller-supplied timestamp
    pub fn summary_at(&self, entities: &[Entity], relations: &[Relation], timestamp: String) -> Summary {
        let mut breakdown = BTreeMap::new();
        for entity in entities {
            *breakdown.entry(entity.entity_type.to_string()).or_insert(0) += 1;
        }

        let mut key_modules: Vec<String> = Vec::new();
        for entity in entities {
            if key_modules.len() >= self.max_key_modules {
                break;
            }
            let Some(path) = defined_in(&entity.observations) else {
                continue;
            };
            if let Some(module) = top_level_module(&path) {
                if !key_modules.iter().any(|m| m == module) {
                    key_modules.push(module.to_string());
                }
            }
        }

        Summary {
            total_entities: entities.len(),
            total_relations: relations.len(),
            breakdown,
            key_modules,
            timestamp,
        }
    }

    pub fn counts_only(&self, entities: &[Entity], relations: &[Relation]) -> CountsSummary {
        CountsSummary {
            total_entities: entities.len(),
            total_relations: relations.len(),
        }
    }

    /// Files entities are defined in, plus every directory above them
    pub fn file_structure(&self, entities: &[Entity]) -> FileStructure {
        let mut structure = FileStructure::new();

        for entity in entities {
            let Some(path) = defined_in(&entity.observations) else {
                continue;
            };
            structure
                .entry(path.clone())
                .or_insert(FileNode {
                    node_type: NodeType::File,
                    entity_count: 0,
                })
                .entity_count += 1;

            let mut dir = path.as_str();
            while let Some((parent, _)) = dir.rsplit_once('/') {
                if parent.is_empty() || parent == "." {
                    break;
                }
                let node = structure.entry(parent.to_string()).or_insert(FileNode {
                    node_type: NodeType::Directory,
                    entity_count: 0,
                });
                node.node_type = NodeType::Directory;
                node.entity_count += 1;
                dir = parent;
            }
        }

        structure
    }

    /// Public classes and functions, ranked, at most `limit` of each
    pub fn api_surface(&self, entities: &[Entity], limit: usize) -> ApiSurface {
        let of_type = |types: &[&str]| -> Vec<ApiEntry> {
            let candidates = entities.iter().filter(|e| {
                !e.is_private()
                    && types
                        .iter()
                        .any(|t| e.entity_type.as_str().eq_ignore_ascii_case(t))
            });
            rank_entities(candidates)
                .into_iter()
                .take(limit)
                .map(|e| self.api_entry(e))
                .collect()
        };

        ApiSurface {
            classes: of_type(&["class"]),
            functions: of_type(&["function", "method"]),
        }
    }

    fn api_entry(&self, entity: &Entity) -> ApiEntry {
        let fields = ObservationFields::parse(&entity.observations);
        ApiEntry {
            name: entity.name.clone(),
            docstring: fields.docstring_preview(self.docstring_preview_chars),
            file: fields.file_path,
            line: fields.line,
            methods: fields.methods,
            signature: fields.signature,
        }
    }

    pub fn dependencies(&self, relations: &[Relation]) -> Dependencies {
        let mut external = Vec::new();
        let mut seen = HashSet::new();
        let mut internal = Vec::new();

        for relation in relations.iter().filter(|r| r.is_type("imports")) {
            if is_path_like(&relation.to) {
                if internal.len() < self.max_dependencies {
                    internal.push(Edge {
                        from: relation.from.clone(),
                        to: relation.to.clone(),
                    });
                }
            } else if external.len() < self.max_dependencies && seen.insert(relation.to.as_str()) {
                external.push(relation.to.clone());
            }
        }

        Dependencies { external, internal }
    }

    pub fn key_relations(&self, relations: &[Relation]) -> KeyRelations {
        let inheritance = relations
            .iter()
            .filter(|r| r.is_type("inherits"))
            .map(|r| Edge {
                from: r.from.clone(),
                to: r.to.clone(),
            })
            .collect();
        let key_usages = relations
            .iter()
            .filter(|r| KEY_USAGE_TYPES.iter().any(|t| r.is_type(t)))
            .take(self.max_key_usages)
            .cloned()
            .collect();

        KeyRelations {
            inheritance,
            key_usages,
        }
    }

    /// Build one section as a JSON value
    pub fn section(
        &self,
        kind: SectionKind,
        entities: &[Entity],
        relations: &[Relation],
        limit: usize,
    ) -> ResponseResult<Value> {
        let value = match kind {
            SectionKind::Summary => serde_json::to_value(self.summary(entities, relations))?,
            SectionKind::Structure => serde_json::to_value(self.file_structure(entities))?,
            SectionKind::ApiSurface => serde_json::to_value(self.api_surface(entities, limit))?,
            SectionKind::Dependencies => serde_json::to_value(self.dependencies(relations))?,
            SectionKind::Relations => serde_json::to_value(self.key_relations(relations))?,
        };
        Ok(value)
    }
}

impl Default for GraphViewBuilder {
    fn default() -> Self {
        Self::new(&ResponseConfig::default())
    }
}
