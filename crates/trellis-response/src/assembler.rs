//! Progressive, budget-constrained response assembly
//!
//! The assembler turns a materialized graph snapshot into one of four
//! response modes and never fails: anything that goes wrong internally is
//! reported through `meta` on a well-formed, empty response.
//!
//! Smart mode packs sections in priority order. Each section is tried
//! whole, then truncated against a shrinking allowance, then skipped.
//! Skipped sections are never revisited. Summary is mandatory and falls
//! back to bare counts when nothing else fits.

use std::collections::HashSet;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};
use trellis_core::{Entity, Relation};

use crate::budget::Budget;
use crate::config::ResponseConfig;
use crate::error::{ResponseError, ResponseResult};
use crate::truncate::SectionTruncator;
use crate::views::{ContentSection, GraphViewBuilder, SectionKind};

/// Response shape selected per request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Summary plus derived sections, packed by priority
    #[default]
    Smart,
    Entities,
    Relationships,
    /// Everything or nothing
    Raw,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Smart => "smart",
            ResponseMode::Entities => "entities",
            ResponseMode::Relationships => "relationships",
            ResponseMode::Raw => "raw",
        }
    }
}

impl FromStr for ResponseMode {
    type Err = ResponseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smart" => Ok(ResponseMode::Smart),
            "entities" => Ok(ResponseMode::Entities),
            "relationships" => Ok(ResponseMode::Relationships),
            "raw" => Ok(ResponseMode::Raw),
            _ => Err(ResponseError::UnknownMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Already-validated request options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseOptions {
    pub mode: ResponseMode,
    /// Entity type filter; `None` or empty keeps every type
    pub entity_types: Option<Vec<String>>,
    /// Per-type cap; defaults to [`ResponseConfig::default_limit`]
    pub limit: Option<usize>,
}

impl ResponseOptions {
    pub fn new(mode: ResponseMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn with_entity_types(mut self, entity_types: Vec<String>) -> Self {
        self.entity_types = Some(entity_types);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn accepts_type(&self, entity_type: &str) -> bool {
        match &self.entity_types {
            Some(types) if !types.is_empty() => types.iter().any(|t| t == entity_type),
            _ => true,
        }
    }
}

/// Request options as received from a tool call, mode still unparsed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRequest {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub entity_types: Option<Vec<String>>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl GraphRequest {
    pub fn to_options(&self) -> ResponseResult<ResponseOptions> {
        let mode = match &self.mode {
            Some(mode) => mode.parse()?,
            None => ResponseMode::default(),
        };
        Ok(ResponseOptions {
            mode,
            entity_types: self.entity_types.clone(),
            limit: self.limit,
        })
    }
}

/// What the consumer needs to reason about what was left out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub token_count: usize,
    pub token_limit: usize,
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncation_reason: Option<String>,
    pub sections_included: Vec<String>,
}

/// Assembled response: mode-specific content plus metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamingResponse {
    pub content: Value,
    pub meta: ResponseMeta,
}

/// Serializes as a one-entry object without cloning the value
struct Keyed<'a> {
    key: &'a str,
    value: &'a Value,
}

impl Serialize for Keyed<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key, self.value)?;
        map.end()
    }
}

/// `{entities, relations}` over borrowed slices
#[derive(Serialize)]
struct GraphSlice<'a> {
    entities: &'a [&'a Entity],
    relations: &'a [&'a Relation],
}

/// A section that made it into the response
struct Placed {
    section: ContentSection,
    truncated: bool,
}

impl Placed {
    fn label(&self) -> String {
        if self.truncated {
            format!("{} (truncated)", self.section.name)
        } else {
            self.section.name.clone()
        }
    }
}

/// Builds bounded-size graph views
#[derive(Debug, Clone)]
pub struct ResponseAssembler {
    config: ResponseConfig,
    builder: GraphViewBuilder,
    truncator: SectionTruncator,
}

impl ResponseAssembler {
    pub fn new(config: ResponseConfig) -> ResponseResult<Self> {
        config.validate()?;
        Ok(Self {
            builder: GraphViewBuilder::new(&config),
            truncator: SectionTruncator::from_config(&config),
            config,
        })
    }

    pub fn config(&self) -> &ResponseConfig {
        &self.config
    }

    fn budget(&self) -> Budget {
        Budget::from_config(&self.config)
    }

    /// Build from a raw tool request. Unknown modes degrade instead of
    /// failing.
    pub fn build_request(
        &self,
        entities: &[Entity],
        relations: &[Relation],
        request: &GraphRequest,
    ) -> StreamingResponse {
        match request.to_options() {
            Ok(options) => self.build(entities, relations, &options),
            Err(e) => {
                tracing::info!("Rejecting graph request: {}", e);
                self.degraded(e.to_string())
            }
        }
    }

    /// Build the requested view of the snapshot
    pub fn build(
        &self,
        entities: &[Entity],
        relations: &[Relation],
        options: &ResponseOptions,
    ) -> StreamingResponse {
        tracing::debug!(
            mode = %options.mode,
            entities = entities.len(),
            relations = relations.len(),
            "Building graph view"
        );

        let result = match options.mode {
            ResponseMode::Smart => self.build_smart(entities, relations, options),
            ResponseMode::Entities => self.build_entities(entities, options),
            ResponseMode::Relationships => self.build_relationships(entities, relations, options),
            ResponseMode::Raw => self.build_raw(entities, relations),
        };

        let response = result.unwrap_or_else(|e| {
            tracing::warn!(mode = %options.mode, "Graph view failed: {}", e);
            self.degraded(format!("Failed to build {} view: {}", options.mode, e))
        });

        if response.meta.truncated {
            tracing::info!(
                mode = %options.mode,
                tokens = response.meta.token_count,
                reason = response.meta.truncation_reason.as_deref().unwrap_or(""),
                "Graph view truncated"
            );
        }
        response
    }

    fn build_smart(
        &self,
        entities: &[Entity],
        relations: &[Relation],
        options: &ResponseOptions,
    ) -> ResponseResult<StreamingResponse> {
        let limit = options.limit.unwrap_or(self.config.default_limit);
        let mut budget = self.budget();
        let mut content = Map::new();
        let mut included = Vec::new();
        let mut cut = Vec::new();
        let mut omitted = Vec::new();
        let mut reserved = Vec::new();

        for kind in SectionKind::ORDER {
            let reservation = kind.reservation(&self.config);
            if !kind.is_mandatory() && budget.remaining() <= reservation as i64 {
                tracing::debug!(
                    section = kind.name(),
                    remaining = budget.remaining(),
                    reservation,
                    "Skipping section below reservation"
                );
                reserved.push(kind.name());
                continue;
            }

            let value = self.builder.section(kind, entities, relations, limit)?;
            let placed = match self.place(kind, value, &budget) {
                Some(placed) => placed,
                None if kind.is_mandatory() => {
                    let counts = serde_json::to_value(self.builder.counts_only(entities, relations))?;
                    tracing::debug!("Summary degraded to counts only");
                    Placed {
                        section: ContentSection::new(kind, counts.clone(), self.section_cost(kind, &counts)),
                        truncated: true,
                    }
                }
                None => {
                    tracing::debug!(section = kind.name(), "Section does not fit; skipped");
                    omitted.push(kind.name());
                    continue;
                }
            };

            budget = budget.consume(placed.section.estimated_tokens);
            included.push(placed.label());
            if placed.truncated {
                cut.push(kind.name());
            }
            content.insert(placed.section.name, placed.section.content);
        }

        let truncated = !cut.is_empty() || !omitted.is_empty() || !reserved.is_empty();
        let truncation_reason = truncated.then(|| {
            let mut parts = Vec::new();
            if !cut.is_empty() || !omitted.is_empty() {
                parts.push(format!("Token limit of {} reached", self.config.max_tokens));
            }
            if !cut.is_empty() {
                parts.push(format!("truncated: {}", cut.join(", ")));
            }
            if !omitted.is_empty() {
                parts.push(format!("omitted: {}", omitted.join(", ")));
            }
            if !reserved.is_empty() {
                parts.push(format!("below reservation: {}", reserved.join(", ")));
            }
            parts.join("; ")
        });

        let content = Value::Object(content);
        Ok(self.respond(content, truncated, truncation_reason, included))
    }

    /// Try a section whole, then truncated against a shrinking allowance.
    /// `None` when nothing useful fits.
    fn place(&self, kind: SectionKind, value: Value, budget: &Budget) -> Option<Placed> {
        let cost = self.section_cost(kind, &value);
        if budget.fits_tokens(cost) {
            tracing::debug!(section = kind.name(), tokens = cost, "Section included");
            return Some(Placed {
                section: ContentSection::new(kind, value, cost),
                truncated: false,
            });
        }

        let mut allowance = *budget;
        while !allowance.is_exhausted() {
            let shrunk = self.truncator.truncate(value.clone(), &allowance);
            let cost = self.section_cost(kind, &shrunk.value);
            if budget.fits_tokens(cost) {
                if is_hollow(&shrunk.value) {
                    return None;
                }
                tracing::debug!(section = kind.name(), tokens = cost, "Section truncated");
                return Some(Placed {
                    section: ContentSection::new(kind, shrunk.value, cost),
                    truncated: true,
                });
            }
            allowance = allowance.allot(self.config.shrink_factor);
        }
        None
    }

    /// Cost of a section as it appears inside the content object. Summed
    /// over sections this bounds the cost of the whole object.
    fn section_cost(&self, kind: SectionKind, value: &Value) -> usize {
        self.budget()
            .estimator()
            .estimate_with_formatting_overhead(&Keyed {
                key: kind.name(),
                value,
            })
    }

    fn build_entities(&self, entities: &[Entity], options: &ResponseOptions) -> ResponseResult<StreamingResponse> {
        let matched: Vec<&Entity> = entities
            .iter()
            .filter(|e| options.accepts_type(e.entity_type.as_str()))
            .collect();

        let limit = options.limit.unwrap_or(self.config.default_limit);
        let capped = matched.len().min(limit);
        let kept = self.shrink_count(capped, |n| GraphSlice {
            entities: &matched[..n],
            relations: &[],
        });

        let content = serde_json::to_value(GraphSlice {
            entities: &matched[..kept],
            relations: &[],
        })?;
        Ok(self.reduced("entities", content, matched.len(), capped, kept, limit))
    }

    fn build_relationships(
        &self,
        entities: &[Entity],
        relations: &[Relation],
        options: &ResponseOptions,
    ) -> ResponseResult<StreamingResponse> {
        let matched: Vec<&Relation> = match &options.entity_types {
            Some(types) if !types.is_empty() => {
                let names: HashSet<&str> = entities
                    .iter()
                    .filter(|e| options.accepts_type(e.entity_type.as_str()))
                    .map(|e| e.name.as_str())
                    .collect();
                relations
                    .iter()
                    .filter(|r| names.contains(r.from.as_str()) || names.contains(r.to.as_str()))
                    .collect()
            }
            _ => relations.iter().collect(),
        };

        let limit = options.limit.unwrap_or(self.config.default_limit);
        let capped = matched.len().min(limit);
        let kept = self.shrink_count(capped, |n| GraphSlice {
            entities: &[],
            relations: &matched[..n],
        });

        let content = serde_json::to_value(GraphSlice {
            entities: &[],
            relations: &matched[..kept],
        })?;
        Ok(self.reduced("relations", content, matched.len(), capped, kept, limit))
    }

    /// Shrink an item count by the configured factor until the shaped
    /// content fits. Zero items always counts as fitting.
    fn shrink_count<'a>(&self, start: usize, shape: impl Fn(usize) -> GraphSlice<'a>) -> usize {
        let budget = self.budget();
        let estimator = budget.estimator();
        let mut count = start;

        while count > 0 {
            let cost = estimator.estimate_with_formatting_overhead(&shape(count));
            if budget.fits_tokens(cost) {
                break;
            }
            let next = (count as f64 * self.config.shrink_factor).floor() as usize;
            tracing::debug!(from = count, to = next, tokens = cost, "Shrinking item list");
            count = next.min(count - 1);
        }
        count
    }

    fn reduced(
        &self,
        kind: &str,
        content: Value,
        matched: usize,
        capped: usize,
        kept: usize,
        limit: usize,
    ) -> StreamingResponse {
        let truncated = kept < matched;
        let truncation_reason = truncated.then(|| {
            if kept < capped {
                format!(
                    "Reduced {} from {} to {} to fit the token limit of {}",
                    kind, matched, kept, self.config.max_tokens
                )
            } else {
                format!("Reduced {} from {} to {} (limit {})", kind, matched, kept, limit)
            }
        });
        let label = if truncated {
            format!("{kind} (truncated)")
        } else {
            kind.to_string()
        };
        self.respond(content, truncated, truncation_reason, vec![label])
    }

    fn build_raw(&self, entities: &[Entity], relations: &[Relation]) -> ResponseResult<StreamingResponse> {
        let entity_refs: Vec<&Entity> = entities.iter().collect();
        let relation_refs: Vec<&Relation> = relations.iter().collect();
        let graph = GraphSlice {
            entities: &entity_refs,
            relations: &relation_refs,
        };

        let budget = self.budget();
        let cost = budget.estimator().estimate_with_formatting_overhead(&graph);
        if !budget.fits_tokens(cost) {
            let reason = format!(
                "Full graph needs about {} tokens, over the limit of {}; use smart, entities or relationships mode for a narrower view",
                cost, self.config.max_tokens
            );
            return Ok(self.respond(empty_graph(), true, Some(reason), Vec::new()));
        }

        let content = serde_json::to_value(graph)?;
        let sections = vec!["entities".to_string(), "relations".to_string()];
        Ok(self.respond(content, false, None, sections))
    }

    /// Empty, well-formed response carrying the reason it is empty
    fn degraded(&self, reason: String) -> StreamingResponse {
        self.respond(empty_graph(), true, Some(reason), Vec::new())
    }

    fn respond(
        &self,
        content: Value,
        truncated: bool,
        truncation_reason: Option<String>,
        sections_included: Vec<String>,
    ) -> StreamingResponse {
        let token_count = self.budget().estimator().estimate_with_formatting_overhead(&content);
        StreamingResponse {
            content,
            meta: ResponseMeta {
                token_count,
                token_limit: self.config.max_tokens,
                truncated,
                truncation_reason,
                sections_included,
            },
        }
    }
}

fn empty_graph() -> Value {
    json!({"entities": [], "relations": []})
}

/// True when truncation left nothing but empty containers
fn is_hollow(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.values().all(is_hollow),
        _ => false,
    }
}
