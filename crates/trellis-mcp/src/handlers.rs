//! MCP tool handlers

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_core::{NewEntity, Relation, SearchQuery};
use trellis_response::{GraphRequest, ResponseAssembler, StreamingResponse};
use trellis_search::SemanticSearch;
use trellis_store::{
    EmbeddingProvider, KnowledgeGraphStore, ObservationAddition, ObservationDeletion, VectorStore,
};

/// MCP tool call request
#[derive(Debug, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// MCP tool call response
#[derive(Debug, Serialize)]
pub struct ToolCallResponse {
    pub content: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "isError")]
    pub is_error: Option<bool>,
}

/// Content block for responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ContentBlock {
    pub fn text(&self) -> &str {
        match self {
            ContentBlock::Text { text } => text,
        }
    }
}

impl ToolCallResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: content.into(),
            }],
            is_error: None,
        }
    }

    pub fn json<T: Serialize>(data: &T) -> Self {
        match serde_json::to_string_pretty(data) {
            Ok(json) => Self::text(json),
            Err(e) => Self::error(format!("JSON serialization error: {}", e)),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }

    /// Compact content followed by an out-of-band meta comment
    pub fn graph_view(response: &StreamingResponse) -> Self {
        let content = match serde_json::to_string(&response.content) {
            Ok(json) => json,
            Err(e) => return Self::error(format!("JSON serialization error: {}", e)),
        };
        let meta = match serde_json::to_string(&response.meta) {
            Ok(json) => json,
            Err(e) => return Self::error(format!("JSON serialization error: {}", e)),
        };
        Self {
            content: vec![
                ContentBlock::Text { text: content },
                ContentBlock::Text {
                    text: format!("<!-- meta: {} -->", meta),
                },
            ],
            is_error: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolCallResponse> {
    serde_json::from_value(args)
        .map_err(|e| ToolCallResponse::error(format!("Invalid arguments: {}", e)))
}

/// Dispatches tool calls against one knowledge graph
pub struct ToolHandler<V, E> {
    graph: Arc<KnowledgeGraphStore<V, E>>,
    search: SemanticSearch<V, E>,
    assembler: ResponseAssembler,
}

impl<V: VectorStore, E: EmbeddingProvider> ToolHandler<V, E> {
    pub fn new(graph: Arc<KnowledgeGraphStore<V, E>>, assembler: ResponseAssembler) -> Self {
        Self {
            search: SemanticSearch::new(Arc::clone(&graph)),
            graph,
            assembler,
        }
    }

    pub async fn handle(&self, request: ToolCallRequest) -> ToolCallResponse {
        tracing::debug!("Handling tool call: {}", request.name);

        let result = match request.name.as_str() {
            "create_entities" => self.create_entities(request.arguments).await,
            "create_relations" => self.create_relations(request.arguments).await,
            "add_observations" => self.add_observations(request.arguments).await,
            "delete_entities" => self.delete_entities(request.arguments).await,
            "delete_observations" => self.delete_observations(request.arguments).await,
            "delete_relations" => self.delete_relations(request.arguments).await,
            "read_graph" => self.read_graph(request.arguments).await,
            "search_similar" => self.search_similar(request.arguments).await,
            _ => Err(ToolCallResponse::error(format!(
                "Unknown tool: {}",
                request.name
            ))),
        };

        result.unwrap_or_else(|response| {
            tracing::warn!("Tool {} failed", request.name);
            response
        })
    }

    async fn create_entities(&self, args: Value) -> Result<ToolCallResponse, ToolCallResponse> {
        #[derive(Deserialize)]
        struct Args {
            entities: Vec<NewEntity>,
        }

        let args: Args = parse_args(args)?;
        let created = self
            .graph
            .create_entities(args.entities)
            .await
            .map_err(|e| ToolCallResponse::error(format!("Failed to create entities: {}", e)))?;
        Ok(ToolCallResponse::json(&created))
    }

    async fn create_relations(&self, args: Value) -> Result<ToolCallResponse, ToolCallResponse> {
        #[derive(Deserialize)]
        struct Args {
            relations: Vec<Relation>,
        }

        let args: Args = parse_args(args)?;
        let created = self
            .graph
            .create_relations(args.relations)
            .await
            .map_err(|e| ToolCallResponse::error(format!("Failed to create relations: {}", e)))?;
        Ok(ToolCallResponse::json(&created))
    }

    async fn add_observations(&self, args: Value) -> Result<ToolCallResponse, ToolCallResponse> {
        #[derive(Deserialize)]
        struct Args {
            observations: Vec<ObservationAddition>,
        }

        let args: Args = parse_args(args)?;
        let added = self
            .graph
            .add_observations(args.observations)
            .await
            .map_err(|e| ToolCallResponse::error(format!("Failed to add observations: {}", e)))?;
        Ok(ToolCallResponse::json(&added))
    }

    async fn delete_entities(&self, args: Value) -> Result<ToolCallResponse, ToolCallResponse> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            entity_names: Vec<String>,
        }

        let args: Args = parse_args(args)?;
        let removed = self
            .graph
            .delete_entities(args.entity_names)
            .await
            .map_err(|e| ToolCallResponse::error(format!("Failed to delete entities: {}", e)))?;
        Ok(ToolCallResponse::text(format!("Deleted {} entities", removed)))
    }

    async fn delete_observations(&self, args: Value) -> Result<ToolCallResponse, ToolCallResponse> {
        #[derive(Deserialize)]
        struct Args {
            deletions: Vec<ObservationDeletion>,
        }

        let args: Args = parse_args(args)?;
        let removed = self
            .graph
            .delete_observations(args.deletions)
            .await
            .map_err(|e| {
                ToolCallResponse::error(format!("Failed to delete observations: {}", e))
            })?;
        Ok(ToolCallResponse::text(format!(
            "Deleted {} observations",
            removed
        )))
    }

    async fn delete_relations(&self, args: Value) -> Result<ToolCallResponse, ToolCallResponse> {
        #[derive(Deserialize)]
        struct Args {
            relations: Vec<Relation>,
        }

        let args: Args = parse_args(args)?;
        let removed = self
            .graph
            .delete_relations(args.relations)
            .await
            .map_err(|e| ToolCallResponse::error(format!("Failed to delete relations: {}", e)))?;
        Ok(ToolCallResponse::text(format!("Deleted {} relations", removed)))
    }

    /// Unknown modes are not a tool error: the assembler answers them with
    /// a degraded view that explains itself in the meta block.
    async fn read_graph(&self, args: Value) -> Result<ToolCallResponse, ToolCallResponse> {
        let request: GraphRequest = if args.is_null() {
            GraphRequest::default()
        } else {
            parse_args(args)?
        };

        let graph = self
            .graph
            .read_graph()
            .await
            .map_err(|e| ToolCallResponse::error(format!("Failed to read graph: {}", e)))?;
        let response = self
            .assembler
            .build_request(&graph.entities, &graph.relations, &request);

        tracing::debug!(
            "read_graph: {} of {} tokens, truncated={}",
            response.meta.token_count,
            response.meta.token_limit,
            response.meta.truncated
        );
        Ok(ToolCallResponse::graph_view(&response))
    }

    async fn search_similar(&self, args: Value) -> Result<ToolCallResponse, ToolCallResponse> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            query: String,
            #[serde(default)]
            entity_types: Vec<String>,
            limit: Option<usize>,
        }

        let args: Args = parse_args(args)?;
        let mut query = SearchQuery::new(args.query).with_entity_types(args.entity_types);
        if let Some(limit) = args.limit {
            query = query.with_limit(limit);
        }

        let hits = self
            .search
            .search(&query)
            .await
            .map_err(|e| ToolCallResponse::error(format!("Search error: {}", e)))?;
        Ok(ToolCallResponse::json(&hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trellis_response::{ResponseConfig, ResponseMeta};
    use trellis_store::{HashingEmbedder, MemoryVectorStore};

    fn handler() -> ToolHandler<MemoryVectorStore, HashingEmbedder> {
        let graph = KnowledgeGraphStore::new(MemoryVectorStore::new(), HashingEmbedder::default());
        let assembler = ResponseAssembler::new(ResponseConfig::default()).unwrap();
        ToolHandler::new(Arc::new(graph), assembler)
    }

    async fn call(
        handler: &ToolHandler<MemoryVectorStore, HashingEmbedder>,
        name: &str,
        arguments: Value,
    ) -> ToolCallResponse {
        handler
            .handle(ToolCallRequest {
                name: name.to_string(),
                arguments,
            })
            .await
    }

    async fn seeded() -> ToolHandler<MemoryVectorStore, HashingEmbedder> {
        let handler = handler();
        let response = call(
            &handler,
            "create_entities",
            json!({"entities": [
                {"name": "GraphStore", "entityType": "class",
                 "observations": ["Defined in: src/store.py", "docstring: Persists the graph"]},
                {"name": "load_graph", "entityType": "function",
                 "observations": ["Defined in: src/io.py"]}
            ]}),
        )
        .await;
        assert!(!response.is_error());

        let response = call(
            &handler,
            "create_relations",
            json!({"relations": [{"from": "load_graph", "to": "GraphStore", "relationType": "uses"}]}),
        )
        .await;
        assert!(!response.is_error());
        handler
    }

    fn meta_of(response: &ToolCallResponse) -> ResponseMeta {
        let line = response.content[1].text();
        let json = line
            .strip_prefix("<!-- meta: ")
            .and_then(|s| s.strip_suffix(" -->"))
            .unwrap();
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_read_graph_smart_by_default() {
        let handler = seeded().await;
        let response = call(&handler, "read_graph", Value::Null).await;

        assert!(!response.is_error());
        assert_eq!(response.content.len(), 2);
        let content: Value = serde_json::from_str(response.content[0].text()).unwrap();
        assert_eq!(content["summary"]["totalEntities"], 2);
        assert!(!response.content[0].text().contains('\n'));

        let meta = meta_of(&response);
        assert!(!meta.truncated);
        assert_eq!(meta.token_limit, 25000);
        assert!(meta.sections_included.contains(&"summary".to_string()));
    }

    #[tokio::test]
    async fn test_read_graph_entities_mode_filters() {
        let handler = seeded().await;
        let response = call(
            &handler,
            "read_graph",
            json!({"mode": "entities", "entityTypes": ["function"]}),
        )
        .await;

        let content: Value = serde_json::from_str(response.content[0].text()).unwrap();
        assert_eq!(content["entities"].as_array().unwrap().len(), 1);
        assert_eq!(content["entities"][0]["name"], "load_graph");
    }

    #[tokio::test]
    async fn test_read_graph_unknown_mode_degrades() {
        let handler = seeded().await;
        let response = call(&handler, "read_graph", json!({"mode": "everything"})).await;

        assert!(!response.is_error());
        let content: Value = serde_json::from_str(response.content[0].text()).unwrap();
        assert_eq!(content, json!({"entities": [], "relations": []}));
        let meta = meta_of(&response);
        assert!(meta.truncated);
        assert!(meta.truncation_reason.is_some());
    }

    #[tokio::test]
    async fn test_add_observations_to_missing_entity_is_tool_error() {
        let handler = seeded().await;
        let response = call(
            &handler,
            "add_observations",
            json!({"observations": [{"entityName": "Nope", "contents": ["x"]}]}),
        )
        .await;
        assert!(response.is_error());
        assert!(response.content[0].text().contains("Nope"));
    }

    #[tokio::test]
    async fn test_delete_entities_cascades() {
        let handler = seeded().await;
        let response = call(
            &handler,
            "delete_entities",
            json!({"entityNames": ["GraphStore"]}),
        )
        .await;
        assert_eq!(response.content[0].text(), "Deleted 1 entities");

        let response = call(&handler, "read_graph", json!({"mode": "raw"})).await;
        let content: Value = serde_json::from_str(response.content[0].text()).unwrap();
        assert_eq!(content["entities"].as_array().unwrap().len(), 1);
        assert!(content["relations"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_observations_and_relations() {
        let handler = seeded().await;
        let response = call(
            &handler,
            "delete_observations",
            json!({"deletions": [{"entityName": "load_graph", "observations": ["Defined in: src/io.py"]}]}),
        )
        .await;
        assert_eq!(response.content[0].text(), "Deleted 1 observations");

        let response = call(
            &handler,
            "delete_relations",
            json!({"relations": [{"from": "load_graph", "to": "GraphStore", "relationType": "uses"}]}),
        )
        .await;
        assert_eq!(response.content[0].text(), "Deleted 1 relations");
    }

    #[tokio::test]
    async fn test_search_similar() {
        let handler = seeded().await;
        let response = call(
            &handler,
            "search_similar",
            json!({"query": "persists the graph", "entityTypes": ["class"], "limit": 5}),
        )
        .await;

        assert!(!response.is_error());
        let hits: Value = serde_json::from_str(response.content[0].text()).unwrap();
        assert_eq!(hits[0]["kind"], "entity");
        assert_eq!(hits[0]["name"], "GraphStore");
    }

    #[tokio::test]
    async fn test_bad_arguments_and_unknown_tool() {
        let handler = handler();
        let response = call(&handler, "create_entities", json!({"things": []})).await;
        assert!(response.is_error());
        assert!(response.content[0].text().starts_with("Invalid arguments"));

        let response = call(&handler, "open_nodes", json!({})).await;
        assert!(response.is_error());
        assert_eq!(response.content[0].text(), "Unknown tool: open_nodes");
    }
}
