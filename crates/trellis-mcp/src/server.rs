//! MCP server implementation

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use trellis_response::ResponseAssembler;
use trellis_store::{EmbeddingProvider, KnowledgeGraphStore, VectorStore};

use crate::handlers::{ToolCallRequest, ToolHandler};
use crate::tools::get_tools;
use crate::transport::{
    Frame, JsonRpcRequest, JsonRpcResponse, LineTransport, INTERNAL_ERROR, INVALID_PARAMS,
    METHOD_NOT_FOUND,
};

const SERVER_NAME: &str = "trellis";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP server over one knowledge graph
pub struct McpServer<V, E> {
    handler: ToolHandler<V, E>,
}

impl<V: VectorStore + 'static, E: EmbeddingProvider + 'static> McpServer<V, E> {
    pub fn new(graph: Arc<KnowledgeGraphStore<V, E>>, assembler: ResponseAssembler) -> Self {
        Self {
            handler: ToolHandler::new(graph, assembler),
        }
    }

    /// Serve on stdin/stdout until EOF
    pub async fn run_stdio(&self) -> anyhow::Result<()> {
        tracing::info!("Starting MCP server on stdio");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve newline-delimited JSON-RPC until the reader is exhausted
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut transport = LineTransport::new(reader, writer);

        loop {
            let response = match transport.read_frame().await? {
                Frame::Request(request) => {
                    tracing::debug!("Received request: {}", request.method);
                    self.handle_request(request).await
                }
                Frame::Malformed(response) => {
                    tracing::warn!("Rejected malformed request");
                    Some(response)
                }
                Frame::Eof => {
                    tracing::info!("EOF on stdin, shutting down");
                    break;
                }
            };

            if let Some(response) = response {
                transport.write_response(&response).await?;
            }
        }

        Ok(())
    }

    /// Handle one request. Notifications get no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            tracing::debug!("Notification: {}", request.method);
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => Self::handle_initialize(id),
            "initialized" | "notifications/initialized" | "ping" => {
                JsonRpcResponse::success(id, json!({}))
            }
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": get_tools() })),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };
        Some(response)
    }

    fn handle_initialize(id: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    async fn handle_tools_call(&self, id: Value, params: Value) -> JsonRpcResponse {
        let request: ToolCallRequest = match serde_json::from_value(params) {
            Ok(r) => r,
            Err(e) => return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
        };

        let response = self.handler.handle(request).await;
        match serde_json::to_value(response) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Serialization error: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_response::ResponseConfig;
    use trellis_store::{HashingEmbedder, MemoryVectorStore};

    fn server() -> McpServer<MemoryVectorStore, HashingEmbedder> {
        let graph = KnowledgeGraphStore::new(MemoryVectorStore::new(), HashingEmbedder::default());
        McpServer::new(
            Arc::new(graph),
            ResponseAssembler::new(ResponseConfig::default()).unwrap(),
        )
    }

    async fn exchange(input: &str) -> Vec<Value> {
        let server = server();
        let mut output = Vec::new();
        server
            .serve(BufReader::new(input.as_bytes()), &mut output)
            .await
            .unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_initialize_and_list_tools() {
        let replies = exchange(concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n",
        ))
        .await;

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["result"]["serverInfo"]["name"], "trellis");
        assert_eq!(replies[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(replies[1]["id"], 2);
        assert_eq!(replies[1]["result"]["tools"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_tools_call_round_trip() {
        let replies = exchange(concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\",\"params\":{\"name\":\"create_entities\",",
            "\"arguments\":{\"entities\":[{\"name\":\"Parser\",\"entityType\":\"class\"}]}}}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"read_graph\",",
            "\"arguments\":{\"mode\":\"entities\"}}}\n",
        ))
        .await;

        assert_eq!(replies.len(), 2);
        let blocks = replies[1]["result"]["content"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        let content: Value = serde_json::from_str(blocks[0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(content["entities"][0]["name"], "Parser");
        assert!(blocks[1]["text"].as_str().unwrap().starts_with("<!-- meta: "));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let replies = exchange(concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"resources/list\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":[1]}\n",
            "{oops\n",
            "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n",
        ))
        .await;

        assert_eq!(replies.len(), 4);
        assert_eq!(replies[0]["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(replies[1]["error"]["code"], INVALID_PARAMS);
        assert_eq!(replies[2]["error"]["code"], -32700);
        assert_eq!(replies[3]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_tool_failure_is_a_result_not_an_error() {
        let replies = exchange(
            "{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"tools/call\",\"params\":{\"name\":\"nope\"}}\n",
        )
        .await;

        assert!(replies[0].get("error").is_none());
        assert_eq!(replies[0]["result"]["isError"], true);
    }
}
