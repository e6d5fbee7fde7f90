//! Trellis MCP - tool server for the knowledge graph
//!
//! Speaks JSON-RPC 2.0 over newline-delimited stdio. Graph reads go through
//! the budget-aware [`trellis_response::ResponseAssembler`], so a single
//! `read_graph` call never overruns the client's context window.

pub mod handlers;
pub mod server;
pub mod tools;
pub mod transport;

pub use handlers::{ContentBlock, ToolCallRequest, ToolCallResponse, ToolHandler};
pub use server::McpServer;
pub use tools::{get_tools, Tool};
