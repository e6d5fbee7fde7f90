//! Newline-delimited JSON-RPC framing

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC request; no `id` means a notification
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// What one line of input turned out to be
#[derive(Debug)]
pub enum Frame {
    Request(JsonRpcRequest),
    /// Unparseable line, already answered with this error
    Malformed(JsonRpcResponse),
    Eof,
}

/// Line-framed transport over any async reader/writer pair
///
/// The reader is kept across calls so buffered input is never dropped.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read the next non-blank line as a request
    pub async fn read_frame(&mut self) -> std::io::Result<Frame> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(Frame::Eof);
            }
            if !line.trim().is_empty() {
                break;
            }
        }

        let value: Value = match serde_json::from_str(line.trim()) {
            Ok(v) => v,
            Err(e) => {
                return Ok(Frame::Malformed(JsonRpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                )))
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) if request.jsonrpc == "2.0" => Ok(Frame::Request(request)),
            Ok(request) => Ok(Frame::Malformed(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            ))),
            Err(e) => Ok(Frame::Malformed(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Invalid request: {}", e),
            ))),
        }
    }

    /// Write one response as a single line
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> std::io::Result<()> {
        let json = serde_json::to_string(response)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    fn transport(input: &str) -> LineTransport<BufReader<&[u8]>, Vec<u8>> {
        LineTransport::new(BufReader::new(input.as_bytes()), Vec::new())
    }

    #[tokio::test]
    async fn test_reads_consecutive_requests() {
        let mut t = transport(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n\n{\"jsonrpc\":\"2.0\",\"method\":\"initialized\"}\n",
        );

        match t.read_frame().await.unwrap() {
            Frame::Request(r) => {
                assert_eq!(r.method, "ping");
                assert_eq!(r.id, Some(serde_json::json!(1)));
            }
            other => panic!("unexpected frame: {:?}", other),
        }
        match t.read_frame().await.unwrap() {
            Frame::Request(r) => assert!(r.is_notification()),
            other => panic!("unexpected frame: {:?}", other),
        }
        assert!(matches!(t.read_frame().await.unwrap(), Frame::Eof));
    }

    #[tokio::test]
    async fn test_malformed_lines() {
        let mut t = transport("not json\n{\"jsonrpc\":\"1.0\",\"id\":7,\"method\":\"ping\"}\n");

        match t.read_frame().await.unwrap() {
            Frame::Malformed(r) => {
                assert_eq!(r.error.unwrap().code, PARSE_ERROR);
                assert_eq!(r.id, Value::Null);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
        match t.read_frame().await.unwrap() {
            Frame::Malformed(r) => {
                assert_eq!(r.error.unwrap().code, INVALID_REQUEST);
                assert_eq!(r.id, serde_json::json!(7));
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_response_is_one_line() {
        let mut t = transport("");
        t.write_response(&JsonRpcResponse::success(
            serde_json::json!(1),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
        let out = String::from_utf8(t.writer.clone()).unwrap();
        assert_eq!(out, "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n");
    }
}
