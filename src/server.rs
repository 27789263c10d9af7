mod protocol;

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use protocol::{
    ClientInfo, JsonRpcRequest, JsonRpcResponse, ToolCallRequest, ToolCallResult, INTERNAL_ERROR,
    INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR,
    PROTOCOL_VERSION,
};

use crate::error::Result;
use crate::tools::ToolDispatcher;

/// Line-delimited JSON-RPC over stdio: one request per line in, one response per line out.
pub struct McpServer {
    dispatcher: Arc<ToolDispatcher>,
}

impl McpServer {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub async fn run(&self) -> Result<()> {
        info!("glinsights MCP server listening on stdio");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await?;
        info!("stdin closed, shutting down");
        Ok(())
    }

    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!("<- {line}");

            let Some(response) = self.handle_line(line).await else {
                continue;
            };

            let encoded = serde_json::to_string(&response)?;
            debug!("-> {encoded}");

            writer.write_all(encoded.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        Ok(())
    }

    /// Returns `None` for notifications.
    async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unparseable request: {e}");
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {e}"),
                ));
            }
        };

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    INVALID_REQUEST,
                    format!("Invalid request: {e}"),
                ))
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            warn!("Unexpected jsonrpc version: {}", request.jsonrpc);
        }

        let Some(id) = request.id else {
            self.handle_notification(&request.method);
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, Self::initialize(request.params)),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => {
                JsonRpcResponse::success(id, json!({ "tools": self.dispatcher.list_tools() }))
            }
            "tools/call" => self.call_tool(id, request.params).await,
            other => JsonRpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        };

        Some(response)
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => info!("Client initialized"),
            other => debug!("Ignoring notification: {other}"),
        }
    }

    fn initialize(params: Option<Value>) -> Value {
        let client = params
            .and_then(|p| p.get("clientInfo").cloned())
            .and_then(|c| serde_json::from_value::<ClientInfo>(c).ok());

        if let Some(client) = client {
            info!(
                "Client: {} {}",
                client.name,
                client.version.unwrap_or_default()
            );
        }

        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing params for tools/call");
        };

        let call: ToolCallRequest = match serde_json::from_value(params) {
            Ok(call) => call,
            Err(e) => {
                return JsonRpcResponse::failure(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid tools/call params: {e}"),
                )
            }
        };

        let result = match self.dispatcher.call(&call.name, call.arguments).await {
            Ok(value) => serde_json::to_string(&value).map(ToolCallResult::success),
            Err(err) => {
                warn!("Tool {} failed: {err}", call.name);
                serde_json::to_string(&err.to_tool_error()).map(ToolCallResult::error)
            }
        };

        match result.and_then(serde_json::to_value) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::providers::gitlab::client::testing::MockGitLab;
    use crate::providers::gitlab::GitLabProvider;
    use crate::providers::registry::testing::StaticRegistry;

    fn server(api: MockGitLab) -> McpServer {
        let provider = GitLabProvider::new(Arc::new(api), Arc::new(StaticRegistry::default()));
        let dispatcher = ToolDispatcher::new(Arc::new(provider), Some("group/app".to_string()));
        McpServer::new(Arc::new(dispatcher))
    }

    async fn exchange(server: &McpServer, input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_initialize_and_list_tools() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"clientInfo":{"name":"test","version":"1"}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
        );

        let responses = exchange(&server(MockGitLab::new()), input).await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 15);
        assert!(responses[1]["result"]["tools"][0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_tools_call_success() {
        let api = MockGitLab::new().with_document(
            "projects/group%2Fapp",
            json!({
                "id": 42,
                "name": "app",
                "path_with_namespace": "group/app",
                "web_url": "https://gitlab.example.com/group/app"
            }),
        );
        let input = r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"project_overview","arguments":{}}}"#;

        let responses = exchange(&server(api), input).await;

        let result = &responses[0]["result"];
        assert_eq!(result["isError"], false);
        let text = result["content"][0]["text"].as_str().unwrap();
        let summary: Value = serde_json::from_str(text).unwrap();
        assert_eq!(summary["id"], 42);
        assert_eq!(result["content"][0]["type"], "text");
    }

    #[tokio::test]
    async fn test_tool_failure_is_reported_in_result() {
        let input = r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"project_overview","arguments":{"project":"group/missing"}}}"#;

        let responses = exchange(&server(MockGitLab::new()), input).await;

        let result = &responses[0]["result"];
        assert_eq!(result["isError"], true);
        let error: Value =
            serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(error["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let input = concat!(
            "{not json\n",
            r#"{"jsonrpc":"2.0","id":4,"method":"resources/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":6,"method":"ping"}"#,
            "\n",
        );

        let responses = exchange(&server(MockGitLab::new()), input).await;

        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[1]["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(responses[2]["error"]["code"], INVALID_PARAMS);
        assert_eq!(responses[3]["result"], json!({}));
    }
}
