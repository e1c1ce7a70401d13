//! MCP Server implementation: the JSON-RPC dispatch core.
//!
//! Both transports funnel every request through [`McpServer::handle_request`],
//! which routes the method, invokes tools through the shared
//! [`ToolRegistry`] and shapes the outcome into exactly one JSON-RPC
//! `result` or `error`.
//!
//! ## Tool Architecture
//!
//! Tools are defined in `domains/tools/definitions/` with one file per area.
//! The registry is populated once at startup by
//! [`build_tool_registry`](crate::domains::tools::build_tool_registry).
//! **Adding a new tool does NOT require modifying this file!**

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use super::config::Config;
use super::context::{InvocationContext, TransportKind};
use super::protocol::{
    CallToolResult, ContentBlock, InitializeParams, JSONRPC_VERSION, JsonRpcRequest,
    JsonRpcResponse, ToolCallParams, ToolDescriptor, error_codes, methods,
    negotiate_protocol_version,
};
use crate::domains::tools::{ToolError, ToolOutput, ToolRegistry};

/// The main MCP server handler.
///
/// Cheap to clone; every clone shares the same registry and configuration.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Tool catalog shared by every transport.
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    /// Create a new MCP server over an already populated registry.
    pub fn new(config: Arc<Config>, registry: Arc<ToolRegistry>) -> Self {
        Self { config, registry }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Wire descriptors for every registered tool, sorted by name.
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.registry
            .list()
            .iter()
            .map(|definition| definition.descriptor())
            .collect()
    }

    /// Handle one JSON-RPC request (never a notification).
    #[instrument(skip_all, fields(method = %request.method, transport = %ctx.transport()))]
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        ctx: &InvocationContext,
    ) -> JsonRpcResponse {
        let id = request.id.clone().unwrap_or(Value::Null);

        if request.jsonrpc != JSONRPC_VERSION {
            return JsonRpcResponse::invalid_request(
                id,
                format!(
                    "Invalid Request: jsonrpc must be \"{JSONRPC_VERSION}\", got \"{}\"",
                    request.jsonrpc
                ),
            );
        }

        match request.method.as_str() {
            methods::INITIALIZE => {
                JsonRpcResponse::success(id, self.initialize(request.params.as_ref(), ctx))
            }
            methods::PING => JsonRpcResponse::success(id, json!({})),
            methods::TOOLS_LIST => JsonRpcResponse::success(
                id,
                json!({ "tools": self.list_tools() }),
            ),
            methods::TOOLS_CALL => self.call_tool(id, request.params, ctx).await,
            other => {
                debug!("Unknown method: {}", other);
                JsonRpcResponse::method_not_found(id, other)
            }
        }
    }

    /// Handle a notification. Notifications are never answered.
    pub fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            methods::INITIALIZED => info!("Client initialization complete"),
            method if method.starts_with(methods::NOTIFICATION_PREFIX) => {
                debug!("Notification: {}", method)
            }
            method => warn!("Ignoring notification for unknown method: {}", method),
        }
    }

    fn initialize(&self, params: Option<&Value>, ctx: &InvocationContext) -> Value {
        let params = InitializeParams::from_params(params);
        let version = negotiate_protocol_version(params.protocol_version.as_deref());

        if let Some(caller) = &params.client_info {
            info!(client = %caller.name, version = %caller.version, "Initialize");
        }

        let mut result = json!({
            "protocolVersion": version,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": self.name(),
                "version": self.version()
            }
        });

        // Operating instructions are only offered to pipe clients
        if ctx.transport() == TransportKind::Stdio && !self.config.server.instructions.is_empty()
        {
            result["instructions"] = Value::String(self.config.server.instructions.clone());
        }

        result
    }

    async fn call_tool(
        &self,
        id: Value,
        params: Option<Value>,
        ctx: &InvocationContext,
    ) -> JsonRpcResponse {
        let params: ToolCallParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::invalid_params(id, format!("Invalid params: {e}"));
            }
            None => {
                return JsonRpcResponse::invalid_params(id, "Invalid params: missing tool name");
            }
        };

        let arguments = params
            .arguments
            .unwrap_or_else(|| Value::Object(Default::default()));

        let outcome = self.registry.invoke(ctx, &params.name, arguments).await;
        shape_tool_outcome(id, outcome)
    }
}

/// Turn a handler outcome into the JSON-RPC envelope.
///
/// Unknown tools are protocol errors; every other failure is reported as an
/// error-flagged tool result so the caller can read it and self-correct.
fn shape_tool_outcome(id: Value, outcome: Result<ToolOutput, ToolError>) -> JsonRpcResponse {
    let result = match outcome {
        Ok(ToolOutput::Content(blocks)) => to_value(CallToolResult::success(blocks)),
        Ok(ToolOutput::Raw(value)) => Ok(value),
        Err(e @ ToolError::NotFound(_)) => {
            return JsonRpcResponse::error(id, error_codes::METHOD_NOT_FOUND, e.to_string());
        }
        Err(e) => {
            debug!("Tool reported error: {}", e);
            to_value(CallToolResult::error(vec![ContentBlock::text(e.to_string())]))
        }
    };

    match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::internal_error(id, format!("Failed to encode result: {e}")),
    }
}

fn to_value(result: CallToolResult) -> serde_json::Result<Value> {
    serde_json::to_value(result)
}
