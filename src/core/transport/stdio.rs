//! STDIO transport implementation.
//!
//! Line-delimited JSON-RPC over standard input/output. One session per
//! process: the credential is fixed at startup, requests are handled
//! strictly one at a time and responses are written in request order.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::TransportResult;
use crate::core::protocol::{ClientInfo, InitializeParams, JsonRpcRequest, JsonRpcResponse, methods};
use crate::core::{ContextFactory, Credential, McpServer, TransportKind};

/// STDIO transport handler.
pub struct StdioTransport {
    session: StdioSession,
    shutdown: CancellationToken,
}

/// State of the single STDIO session.
struct StdioSession {
    server: McpServer,
    contexts: ContextFactory,
    credential: Option<Credential>,
    caller: Option<ClientInfo>,
}

impl StdioTransport {
    /// Create a STDIO transport bound to the session credential.
    pub fn new(
        server: McpServer,
        contexts: ContextFactory,
        credential: Option<Credential>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            session: StdioSession {
                server,
                contexts,
                credential,
                caller: None,
            },
            shutdown,
        }
    }

    /// Run the STDIO transport on the process's stdin/stdout.
    pub async fn run(self) -> TransportResult<()> {
        info!("Ready - communicating via stdin/stdout");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve the session over arbitrary streams until EOF or shutdown.
    pub async fn serve<R, W>(mut self, reader: R, mut writer: W) -> TransportResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            // Raw bytes: a line that is not UTF-8 is a parse error, not an I/O failure
            let read = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, leaving STDIO loop");
                    return Ok(());
                }
                read = reader.read_until(b'\n', &mut buf) => read?,
            };

            if read == 0 {
                info!("stdin closed, shutting down");
                return Ok(());
            }

            let line = buf.trim_ascii();
            if line.is_empty() {
                continue;
            }

            let Some(response) = self.session.handle_line(line).await else {
                continue;
            };

            // Nothing is written once shutdown has begun
            if self.shutdown.is_cancelled() {
                info!("Shutdown requested, dropping pending response");
                return Ok(());
            }

            let mut frame = response.to_json()?;
            frame.push('\n');
            writer.write_all(frame.as_bytes()).await?;
            writer.flush().await?;
        }
    }
}

impl StdioSession {
    /// Handle one raw line, returning the response to write (if any).
    async fn handle_line(&mut self, line: &[u8]) -> Option<JsonRpcResponse> {
        let request = match JsonRpcRequest::parse(line) {
            Ok(request) => request,
            Err(response) => {
                warn!("Rejected malformed message on stdin");
                return Some(response);
            }
        };

        if request.is_notification() {
            self.server.handle_notification(&request);
            return None;
        }

        if request.method == methods::INITIALIZE {
            self.record_caller(&request);
        }

        debug!(method = %request.method, id = ?request.id, "Received request");

        let ctx = self
            .contexts
            .build(self.credential.clone(), TransportKind::Stdio, self.caller.clone());
        Some(self.server.handle_request(request, &ctx).await)
    }

    /// Remember who is on the other end of the pipe (advisory only).
    fn record_caller(&mut self, request: &JsonRpcRequest) {
        let params = InitializeParams::from_params(request.params.as_ref());
        if let Some(caller) = params.client_info {
            info!(client = %caller.name, version = %caller.version, "Client identified");
            self.caller = Some(caller);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{echo_registry, test_config, test_contexts};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn transport(credential: Option<&str>, shutdown: CancellationToken) -> StdioTransport {
        let server = McpServer::new(Arc::new(test_config()), Arc::new(echo_registry()));
        StdioTransport::new(
            server,
            test_contexts(),
            credential.and_then(Credential::new),
            shutdown,
        )
    }

    async fn run_lines(input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        transport(Some("pipe-token"), CancellationToken::new())
            .serve(input.as_bytes(), &mut output)
            .await
            .unwrap();

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_echo_call_matches_wire_format() {
        let mut output = Vec::new();
        let input = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"echo","arguments":{"msg":"hi"}}}"#;
        transport(Some("pipe-token"), CancellationToken::new())
            .serve(format!("{input}\n").as_bytes(), &mut output)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"content\":[{\"type\":\"text\",\"text\":\"hi\"}]}}\n"
        );
    }

    #[tokio::test]
    async fn test_responses_follow_request_order() {
        let input = [
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"test-client","version":"1.0"}}}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            r#"{"jsonrpc":"2.0","id":"two","method":"tools/list"}"#,
            "",
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"missing"}}"#,
        ]
        .join("\n");

        let responses = run_lines(&input).await;
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
        assert!(responses[0]["result"]["instructions"].is_string());
        assert_eq!(responses[1]["id"], "two");
        assert_eq!(responses[2]["id"], 3);
        assert_eq!(
            responses[2]["error"],
            json!({"code": -32601, "message": "tool not found: missing"})
        );
    }

    #[tokio::test]
    async fn test_caller_identity_reaches_handlers() {
        let input = [
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"clientInfo":{"name":"agent-x","version":"2.1"}}}"#,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"whoami","arguments":{}}}"#,
        ]
        .join("\n");

        let responses = run_lines(&input).await;
        assert_eq!(
            responses[1]["result"]["content"][0]["text"],
            "agent-x via stdio"
        );
    }

    #[tokio::test]
    async fn test_malformed_line_gets_parse_error() {
        let responses = run_lines("{oops\n").await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_gets_parse_error_and_session_continues() {
        let input: &[u8] = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\",\"x\":\"\xff\"}\n\
{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n";
        let mut output = Vec::new();
        let result = transport(Some("pipe-token"), CancellationToken::new())
            .serve(input, &mut output)
            .await;
        assert!(result.is_ok());

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_missing_credential_is_domain_error() {
        let mut output = Vec::new();
        let input = r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"needs_credential","arguments":{}}}"#;
        transport(None, CancellationToken::new())
            .serve(format!("{input}\n").as_bytes(), &mut output)
            .await
            .unwrap();

        let response: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(response["result"]["isError"], true);
        assert!(
            response["result"]["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("no credential provided")
        );
    }

    #[tokio::test]
    async fn test_shutdown_abandons_pending_read() {
        let shutdown = CancellationToken::new();
        // The peer stays open but never writes, so the read stays pending
        let (_peer, server_side) = tokio::io::duplex(1024);

        let session = transport(Some("pipe-token"), shutdown.clone());
        let handle = tokio::spawn(async move {
            let mut out = Vec::new();
            let result = session.serve(server_side, &mut out).await;
            (result, out)
        });

        shutdown.cancel();
        let (result, out) = handle.await.unwrap();
        assert!(result.is_ok());
        assert!(out.is_empty());
    }
}
