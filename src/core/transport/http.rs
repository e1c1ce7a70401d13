//! HTTP transport implementation.
//!
//! Stateless JSON-RPC over POST. Every request carries its own bearer token,
//! which becomes the upstream credential of that request only. Responses
//! are plain `application/json`, or a single server-sent event when the
//! caller's `Accept` header asks for `text/event-stream`.

use std::convert::Infallible;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    handler::Handler,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use super::{TransportError, TransportResult, config::HttpConfig};
use crate::core::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::core::{ContextFactory, Credential, McpServer, TransportKind};

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// Application state shared across HTTP handlers.
///
/// Holds no per-caller data: each request builds its own context.
#[derive(Clone)]
pub struct AppState {
    server: McpServer,
    contexts: ContextFactory,
    rpc_path: String,
}

impl AppState {
    pub fn new(server: McpServer, contexts: ContextFactory, rpc_path: impl Into<String>) -> Self {
        Self {
            server,
            contexts,
            rpc_path: rpc_path.into(),
        }
    }
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Run the HTTP transport until the shutdown token is cancelled.
    pub async fn run(
        self,
        server: McpServer,
        contexts: ContextFactory,
        shutdown: CancellationToken,
    ) -> TransportResult<()> {
        let addr = self.address();

        let state = AppState::new(server, contexts, self.config.rpc_path.clone());
        let app = build_router(state, &self.config);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!(
            "Ready - listening on {} (JSON-RPC over HTTP, CORS {})",
            addr, cors_status
        );
        info!("  → JSON-RPC: POST {}", self.config.rpc_path);
        info!("  → Health:   GET /health");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

/// Build the router with all HTTP routes.
///
/// OPTIONS on the RPC path always carries permissive CORS headers;
/// `enable_cors` only governs the other routes.
pub fn build_router(state: AppState, config: &HttpConfig) -> Router {
    let rpc = post(handle_rpc).options(handle_preflight.layer(permissive_cors()));

    let mut app = Router::new()
        .route(&config.rpc_path, rpc)
        .route("/health", get(health_check))
        .route("/", get(root_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Add CORS if enabled
    if config.enable_cors {
        app = app.layer(permissive_cors());
    }

    app
}

fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Root handler - provides API info.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "transport": "HTTP",
        "endpoints": {
            "rpc": state.rpc_path,
            "health": "/health"
        },
        "protocol": "JSON-RPC 2.0",
        "documentation": format!(
            "Send POST requests to {} with JSON-RPC messages and an \
             'Authorization: Bearer <token>' header",
            state.rpc_path
        )
    }))
}

/// Health check endpoint. Never authenticated, never depends on config.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": state.server.name(),
        "transport": "http"
    }))
}

/// Non-preflight OPTIONS: empty 200, CORS headers come from the route layer.
async fn handle_preflight() -> StatusCode {
    StatusCode::OK
}

/// Handle JSON-RPC requests.
#[instrument(skip_all)]
async fn handle_rpc(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    // Authentication happens before the body is even looked at
    let credential = match bearer_credential(&headers) {
        Ok(credential) => credential,
        Err(status) => {
            warn!("Rejected request without a valid bearer token");
            return unauthorized(status);
        }
    };

    let event_stream = wants_event_stream(&headers);

    let request = match JsonRpcRequest::parse(&body) {
        Ok(request) => request,
        Err(response) => return frame_response(&response, event_stream),
    };

    if request.is_notification() {
        state.server.handle_notification(&request);
        return StatusCode::ACCEPTED.into_response();
    }

    info!("Received JSON-RPC request: {}", request.method);

    let ctx = state
        .contexts
        .build(Some(credential), TransportKind::Http, None);
    let response = state.server.handle_request(request, &ctx).await;

    frame_response(&response, event_stream)
}

/// Extract the credential from `Authorization: Bearer <token>`.
pub(crate) fn bearer_credential(headers: &HeaderMap) -> Result<Credential, StatusCode> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .and_then(|(_, token)| Credential::new(token))
        .ok_or(StatusCode::UNAUTHORIZED)
}

fn unauthorized(status: StatusCode) -> Response {
    (
        status,
        [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
    )
        .into_response()
}

/// Whether the caller asked for server-sent-event framing.
fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|media| {
            media
                .split(';')
                .next()
                .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("text/event-stream"))
        })
}

/// Frame one JSON-RPC response. Both framings carry the same JSON text.
fn frame_response(response: &JsonRpcResponse, event_stream: bool) -> Response {
    let body = match response.to_json() {
        Ok(body) => body,
        Err(e) => {
            warn!("Failed to serialize JSON-RPC response: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if event_stream {
        let event = futures::stream::once(async move { Ok::<_, Infallible>(Event::default().data(body)) });
        Sse::new(event).into_response()
    } else {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body,
        )
            .into_response()
    }
}
