//! Typed client for the remote infrastructure platform API.
//!
//! Every response the tools consume is decoded into an explicit record type
//! below; nothing downstream inspects raw JSON.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use super::error::{ClientError, ClientResult};
use super::response::send_json;
use crate::core::Credential;

// ============================================================================
// Records
// ============================================================================

/// A project: the top-level container of services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

/// A service running inside a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub project_id: String,
    pub hostname: String,
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_containers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_containers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

/// Lifecycle state of an asynchronous platform process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Pending,
    Running,
    Finished,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl ProcessStatus {
    /// Whether the process will not change state anymore.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An asynchronous operation started by a mutating call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub id: String,
    pub action: String,
    pub status: ProcessStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<DateTime<Utc>>,
}

/// One runtime log line of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    pub message: String,
}

/// A service environment variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreateProject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateService {
    pub hostname: String,
    pub service_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_containers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_containers: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleService {
    pub min_containers: u32,
    pub max_containers: u32,
}

/// Lifecycle actions a service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter for a service log read.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    pub limit: u32,
    pub severity: Option<String>,
}

// ============================================================================
// Client interface
// ============================================================================

/// Operations of the infrastructure platform, bound to one credential.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    async fn list_projects(&self) -> ClientResult<Vec<Project>>;

    async fn get_project(&self, project_id: &str) -> ClientResult<Project>;

    async fn create_project(&self, request: &CreateProject) -> ClientResult<Project>;

    async fn delete_project(&self, project_id: &str) -> ClientResult<Process>;

    async fn list_services(&self, project_id: &str) -> ClientResult<Vec<Service>>;

    async fn get_service(&self, service_id: &str) -> ClientResult<Service>;

    async fn create_service(
        &self,
        project_id: &str,
        request: &CreateService,
    ) -> ClientResult<Process>;

    async fn delete_service(&self, service_id: &str) -> ClientResult<Process>;

    async fn service_action(&self, service_id: &str, action: ServiceAction)
    -> ClientResult<Process>;

    async fn scale_service(&self, service_id: &str, request: &ScaleService)
    -> ClientResult<Process>;

    async fn service_logs(&self, service_id: &str, query: &LogQuery)
    -> ClientResult<Vec<LogEntry>>;

    async fn list_env(&self, service_id: &str) -> ClientResult<Vec<EnvVar>>;

    async fn set_env(&self, service_id: &str, key: &str, value: &str) -> ClientResult<Process>;

    async fn get_process(&self, process_id: &str) -> ClientResult<Process>;
}

/// Binds a platform client to a credential.
///
/// Called once per invocation; implementations must not cache clients
/// keyed by anything but the invocation itself.
pub trait PlatformConnector: Send + Sync {
    fn connect(&self, credential: &Credential) -> Arc<dyn PlatformApi>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// Creates [`HttpPlatformClient`]s sharing one connection pool.
#[derive(Clone)]
pub struct HttpPlatformConnector {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPlatformConnector {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

impl PlatformConnector for HttpPlatformConnector {
    fn connect(&self, credential: &Credential) -> Arc<dyn PlatformApi> {
        Arc::new(HttpPlatformClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            timeout: self.timeout,
            credential: credential.clone(),
        })
    }
}

/// Platform API client authenticated with a single credential.
pub struct HttpPlatformClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    credential: Credential,
}

impl HttpPlatformClient {
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "Platform API request");
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(self.credential.expose())
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        send_json(self.request(Method::GET, path), self.timeout).await
    }
}

#[async_trait]
impl PlatformApi for HttpPlatformClient {
    #[instrument(skip(self))]
    async fn list_projects(&self) -> ClientResult<Vec<Project>> {
        self.get("/projects").await
    }

    #[instrument(skip(self))]
    async fn get_project(&self, project_id: &str) -> ClientResult<Project> {
        self.get(&format!("/projects/{project_id}")).await
    }

    #[instrument(skip_all)]
    async fn create_project(&self, request: &CreateProject) -> ClientResult<Project> {
        send_json(
            self.request(Method::POST, "/projects").json(request),
            self.timeout,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_project(&self, project_id: &str) -> ClientResult<Process> {
        send_json(
            self.request(Method::DELETE, &format!("/projects/{project_id}")),
            self.timeout,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_services(&self, project_id: &str) -> ClientResult<Vec<Service>> {
        self.get(&format!("/projects/{project_id}/services")).await
    }

    #[instrument(skip(self))]
    async fn get_service(&self, service_id: &str) -> ClientResult<Service> {
        self.get(&format!("/services/{service_id}")).await
    }

    #[instrument(skip(self, request))]
    async fn create_service(
        &self,
        project_id: &str,
        request: &CreateService,
    ) -> ClientResult<Process> {
        send_json(
            self.request(Method::POST, &format!("/projects/{project_id}/services"))
                .json(request),
            self.timeout,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_service(&self, service_id: &str) -> ClientResult<Process> {
        send_json(
            self.request(Method::DELETE, &format!("/services/{service_id}")),
            self.timeout,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn service_action(
        &self,
        service_id: &str,
        action: ServiceAction,
    ) -> ClientResult<Process> {
        send_json(
            self.request(Method::POST, &format!("/services/{service_id}/{action}")),
            self.timeout,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn scale_service(
        &self,
        service_id: &str,
        request: &ScaleService,
    ) -> ClientResult<Process> {
        send_json(
            self.request(Method::PUT, &format!("/services/{service_id}/scaling"))
                .json(request),
            self.timeout,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn service_logs(
        &self,
        service_id: &str,
        query: &LogQuery,
    ) -> ClientResult<Vec<LogEntry>> {
        let mut params = vec![("limit", query.limit.to_string())];
        if let Some(severity) = &query.severity {
            params.push(("severity", severity.clone()));
        }

        send_json(
            self.request(Method::GET, &format!("/services/{service_id}/logs"))
                .query(&params),
            self.timeout,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_env(&self, service_id: &str) -> ClientResult<Vec<EnvVar>> {
        self.get(&format!("/services/{service_id}/env")).await
    }

    #[instrument(skip(self, value))]
    async fn set_env(&self, service_id: &str, key: &str, value: &str) -> ClientResult<Process> {
        send_json(
            self.request(Method::PUT, &format!("/services/{service_id}/env/{key}"))
                .json(&json!({ "value": value })),
            self.timeout,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_process(&self, process_id: &str) -> ClientResult<Process> {
        self.get(&format!("/processes/{process_id}")).await
    }
}

#[cfg(all(test, feature = "http"))]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Path, Query},
        http::{HeaderMap, StatusCode},
        routing::{get, post},
    };
    use std::collections::HashMap;

    async fn spawn_platform() -> String {
        async fn projects(headers: HeaderMap) -> Result<Json<serde_json::Value>, StatusCode> {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if auth != "Bearer good-token" {
                return Err(StatusCode::UNAUTHORIZED);
            }
            Ok(Json(json!([
                {"id": "p1", "name": "shop", "created": "2025-01-02T03:04:05Z"}
            ])))
        }

        async fn service(Path(id): Path<String>) -> (StatusCode, Json<serde_json::Value>) {
            if id == "missing" {
                return (
                    StatusCode::NOT_FOUND,
                    Json(json!({"message": "service missing not found"})),
                );
            }
            (
                StatusCode::OK,
                Json(json!({
                    "id": id,
                    "projectId": "p1",
                    "hostname": "api",
                    "serviceType": "nodejs@20",
                    "minContainers": 1
                })),
            )
        }

        async fn action(Path((id, action)): Path<(String, String)>) -> Json<serde_json::Value> {
            Json(json!({"id": "proc-1", "action": action, "status": "pending", "serviceId": id}))
        }

        async fn logs(Query(query): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
            let limit: usize = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(0);
            let severity = query.get("severity").cloned().unwrap_or_default();
            let entries: Vec<_> = (0..limit)
                .map(|i| {
                    json!({
                        "timestamp": "2025-01-02T03:04:05Z",
                        "severity": severity,
                        "message": format!("line {i}")
                    })
                })
                .collect();
            Json(json!(entries))
        }

        async fn garbage() -> &'static str {
            "not json"
        }

        let app = Router::new()
            .route("/projects", get(projects))
            .route("/services/{id}", get(service))
            .route("/services/{id}/{action}", post(action))
            .route("/services/{id}/logs", get(logs))
            .route("/processes/{id}", get(garbage));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn client(base_url: &str, token: &str) -> Arc<dyn PlatformApi> {
        HttpPlatformConnector::new(base_url, Duration::from_secs(5))
            .unwrap()
            .connect(&Credential::new(token).unwrap())
    }

    #[tokio::test]
    async fn test_sends_bearer_and_decodes_records() {
        let base = spawn_platform().await;

        let projects = client(&base, "good-token").list_projects().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "shop");
        assert!(projects[0].created.is_some());

        let err = client(&base, "bad-token").list_projects().await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized(401)));
    }

    #[tokio::test]
    async fn test_error_status_carries_upstream_message() {
        let base = spawn_platform().await;
        let err = client(&base, "t").get_service("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("service missing not found"));

        let service = client(&base, "t").get_service("s1").await.unwrap();
        assert_eq!(service.service_type, "nodejs@20");
        assert_eq!(service.min_containers, Some(1));
        assert_eq!(service.max_containers, None);
    }

    #[tokio::test]
    async fn test_action_and_logs_query() {
        let base = spawn_platform().await;
        let api = client(&base, "t");

        let process = api.service_action("s1", ServiceAction::Restart).await.unwrap();
        assert_eq!(process.action, "restart");
        assert_eq!(process.status, ProcessStatus::Pending);
        assert!(!process.status.is_terminal());

        let logs = api
            .service_logs(
                "s1",
                &LogQuery {
                    limit: 3,
                    severity: Some("error".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[2].severity.as_deref(), Some("error"));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_invalid_response() {
        let base = spawn_platform().await;
        let err = client(&base, "t").get_process("x").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        // Grab a free port, then close it again
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{addr}"), "t")
            .list_projects()
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Connect(_) | ClientError::Transport(_)));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        async fn stalled() -> Json<serde_json::Value> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"projects": []}))
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/projects", get(stalled));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let api = HttpPlatformConnector::new(format!("http://{addr}/"), Duration::from_millis(200))
            .unwrap()
            .connect(&Credential::new("t").unwrap());
        let err = api.list_projects().await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout(_)));

        let message = crate::domains::tools::ToolError::from(err).to_string();
        assert_eq!(
            message,
            "remote call failed: upstream did not answer within 200ms"
        );
    }

    #[test]
    fn test_unknown_process_status_is_tolerated() {
        let process: Process =
            serde_json::from_value(json!({"id": "p", "action": "x", "status": "queued"})).unwrap();
        assert_eq!(process.status, ProcessStatus::Unknown);
    }
}
