//! Shared fakes and fixtures for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::clients::{
    ClientError, ClientResult, CommandError, CommandInvocation, CommandOutput, CommandRunner,
    CreateProject, CreateService, EnvVar, KnowledgeApi, KnowledgeDocument, LogEntry, LogQuery,
    PlatformApi, PlatformConnector, Process, ProcessStatus, Project, ScaleService, SearchHit,
    Service, ServiceAction, Upstream,
};
use crate::core::protocol::ContentBlock;
use crate::core::{Config, ContextFactory, Credential, McpServer};
use crate::domains::tools::{ToolDefinition, ToolError, ToolOutput, ToolRegistry, handler_fn};

fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5)
        .single()
        .unwrap_or_default()
}

fn not_found(what: &str) -> ClientError {
    ClientError::status(404, format!("{what} not found"))
}

// ============================================================================
// Platform
// ============================================================================

/// In-memory platform bound to one token.
///
/// Reads return canned records (the only project is named after the token);
/// mutating calls are recorded as "<operation> <args>" and return a pending
/// process.
pub struct FakePlatform {
    token: String,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakePlatform {
    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn pending(action: &str, service_id: Option<&str>) -> Process {
        Process {
            id: "proc-1".to_string(),
            action: action.to_string(),
            status: ProcessStatus::Pending,
            project_id: None,
            service_id: service_id.map(str::to_string),
            message: None,
            created: Some(fixed_time()),
            finished: None,
        }
    }

    fn service(id: &str) -> Service {
        let (hostname, service_type, status) = match id {
            "s2" => ("db", "postgresql@16", None),
            _ => ("api", "nodejs@20", Some("running".to_string())),
        };
        Service {
            id: id.to_string(),
            project_id: "p1".to_string(),
            hostname: hostname.to_string(),
            service_type: service_type.to_string(),
            status,
            min_containers: (id != "s2").then_some(1),
            max_containers: (id != "s2").then_some(3),
            created: None,
        }
    }
}

#[async_trait]
impl PlatformApi for FakePlatform {
    async fn list_projects(&self) -> ClientResult<Vec<Project>> {
        Ok(vec![Project {
            id: "p1".to_string(),
            name: self.token.clone(),
            description: None,
            status: None,
            created: None,
        }])
    }

    async fn get_project(&self, project_id: &str) -> ClientResult<Project> {
        if project_id == "missing" {
            return Err(not_found("project"));
        }
        Ok(Project {
            id: project_id.to_string(),
            name: "shop".to_string(),
            description: None,
            status: Some("active".to_string()),
            created: Some(fixed_time()),
        })
    }

    async fn create_project(&self, request: &CreateProject) -> ClientResult<Project> {
        self.record(format!("create_project {}", request.name));
        Ok(Project {
            id: "p-new".to_string(),
            name: request.name.clone(),
            description: request.description.clone(),
            status: Some("active".to_string()),
            created: Some(fixed_time()),
        })
    }

    async fn delete_project(&self, project_id: &str) -> ClientResult<Process> {
        self.record(format!("delete_project {project_id}"));
        Ok(Self::pending("project.delete", None))
    }

    async fn list_services(&self, _project_id: &str) -> ClientResult<Vec<Service>> {
        Ok(vec![Self::service("s1"), Self::service("s2")])
    }

    async fn get_service(&self, service_id: &str) -> ClientResult<Service> {
        if service_id == "missing" {
            return Err(not_found("service"));
        }
        Ok(Self::service(service_id))
    }

    async fn create_service(
        &self,
        project_id: &str,
        request: &CreateService,
    ) -> ClientResult<Process> {
        self.record(format!("create_service {project_id} {}", request.hostname));
        Ok(Self::pending("service.create", None))
    }

    async fn delete_service(&self, service_id: &str) -> ClientResult<Process> {
        self.record(format!("delete_service {service_id}"));
        Ok(Self::pending("service.delete", Some(service_id)))
    }

    async fn service_action(
        &self,
        service_id: &str,
        action: ServiceAction,
    ) -> ClientResult<Process> {
        self.record(format!("service_action {service_id} {action}"));
        Ok(Self::pending(&format!("service.{action}"), Some(service_id)))
    }

    async fn scale_service(
        &self,
        service_id: &str,
        request: &ScaleService,
    ) -> ClientResult<Process> {
        self.record(format!(
            "scale_service {service_id} {}..{}",
            request.min_containers, request.max_containers
        ));
        Ok(Self::pending("service.scale", Some(service_id)))
    }

    async fn service_logs(
        &self,
        service_id: &str,
        query: &LogQuery,
    ) -> ClientResult<Vec<LogEntry>> {
        if service_id == "quiet" {
            return Ok(Vec::new());
        }
        let severity = query.severity.clone().unwrap_or_else(|| "info".to_string());
        Ok((0..query.limit)
            .map(|i| LogEntry {
                timestamp: fixed_time(),
                severity: Some(severity.clone()),
                message: format!("line {i}"),
            })
            .collect())
    }

    async fn list_env(&self, _service_id: &str) -> ClientResult<Vec<EnvVar>> {
        Ok(vec![
            EnvVar {
                key: "PORT".to_string(),
                value: "3000".to_string(),
            },
            EnvVar {
                key: "DATABASE_URL".to_string(),
                value: "postgres://db:5432/app".to_string(),
            },
        ])
    }

    async fn set_env(&self, service_id: &str, key: &str, _value: &str) -> ClientResult<Process> {
        self.record(format!("set_env {service_id} {key}"));
        Ok(Self::pending("service.env", Some(service_id)))
    }

    async fn get_process(&self, process_id: &str) -> ClientResult<Process> {
        if process_id == "missing" {
            return Err(not_found("process"));
        }
        Ok(Process {
            id: process_id.to_string(),
            action: "service.restart".to_string(),
            status: ProcessStatus::Finished,
            project_id: Some("p1".to_string()),
            service_id: Some("s1".to_string()),
            message: None,
            created: Some(fixed_time()),
            finished: Some(fixed_time()),
        })
    }
}

/// Connector handing out [`FakePlatform`]s that share one call log.
#[derive(Default)]
pub struct FakeConnector {
    connections: AtomicUsize,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    /// Number of clients bound so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Mutating calls made through any bound client, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl PlatformConnector for FakeConnector {
    fn connect(&self, credential: &Credential) -> Arc<dyn PlatformApi> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        Arc::new(FakePlatform {
            token: credential.expose().to_string(),
            calls: Arc::clone(&self.calls),
        })
    }
}

// ============================================================================
// Knowledge
// ============================================================================

/// Knowledge service knowing "doc-1" and "guide-postgres".
#[derive(Default)]
pub struct FakeKnowledge {
    unavailable: bool,
    gets: AtomicUsize,
    searches: Mutex<Vec<(String, u32)>>,
}

impl FakeKnowledge {
    /// A knowledge service that cannot be reached.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Number of document fetches.
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Queries received, with their limits.
    pub fn searches(&self) -> Vec<(String, u32)> {
        self.searches.lock().clone()
    }

    fn check(&self) -> ClientResult<()> {
        if self.unavailable {
            Err(ClientError::Connect("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KnowledgeApi for FakeKnowledge {
    async fn search(&self, query: &str, limit: u32) -> ClientResult<Vec<SearchHit>> {
        self.check()?;
        self.searches.lock().push((query.to_string(), limit));
        Ok(vec![
            SearchHit {
                id: "doc-1".to_string(),
                title: "PostgreSQL".to_string(),
                score: Some(0.9),
                snippet: Some("Managed PostgreSQL services.".to_string()),
                url: None,
            },
            SearchHit {
                id: "doc-2".to_string(),
                title: "Backups".to_string(),
                score: None,
                snippet: None,
                url: Some("https://docs.platform.example/backups".to_string()),
            },
        ])
    }

    async fn get(&self, id: &str) -> ClientResult<KnowledgeDocument> {
        self.check()?;
        self.gets.fetch_add(1, Ordering::SeqCst);
        match id {
            "doc-1" | "guide-postgres" => Ok(KnowledgeDocument {
                id: id.to_string(),
                title: format!("Document {id}"),
                content: format!("Content of {id}."),
                url: None,
            }),
            _ => Err(not_found("document")),
        }
    }
}

// ============================================================================
// Command runner
// ============================================================================

/// Runner that records invocations and replays one canned result.
pub struct FakeRunner {
    result: Mutex<Option<Result<CommandOutput, CommandError>>>,
    fallback: CommandOutput,
    invocations: Mutex<Vec<CommandInvocation>>,
}

impl FakeRunner {
    /// The first run returns `result`; later runs return a clean exit.
    pub fn new(result: Result<CommandOutput, CommandError>) -> Self {
        Self {
            result: Mutex::new(Some(result)),
            fallback: CommandOutput {
                exit_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            },
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.lock().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        invocation: CommandInvocation,
        _cancel: &CancellationToken,
    ) -> Result<CommandOutput, CommandError> {
        self.invocations.lock().push(invocation);
        let canned = self.result.lock().take();
        canned.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn test_config() -> Config {
    Config::default()
}

/// Context factory over a fresh [`FakeConnector`].
pub fn test_contexts() -> ContextFactory {
    ContextFactory::new(Arc::new(FakeConnector::default()), CancellationToken::new())
}

pub fn test_upstream() -> Upstream {
    Upstream::new(
        Arc::new(FakeConnector::default()),
        Arc::new(FakeKnowledge::default()),
        Arc::new(FakeRunner::new(Ok(CommandOutput {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        }))),
        Duration::from_secs(600),
    )
}

pub fn test_server() -> McpServer {
    McpServer::new(Arc::new(test_config()), Arc::new(echo_registry()))
}

/// Text of the first content block.
pub fn output_text(output: ToolOutput) -> String {
    match output {
        ToolOutput::Content(blocks) => match blocks.into_iter().next() {
            Some(ContentBlock::Text { text }) => text,
            other => panic!("expected a text block, got {other:?}"),
        },
        ToolOutput::Raw(value) => panic!("expected content, got raw {value}"),
    }
}

/// Small registry exercising the dispatch paths:
///
/// - `echo` returns its `msg` argument, and fails without one
/// - `whoami` reports the caller name and transport
/// - `needs_credential` lists projects through the bound platform client
/// - `slow_token` yields, then returns the invocation's own credential
pub fn echo_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();

    registry.register(ToolDefinition::new(
        "echo",
        "Echo the msg argument",
        serde_json::json!({
            "type": "object",
            "properties": {"msg": {"type": "string"}},
            "required": ["msg"]
        }),
        handler_fn(|_ctx, args: Value| async move {
            match args.get("msg").and_then(Value::as_str) {
                Some(msg) => Ok(ToolOutput::text(msg)),
                None => Err(ToolError::invalid_arguments("msg is required")),
            }
        }),
    ));

    registry.register(ToolDefinition::new(
        "whoami",
        "Describe the caller",
        serde_json::json!({"type": "object", "properties": {}}),
        handler_fn(|ctx, _args| async move {
            let name = ctx
                .caller()
                .map(|caller| caller.name.clone())
                .unwrap_or_else(|| "anonymous".to_string());
            Ok(ToolOutput::text(format!("{name} via {}", ctx.transport())))
        }),
    ));

    registry.register(ToolDefinition::new(
        "needs_credential",
        "List projects visible to the credential",
        serde_json::json!({"type": "object", "properties": {}}),
        handler_fn(|ctx, _args| async move {
            let projects = ctx.platform()?.list_projects().await?;
            let names: Vec<_> = projects.into_iter().map(|p| p.name).collect();
            Ok(ToolOutput::text(names.join(",")))
        }),
    ));

    registry.register(ToolDefinition::new(
        "slow_token",
        "Return the invocation's credential after a delay",
        serde_json::json!({"type": "object", "properties": {}}),
        handler_fn(|ctx, _args| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(ToolOutput::text(ctx.credential()?.expose()))
        }),
    ));

    registry
}

/// Registry with a single `count` tool, plus the number of times it ran.
pub fn counting_registry() -> (ToolRegistry, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = ToolRegistry::new();
    let counter = Arc::clone(&calls);
    registry.register(ToolDefinition::new(
        "count",
        "Count invocations",
        serde_json::json!({"type": "object", "properties": {}}),
        handler_fn(move |_ctx, _args| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(ToolOutput::text("counted"))
            }
        }),
    ));
    (registry, calls)
}
