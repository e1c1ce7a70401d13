//! Service tools.
//!
//! Services live inside a project. Mutating calls return a platform process
//! that the caller polls with `process_status`.

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, instrument};

use super::common::{
    describe_process, describe_service, parse_params, require_confirmation, require_text,
    schema_for, validate_hostname, validate_id, validate_scaling,
};
use crate::clients::{CreateService, ScaleService, ServiceAction};
use crate::core::InvocationContext;
use crate::domains::tools::{ToolDefinition, ToolOutput, ToolResult, handler_fn};

// ============================================================================
// service_list
// ============================================================================

/// Parameters for the service list tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceListParams {
    /// Project identifier (from project_list).
    pub project_id: String,
}

pub struct ServiceListTool;

impl ServiceListTool {
    pub const NAME: &'static str = "service_list";

    pub const DESCRIPTION: &'static str = "List the services of a project with their id, \
hostname, type, status and container range. Use the id as serviceId in other tools.";

    #[instrument(skip_all, fields(project_id = %params.project_id))]
    pub async fn execute(ctx: &InvocationContext, params: ServiceListParams) -> ToolResult<ToolOutput> {
        let project_id = validate_id("projectId", &params.project_id, "project_list")?;
        let services = ctx.platform()?.list_services(project_id).await?;
        info!("Listed {} services", services.len());

        if services.is_empty() {
            return Ok(ToolOutput::text(format!(
                "Project {project_id} has no services yet. Add one with service_create."
            )));
        }

        let lines: Vec<String> = services.iter().map(describe_service).collect();
        Ok(ToolOutput::text(format!(
            "Project {} has {} service(s):\n{}",
            project_id,
            services.len(),
            lines.join("\n")
        )))
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<ServiceListParams>(),
            handler_fn(|ctx, args| async move {
                let params = parse_params(args)?;
                Self::execute(&ctx, params).await
            }),
        )
    }
}

// ============================================================================
// service_get
// ============================================================================

/// Parameters for tools addressing one service.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceGetParams {
    /// Service identifier (from service_list).
    pub service_id: String,
}

pub struct ServiceGetTool;

impl ServiceGetTool {
    pub const NAME: &'static str = "service_get";

    pub const DESCRIPTION: &'static str =
        "Get the details of one service by serviceId. Returns the service record as JSON.";

    #[instrument(skip_all, fields(service_id = %params.service_id))]
    pub async fn execute(ctx: &InvocationContext, params: ServiceGetParams) -> ToolResult<ToolOutput> {
        let service_id = validate_id("serviceId", &params.service_id, "service_list")?;
        let service = ctx.platform()?.get_service(service_id).await?;
        ToolOutput::json(&service)
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<ServiceGetParams>(),
            handler_fn(|ctx, args| async move {
                let params = parse_params(args)?;
                Self::execute(&ctx, params).await
            }),
        )
    }
}

// ============================================================================
// service_create
// ============================================================================

/// Parameters for the service create tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCreateParams {
    /// Project identifier (from project_list).
    pub project_id: String,

    /// Service hostname: 1-25 lowercase letters or digits, starting with a letter.
    pub hostname: String,

    /// Service type with version, for example "nodejs@20" or "postgresql@16".
    /// See knowledge_search for the available types.
    pub service_type: String,

    /// Minimum number of containers (default decided by the platform).
    #[serde(default)]
    pub min_containers: Option<u32>,

    /// Maximum number of containers (default decided by the platform).
    #[serde(default)]
    pub max_containers: Option<u32>,
}

pub struct ServiceCreateTool;

impl ServiceCreateTool {
    pub const NAME: &'static str = "service_create";

    pub const DESCRIPTION: &'static str = "Create a service in a project. The hostname must be \
1-25 lowercase letters or digits starting with a letter; serviceType is e.g. 'nodejs@20'. \
Returns a process to poll with process_status.";

    #[instrument(skip_all, fields(project_id = %params.project_id, hostname = %params.hostname))]
    pub async fn execute(ctx: &InvocationContext, params: ServiceCreateParams) -> ToolResult<ToolOutput> {
        let project_id = validate_id("projectId", &params.project_id, "project_list")?;
        let hostname = validate_hostname(&params.hostname)?;
        let service_type = require_text("serviceType", &params.service_type)?;
        if let (Some(min), Some(max)) = (params.min_containers, params.max_containers) {
            validate_scaling(min, max)?;
        }

        let request = CreateService {
            hostname: hostname.to_string(),
            service_type: service_type.to_string(),
            min_containers: params.min_containers,
            max_containers: params.max_containers,
        };
        let process = ctx.platform()?.create_service(project_id, &request).await?;
        info!("Service {} creation started as process {}", hostname, process.id);

        Ok(ToolOutput::text(format!(
            "Creating service '{hostname}' ({service_type}) in project {project_id}.\n{}",
            describe_process(&process)
        )))
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<ServiceCreateParams>(),
            handler_fn(|ctx, args| async move {
                let params = parse_params(args)?;
                Self::execute(&ctx, params).await
            }),
        )
    }
}

// ============================================================================
// service_delete
// ============================================================================

/// Parameters for the service delete tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDeleteParams {
    /// Service identifier (from service_list).
    pub service_id: String,

    /// Must be true: deleting a service removes its data.
    #[serde(default)]
    pub confirm: bool,
}

pub struct ServiceDeleteTool;

impl ServiceDeleteTool {
    pub const NAME: &'static str = "service_delete";

    pub const DESCRIPTION: &'static str = "Delete a service and its data. Irreversible: requires \
confirm=true. Returns a process to poll with process_status.";

    #[instrument(skip_all, fields(service_id = %params.service_id))]
    pub async fn execute(ctx: &InvocationContext, params: ServiceDeleteParams) -> ToolResult<ToolOutput> {
        let service_id = validate_id("serviceId", &params.service_id, "service_list")?;
        require_confirmation(params.confirm, &format!("Deleting service {service_id}"))?;

        let process = ctx.platform()?.delete_service(service_id).await?;
        Ok(ToolOutput::text(describe_process(&process)))
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<ServiceDeleteParams>(),
            handler_fn(|ctx, args| async move {
                let params = parse_params(args)?;
                Self::execute(&ctx, params).await
            }),
        )
    }
}

// ============================================================================
// service_action
// ============================================================================

/// Parameters for the service action tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceActionParams {
    /// Service identifier (from service_list).
    pub service_id: String,

    /// Lifecycle action to perform.
    pub action: ServiceAction,
}

pub struct ServiceActionTool;

impl ServiceActionTool {
    pub const NAME: &'static str = "service_action";

    pub const DESCRIPTION: &'static str = "Start, stop or restart a service (action: 'start', \
'stop' or 'restart'). Returns a process to poll with process_status.";

    #[instrument(skip_all, fields(service_id = %params.service_id, action = %params.action))]
    pub async fn execute(ctx: &InvocationContext, params: ServiceActionParams) -> ToolResult<ToolOutput> {
        let service_id = validate_id("serviceId", &params.service_id, "service_list")?;
        let process = ctx
            .platform()?
            .service_action(service_id, params.action)
            .await?;
        Ok(ToolOutput::text(describe_process(&process)))
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<ServiceActionParams>(),
            handler_fn(|ctx, args| async move {
                let params = parse_params(args)?;
                Self::execute(&ctx, params).await
            }),
        )
    }
}

// ============================================================================
// service_scale
// ============================================================================

/// Parameters for the service scale tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceScaleParams {
    /// Service identifier (from service_list).
    pub service_id: String,

    /// Minimum number of containers (at least 1).
    pub min_containers: u32,

    /// Maximum number of containers (not less than minContainers).
    pub max_containers: u32,
}

pub struct ServiceScaleTool;

impl ServiceScaleTool {
    pub const NAME: &'static str = "service_scale";

    pub const DESCRIPTION: &'static str = "Set the horizontal scaling range of a service \
(minContainers..maxContainers). Returns a process to poll with process_status.";

    #[instrument(skip_all, fields(service_id = %params.service_id))]
    pub async fn execute(ctx: &InvocationContext, params: ServiceScaleParams) -> ToolResult<ToolOutput> {
        let service_id = validate_id("serviceId", &params.service_id, "service_list")?;
        validate_scaling(params.min_containers, params.max_containers)?;

        let request = ScaleService {
            min_containers: params.min_containers,
            max_containers: params.max_containers,
        };
        let process = ctx.platform()?.scale_service(service_id, &request).await?;
        Ok(ToolOutput::text(format!(
            "Scaling service {service_id} to {}..{} containers.\n{}",
            request.min_containers,
            request.max_containers,
            describe_process(&process)
        )))
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<ServiceScaleParams>(),
            handler_fn(|ctx, args| async move {
                let params = parse_params(args)?;
                Self::execute(&ctx, params).await
            }),
        )
    }
}
