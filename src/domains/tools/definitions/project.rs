//! Project tools.
//!
//! Projects are the top-level containers of services. Every tool here acts
//! on the platform with the caller's credential.

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, instrument};

use super::common::{
    describe_process, parse_params, require_confirmation, require_text, schema_for, validate_id,
};
use crate::clients::CreateProject;
use crate::core::InvocationContext;
use crate::domains::tools::{ToolDefinition, ToolOutput, ToolResult, handler_fn};

// ============================================================================
// project_list
// ============================================================================

/// Parameters for the project list tool (none).
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ProjectListParams {}

/// List every project the credential can access.
pub struct ProjectListTool;

impl ProjectListTool {
    pub const NAME: &'static str = "project_list";

    pub const DESCRIPTION: &'static str = "List all projects accessible with the current API \
token. Returns each project's id, name and status. Use the id as projectId in other tools.";

    #[instrument(skip_all)]
    pub async fn execute(ctx: &InvocationContext, _params: ProjectListParams) -> ToolResult<ToolOutput> {
        let projects = ctx.platform()?.list_projects().await?;
        info!("Listed {} projects", projects.len());

        if projects.is_empty() {
            return Ok(ToolOutput::text(
                "No projects found. Create one with project_create.",
            ));
        }

        let mut text = format!("Found {} project(s):\n", projects.len());
        for project in &projects {
            text.push_str(&format!("- {} [{}]", project.name, project.id));
            if let Some(status) = &project.status {
                text.push_str(&format!(" status={status}"));
            }
            if let Some(description) = &project.description {
                text.push_str(&format!(" - {description}"));
            }
            text.push('\n');
        }
        Ok(ToolOutput::text(text.trim_end()))
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<ProjectListParams>(),
            handler_fn(|ctx, args| async move {
                let params = parse_params(args)?;
                Self::execute(&ctx, params).await
            }),
        )
    }
}

// ============================================================================
// project_get
// ============================================================================

/// Parameters for the project get tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGetParams {
    /// Project identifier (from project_list).
    pub project_id: String,
}

/// Fetch one project as a structured record.
pub struct ProjectGetTool;

impl ProjectGetTool {
    pub const NAME: &'static str = "project_get";

    pub const DESCRIPTION: &'static str =
        "Get the details of one project by projectId. Returns the project record as JSON.";

    #[instrument(skip_all, fields(project_id = %params.project_id))]
    pub async fn execute(ctx: &InvocationContext, params: ProjectGetParams) -> ToolResult<ToolOutput> {
        let project_id = validate_id("projectId", &params.project_id, "project_list")?;
        let project = ctx.platform()?.get_project(project_id).await?;
        ToolOutput::json(&project)
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<ProjectGetParams>(),
            handler_fn(|ctx, args| async move {
                let params = parse_params(args)?;
                Self::execute(&ctx, params).await
            }),
        )
    }
}

// ============================================================================
// project_create
// ============================================================================

/// Parameters for the project create tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ProjectCreateParams {
    /// Human-readable project name.
    pub name: String,

    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Create a new, empty project.
pub struct ProjectCreateTool;

impl ProjectCreateTool {
    pub const NAME: &'static str = "project_create";

    pub const DESCRIPTION: &'static str = "Create a new empty project. Add services to it \
afterwards with service_create.";

    #[instrument(skip_all, fields(name = %params.name))]
    pub async fn execute(ctx: &InvocationContext, params: ProjectCreateParams) -> ToolResult<ToolOutput> {
        let name = require_text("name", &params.name)?;
        let request = CreateProject {
            name: name.to_string(),
            description: params
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        };

        let project = ctx.platform()?.create_project(&request).await?;
        info!("Created project {}", project.id);

        Ok(ToolOutput::text(format!(
            "Created project '{}' with id {}. Next: add services with service_create \
             (projectId=\"{}\").",
            project.name, project.id, project.id
        )))
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<ProjectCreateParams>(),
            handler_fn(|ctx, args| async move {
                let params = parse_params(args)?;
                Self::execute(&ctx, params).await
            }),
        )
    }
}

// ============================================================================
// project_delete
// ============================================================================

/// Parameters for the project delete tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDeleteParams {
    /// Project identifier (from project_list).
    pub project_id: String,

    /// Must be true: deleting a project removes all of its services.
    #[serde(default)]
    pub confirm: bool,
}

/// Delete a project and everything in it.
pub struct ProjectDeleteTool;

impl ProjectDeleteTool {
    pub const NAME: &'static str = "project_delete";

    pub const DESCRIPTION: &'static str = "Delete a project together with all of its services \
and data. Irreversible: requires confirm=true. Returns a process to poll with process_status.";

    #[instrument(skip_all, fields(project_id = %params.project_id))]
    pub async fn execute(ctx: &InvocationContext, params: ProjectDeleteParams) -> ToolResult<ToolOutput> {
        let project_id = validate_id("projectId", &params.project_id, "project_list")?;
        require_confirmation(
            params.confirm,
            &format!("Deleting project {project_id} and all of its services"),
        )?;

        let process = ctx.platform()?.delete_project(project_id).await?;
        info!("Project {} deletion started as process {}", project_id, process.id);
        Ok(ToolOutput::text(describe_process(&process)))
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<ProjectDeleteParams>(),
            handler_fn(|ctx, args| async move {
                let params = parse_params(args)?;
                Self::execute(&ctx, params).await
            }),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
