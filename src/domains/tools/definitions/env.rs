//! Service environment variable tools.
//!
//! Values may be secrets: they are returned to the caller but never logged.

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, instrument};

use super::common::{describe_process, parse_params, schema_for, validate_env_key, validate_id};
use crate::core::InvocationContext;
use crate::domains::tools::{ToolDefinition, ToolOutput, ToolResult, handler_fn};

// ============================================================================
// service_env_list
// ============================================================================

/// Parameters for the environment list tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEnvListParams {
    /// Service identifier (from service_list).
    pub service_id: String,
}

pub struct ServiceEnvListTool;

impl ServiceEnvListTool {
    pub const NAME: &'static str = "service_env_list";

    pub const DESCRIPTION: &'static str =
        "List the environment variables of a service as KEY=value lines.";

    #[instrument(skip_all, fields(service_id = %params.service_id))]
    pub async fn execute(ctx: &InvocationContext, params: ServiceEnvListParams) -> ToolResult<ToolOutput> {
        let service_id = validate_id("serviceId", &params.service_id, "service_list")?;
        let mut vars = ctx.platform()?.list_env(service_id).await?;

        if vars.is_empty() {
            return Ok(ToolOutput::text(format!(
                "Service {service_id} has no environment variables."
            )));
        }

        vars.sort_by(|a, b| a.key.cmp(&b.key));
        let lines: Vec<String> = vars
            .iter()
            .map(|var| format!("{}={}", var.key, var.value))
            .collect();
        Ok(ToolOutput::text(lines.join("\n")))
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<ServiceEnvListParams>(),
            handler_fn(|ctx, args| async move {
                let params = parse_params(args)?;
                Self::execute(&ctx, params).await
            }),
        )
    }
}

// ============================================================================
// service_env_set
// ============================================================================

/// Parameters for the environment set tool.
#[derive(Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEnvSetParams {
    /// Service identifier (from service_list).
    pub service_id: String,

    /// Variable name: letters, digits and '_', not starting with a digit.
    pub key: String,

    /// Variable value. May be empty.
    pub value: String,
}

impl std::fmt::Debug for ServiceEnvSetParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEnvSetParams")
            .field("service_id", &self.service_id)
            .field("key", &self.key)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

pub struct ServiceEnvSetTool;

impl ServiceEnvSetTool {
    pub const NAME: &'static str = "service_env_set";

    pub const DESCRIPTION: &'static str = "Create or update one environment variable of a \
service. The service picks it up on its next restart or deploy. Returns a process to poll \
with process_status.";

    #[instrument(skip_all, fields(service_id = %params.service_id, key = %params.key))]
    pub async fn execute(ctx: &InvocationContext, params: ServiceEnvSetParams) -> ToolResult<ToolOutput> {
        let service_id = validate_id("serviceId", &params.service_id, "service_list")?;
        let key = validate_env_key(&params.key)?;

        let process = ctx
            .platform()?
            .set_env(service_id, key, &params.value)
            .await?;
        info!("Environment variable {} updated", key);

        Ok(ToolOutput::text(format!(
            "Set {key} on service {service_id}.\n{}",
            describe_process(&process)
        )))
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<ServiceEnvSetParams>(),
            handler_fn(|ctx, args| async move {
                let params = parse_params(args)?;
                Self::execute(&ctx, params).await
            }),
        )
    }
}
