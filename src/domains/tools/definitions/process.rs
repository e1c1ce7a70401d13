//! Platform process status tool.

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::instrument;

use super::common::{parse_params, schema_for, validate_id};
use crate::core::InvocationContext;
use crate::domains::tools::{ToolDefinition, ToolOutput, ToolResult, handler_fn};

/// Parameters for the process status tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStatusParams {
    /// Process identifier returned by a mutating tool.
    pub process_id: String,
}

/// Poll an asynchronous platform process.
pub struct ProcessStatusTool;

impl ProcessStatusTool {
    pub const NAME: &'static str = "process_status";

    pub const DESCRIPTION: &'static str = "Get the status of an asynchronous platform process \
(pending, running, finished, failed or cancelled). Returns the process record as JSON.";

    #[instrument(skip_all, fields(process_id = %params.process_id))]
    pub async fn execute(ctx: &InvocationContext, params: ProcessStatusParams) -> ToolResult<ToolOutput> {
        let process_id = validate_id("processId", &params.process_id, "the tool that started it")?;
        let process = ctx.platform()?.get_process(process_id).await?;
        ToolOutput::json(&process)
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<ProcessStatusParams>(),
            handler_fn(|ctx, args| async move {
                let params = parse_params(args)?;
                Self::execute(&ctx, params).await
            }),
        )
    }
}
