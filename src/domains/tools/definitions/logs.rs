//! Service log tool.

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::common::{clamp_limit, parse_params, schema_for, validate_id};
use crate::clients::{LogEntry, LogQuery};
use crate::core::InvocationContext;
use crate::domains::tools::{ToolDefinition, ToolOutput, ToolResult, handler_fn};

const DEFAULT_LOG_LIMIT: u32 = 50;

/// Parameters for the service logs tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLogsParams {
    /// Service identifier (from service_list).
    pub service_id: String,

    /// Number of most recent lines to return (1-100, default 50).
    #[serde(default)]
    pub limit: Option<u32>,

    /// Only return lines of this severity, e.g. "error" or "warning".
    #[serde(default)]
    pub severity: Option<String>,
}

/// Read the most recent runtime log lines of a service.
pub struct ServiceLogsTool;

impl ServiceLogsTool {
    pub const NAME: &'static str = "service_logs";

    pub const DESCRIPTION: &'static str = "Read the most recent runtime logs of a service. \
Optional limit (1-100, default 50) and severity filter (e.g. 'error').";

    #[instrument(skip_all, fields(service_id = %params.service_id))]
    pub async fn execute(ctx: &InvocationContext, params: ServiceLogsParams) -> ToolResult<ToolOutput> {
        let service_id = validate_id("serviceId", &params.service_id, "service_list")?;
        let query = LogQuery {
            limit: clamp_limit(params.limit, DEFAULT_LOG_LIMIT),
            severity: params
                .severity
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
        };

        let entries = ctx.platform()?.service_logs(service_id, &query).await?;
        debug!("Fetched {} log lines", entries.len());

        if entries.is_empty() {
            let filter = query
                .severity
                .as_deref()
                .map(|s| format!(" with severity '{s}'"))
                .unwrap_or_default();
            return Ok(ToolOutput::text(format!(
                "No log lines{filter} for service {service_id}."
            )));
        }

        let lines: Vec<String> = entries.iter().map(format_entry).collect();
        Ok(ToolOutput::text(lines.join("\n")))
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<ServiceLogsParams>(),
            handler_fn(|ctx, args| async move {
                let params = parse_params(args)?;
                Self::execute(&ctx, params).await
            }),
        )
    }
}

fn format_entry(entry: &LogEntry) -> String {
    let timestamp = entry.timestamp.format("%Y-%m-%dT%H:%M:%SZ");
    match &entry.severity {
        Some(severity) => format!("{timestamp} [{severity}] {}", entry.message),
        None => format!("{timestamp} {}", entry.message),
    }
}
