//! Deployment tool.
//!
//! Pushes a local working directory to a service by running the platform
//! CLI as a subprocess. The caller's credential reaches the CLI through an
//! environment variable, never through argv.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::common::{parse_params, require_text, schema_for, validate_id};
use crate::clients::process::DIAGNOSTIC_LINES;
use crate::clients::{CommandInvocation, CommandRunner};
use crate::core::config::{DeployConfig, SecurityConfig};
use crate::core::{InvocationContext, validate_path};
use crate::domains::tools::{ToolDefinition, ToolError, ToolOutput, ToolResult, handler_fn};

/// Parameters for the deploy tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeployPushParams {
    /// Service identifier (from service_list).
    pub service_id: String,

    /// Absolute path of the directory to deploy (must contain the build config).
    pub working_dir: String,

    /// Optional label for the new version.
    #[serde(default)]
    pub version_name: Option<String>,

    /// Also upload the .git folder.
    #[serde(default)]
    pub include_git: bool,
}

/// Build and deploy a working directory to a service.
pub struct DeployPushTool;

impl DeployPushTool {
    pub const NAME: &'static str = "deploy_push";

    pub const DESCRIPTION: &'static str = "Build and deploy a local directory to a service using \
the platform CLI. workingDir must be an absolute path to an existing directory. Waits until the \
CLI finishes and reports its output on failure.";

    /// Arguments passed to the CLI, without the program name.
    pub fn cli_args(service_id: &str, version_name: Option<&str>, include_git: bool) -> Vec<String> {
        let mut args = vec![
            "push".to_string(),
            "--serviceId".to_string(),
            service_id.to_string(),
        ];
        if let Some(version) = version_name {
            args.push("--versionName".to_string());
            args.push(version.to_string());
        }
        if include_git {
            args.push("--deployGitFolder".to_string());
        }
        args
    }

    #[instrument(skip_all, fields(service_id = %params.service_id, working_dir = %params.working_dir))]
    pub async fn execute(
        ctx: &InvocationContext,
        runner: &dyn CommandRunner,
        deploy: &DeployConfig,
        security: &SecurityConfig,
        params: DeployPushParams,
    ) -> ToolResult<ToolOutput> {
        let service_id = validate_id("serviceId", &params.service_id, "service_list")?;
        let working_dir = validate_path(&params.working_dir, security).map_err(|e| {
            warn!("Rejected working directory: {}", e);
            ToolError::invalid_arguments(format!("workingDir: {e}"))
        })?;
        let version_name = params
            .version_name
            .as_deref()
            .map(|v| require_text("versionName", v))
            .transpose()?;
        let credential = ctx.credential()?;

        let invocation = CommandInvocation {
            program: deploy.cli_program.clone(),
            args: Self::cli_args(service_id, version_name, params.include_git),
            env: vec![(deploy.token_env.clone(), credential.expose().to_string())],
            cwd: working_dir,
            timeout: deploy.timeout(),
        };

        let output = runner.run(invocation, ctx.cancellation()).await?;

        if !output.success() {
            let code = output
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "none (killed by signal)".to_string());
            warn!("Deployment of {} failed with exit code {}", service_id, code);
            return Err(ToolError::execution_failed(format!(
                "deployment of service {service_id} failed (exit code {code}):\n{}",
                output.diagnostic(DIAGNOSTIC_LINES)
            )));
        }

        info!("Deployment of {} finished", service_id);
        let mut text = format!("Deployment of service {service_id} finished successfully.");
        let tail = output.diagnostic(DIAGNOSTIC_LINES);
        if !tail.is_empty() {
            text.push_str(&format!("\n{tail}"));
        }
        Ok(ToolOutput::text(text))
    }

    pub fn definition(
        runner: Arc<dyn CommandRunner>,
        deploy: DeployConfig,
        security: SecurityConfig,
    ) -> ToolDefinition {
        let deploy = Arc::new(deploy);
        let security = Arc::new(security);

        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<DeployPushParams>(),
            handler_fn(move |ctx, args| {
                let runner = Arc::clone(&runner);
                let deploy = Arc::clone(&deploy);
                let security = Arc::clone(&security);
                async move {
                    let params = parse_params(args)?;
                    Self::execute(&ctx, runner.as_ref(), &deploy, &security, params).await
                }
            }),
        )
    }
}
