//! The fixed tool catalog.

use std::sync::Arc;

use tracing::info;

use super::definitions::{
    DeployPushTool, KnowledgeGetTool, KnowledgeSearchTool, PlatformGuideTool, ProcessStatusTool,
    ProjectCreateTool, ProjectDeleteTool, ProjectGetTool, ProjectListTool, ServiceActionTool,
    ServiceCreateTool, ServiceDeleteTool, ServiceEnvListTool, ServiceEnvSetTool, ServiceGetTool,
    ServiceListTool, ServiceLogsTool, ServiceScaleTool,
};
use super::registry::ToolRegistry;
use crate::clients::Upstream;
use crate::core::config::Config;

/// Build the registry with every tool the server offers.
///
/// Called once at startup; the registry is read-only afterwards.
pub fn build_tool_registry(config: Arc<Config>, upstream: &Upstream) -> ToolRegistry {
    let registry = ToolRegistry::new();

    registry.register(ProjectListTool::definition());
    registry.register(ProjectGetTool::definition());
    registry.register(ProjectCreateTool::definition());
    registry.register(ProjectDeleteTool::definition());

    registry.register(ServiceListTool::definition());
    registry.register(ServiceGetTool::definition());
    registry.register(ServiceCreateTool::definition());
    registry.register(ServiceDeleteTool::definition());
    registry.register(ServiceActionTool::definition());
    registry.register(ServiceScaleTool::definition());
    registry.register(ServiceLogsTool::definition());
    registry.register(ServiceEnvListTool::definition());
    registry.register(ServiceEnvSetTool::definition());

    registry.register(ProcessStatusTool::definition());

    registry.register(DeployPushTool::definition(
        upstream.runner(),
        config.deploy.clone(),
        config.security.clone(),
    ));

    registry.register(KnowledgeSearchTool::definition(upstream.knowledge()));
    registry.register(KnowledgeGetTool::definition(upstream.knowledge()));
    registry.register(PlatformGuideTool::definition(upstream.guides()));

    info!("Registered {} tools", registry.len());
    registry
}
