//! Tool definitions module.
//!
//! This module exports all available tool definitions, grouped by the
//! platform area they act on.

pub mod common;
pub mod deploy;
pub mod env;
pub mod knowledge;
pub mod logs;
pub mod process;
pub mod project;
pub mod service;

pub use deploy::{DeployPushParams, DeployPushTool};
pub use env::{ServiceEnvListParams, ServiceEnvListTool, ServiceEnvSetParams, ServiceEnvSetTool};
pub use knowledge::{
    KnowledgeGetParams, KnowledgeGetTool, KnowledgeSearchParams, KnowledgeSearchTool,
    PlatformGuideParams, PlatformGuideTool,
};
pub use logs::{ServiceLogsParams, ServiceLogsTool};
pub use process::{ProcessStatusParams, ProcessStatusTool};
pub use project::{
    ProjectCreateParams, ProjectCreateTool, ProjectDeleteParams, ProjectDeleteTool,
    ProjectGetParams, ProjectGetTool, ProjectListParams, ProjectListTool,
};
pub use service::{
    ServiceActionParams, ServiceActionTool, ServiceCreateParams, ServiceCreateTool,
    ServiceDeleteParams, ServiceDeleteTool, ServiceGetParams, ServiceGetTool, ServiceListParams,
    ServiceListTool, ServiceScaleParams, ServiceScaleTool,
};
