//! Typed clients for the upstream collaborators.
//!
//! - `platform` - the remote infrastructure API (bound per credential)
//! - `knowledge` - the documentation search service
//! - `guides` - a time-bounded cache of platform guides
//! - `process` - the deployment CLI, run as a subprocess

mod error;
pub mod guides;
pub mod knowledge;
pub mod platform;
pub mod process;
mod response;

use std::sync::Arc;

pub use error::{ClientError, ClientResult};
pub use guides::GuideCache;
pub use knowledge::{HttpKnowledgeClient, KnowledgeApi, KnowledgeDocument, SearchHit};
pub use platform::{
    CreateProject, CreateService, EnvVar, HttpPlatformConnector, LogEntry, LogQuery,
    PlatformApi, PlatformConnector, Process, ProcessStatus, Project, ScaleService, Service,
    ServiceAction,
};
pub use process::{CommandError, CommandInvocation, CommandOutput, CommandRunner, TokioCommandRunner};

use crate::core::Config;

/// Every upstream collaborator the tools depend on.
#[derive(Clone)]
pub struct Upstream {
    connector: Arc<dyn PlatformConnector>,
    knowledge: Arc<dyn KnowledgeApi>,
    guides: Arc<GuideCache>,
    runner: Arc<dyn CommandRunner>,
}

impl Upstream {
    /// Build the production clients from configuration.
    pub fn from_config(config: &Config) -> ClientResult<Self> {
        let timeout = config.upstream.request_timeout();
        let connector = Arc::new(HttpPlatformConnector::new(&config.upstream.api_url, timeout)?);
        let knowledge: Arc<dyn KnowledgeApi> =
            Arc::new(HttpKnowledgeClient::new(&config.upstream.knowledge_url, timeout)?);

        Ok(Self::new(
            connector,
            knowledge,
            Arc::new(TokioCommandRunner),
            config.upstream.guide_ttl(),
        ))
    }

    /// Assemble from explicit collaborators.
    pub fn new(
        connector: Arc<dyn PlatformConnector>,
        knowledge: Arc<dyn KnowledgeApi>,
        runner: Arc<dyn CommandRunner>,
        guide_ttl: std::time::Duration,
    ) -> Self {
        Self {
            guides: Arc::new(GuideCache::new(Arc::clone(&knowledge), guide_ttl)),
            connector,
            knowledge,
            runner,
        }
    }

    pub fn connector(&self) -> Arc<dyn PlatformConnector> {
        Arc::clone(&self.connector)
    }

    pub fn knowledge(&self) -> Arc<dyn KnowledgeApi> {
        Arc::clone(&self.knowledge)
    }

    pub fn guides(&self) -> Arc<GuideCache> {
        Arc::clone(&self.guides)
    }

    pub fn runner(&self) -> Arc<dyn CommandRunner> {
        Arc::clone(&self.runner)
    }
}
