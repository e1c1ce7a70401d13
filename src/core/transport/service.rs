//! Transport service - orchestrates different transport types.
//!
//! This service provides a unified interface for starting the MCP server
//! with different transport mechanisms. Both transports share the same
//! [`McpServer`] dispatch core; they differ only in how they resolve the
//! credential and frame messages.

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{TransportConfig, TransportResult};
use crate::core::config::CredentialsConfig;
use crate::core::{ContextFactory, McpServer};

#[cfg(feature = "stdio")]
use super::{TransportError, stdio::StdioTransport};

#[cfg(feature = "http")]
use super::http::HttpTransport;

/// Transport service - manages the transport layer for the MCP server.
pub struct TransportService {
    config: TransportConfig,
    credentials: CredentialsConfig,
    shutdown: CancellationToken,
}

impl TransportService {
    /// Create a new transport service with the given configuration.
    pub fn new(
        config: TransportConfig,
        credentials: CredentialsConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            credentials,
            shutdown,
        }
    }

    /// Get the transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Log information about the configured transport.
    pub fn log_info(&self) {
        info!("Starting transport: {}", self.config.description());
    }

    /// Start the transport with the given MCP server.
    ///
    /// This method blocks until the transport is shut down. STDIO refuses
    /// to start without a session credential unless validation is skipped.
    pub async fn run(self, server: McpServer, contexts: ContextFactory) -> TransportResult<()> {
        self.log_info();

        match self.config {
            #[cfg(feature = "stdio")]
            TransportConfig::Stdio => {
                let credential = self
                    .credentials
                    .pipe_credential()
                    .map_err(|e| TransportError::init(e.to_string()))?;
                StdioTransport::new(server, contexts, credential, self.shutdown)
                    .run()
                    .await
            }
            #[cfg(feature = "http")]
            TransportConfig::Http(cfg) => {
                HttpTransport::new(cfg)
                    .run(server, contexts, self.shutdown)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_contexts, test_server};

    #[cfg(feature = "stdio")]
    #[tokio::test]
    async fn test_stdio_refuses_to_start_without_credential() {
        let service = TransportService::new(
            TransportConfig::stdio(),
            CredentialsConfig::default(),
            CancellationToken::new(),
        );

        let err = service
            .run(test_server(), test_contexts())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InitError(_)));
        assert!(err.to_string().contains("MCP_API_TOKEN"));
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_http_bind_failure_is_reported() {
        // Hold the port so the transport cannot bind it
        let holder = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = holder.local_addr().unwrap().port();

        let service = TransportService::new(
            TransportConfig::http(port, "127.0.0.1"),
            CredentialsConfig::default(),
            CancellationToken::new(),
        );

        let err = service
            .run(test_server(), test_contexts())
            .await
            .unwrap_err();
        assert!(matches!(err, super::super::TransportError::BindError { .. }));
    }
}
