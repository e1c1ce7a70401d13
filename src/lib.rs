//! Infrastructure MCP Server Library
//!
//! This crate exposes a fixed set of remote-infrastructure operations
//! (project and service management, deployments, knowledge lookups) as
//! Model Context Protocol (MCP) tools over JSON-RPC 2.0.
//!
//! # Architecture
//!
//! The server is organized into the following modules:
//!
//! - **core**: Configuration, error handling, the JSON-RPC dispatch core,
//!   invocation contexts and the transport adapters (STDIO and HTTP)
//! - **clients**: Typed clients for the upstream collaborators (platform API,
//!   knowledge service, deployment CLI)
//! - **domains**: Business logic organized by bounded contexts
//!   - **tools**: The tool registry and every tool definition
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use infra_mcp_server::clients::Upstream;
//! use infra_mcp_server::core::{Config, ContextFactory, McpServer};
//! use infra_mcp_server::domains::tools::build_tool_registry;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(Config::from_env());
//!     let upstream = Upstream::from_config(&config)?;
//!     let registry = Arc::new(build_tool_registry(config.clone(), &upstream));
//!     let server = McpServer::new(config, registry);
//!     let contexts = ContextFactory::new(upstream.connector(), CancellationToken::new());
//!     // Start a transport...
//!     Ok(())
//! }
//! ```

pub mod clients;
pub mod core;
pub mod domains;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
