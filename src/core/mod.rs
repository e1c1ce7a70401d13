//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the MCP server,
//! including error handling, configuration, the JSON-RPC dispatch core,
//! per-invocation contexts and transport layer abstractions.

pub mod config;
pub mod context;
pub mod error;
pub mod protocol;
pub mod security;
pub mod server;
pub mod shutdown;
pub mod transport;

pub use config::Config;
pub use context::{ContextFactory, Credential, InvocationContext, TransportKind};
pub use error::{Error, Result};
pub use security::{PathSecurityError, validate_path};
pub use server::McpServer;
pub use transport::{TransportConfig, TransportService};
