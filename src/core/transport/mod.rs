//! Transport layer for the MCP server.
//!
//! This module provides different transport implementations:
//! - **STDIO**: Line-delimited JSON-RPC over stdin/stdout - feature: `stdio`
//! - **HTTP**: JSON-RPC over POST with bearer authentication - feature: `http`
//!
//! Each transport handles the connection lifecycle and credential resolution,
//! then delegates message processing to the shared [`McpServer`] dispatch core.
//!
//! # Feature Flags
//!
//! Transport implementations are conditionally compiled based on features:
//! - `stdio` (default): STDIO transport - minimal dependencies
//! - `http` (default): HTTP transport - adds axum, tower, tower-http
//!
//! [`McpServer`]: crate::core::McpServer

mod config;
mod error;
mod service;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "stdio")]
pub mod stdio;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use service::TransportService;

// Re-export configs for convenience
#[cfg(feature = "http")]
pub use config::HttpConfig;
