//! Tools domain module.
//!
//! This module handles all tool-related functionality for the MCP server.
//! Tools are the operations MCP clients invoke by name through `tools/call`.
//!
//! ## Architecture
//!
//! - `definitions/` - Tool implementations, one file per platform area
//! - `catalog.rs` - Builds the registry with every tool the server offers
//! - `registry.rs` - Concurrency-safe catalog and by-name invocation
//! - `handlers.rs` - Handler trait and tool output
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Tool
//!
//! 1. Add params, `execute()` and `definition()` in a file under `definitions/`
//! 2. Export it in `definitions/mod.rs`
//! 3. Register it in `catalog.rs`
//!
//! Both transports dispatch through the registry, so nothing else changes.

mod catalog;
pub mod definitions;
mod definition;
mod error;
mod handlers;
mod registry;

pub use catalog::build_tool_registry;
pub use definition::ToolDefinition;
pub use error::{ToolError, ToolResult};
pub use handlers::{FnHandler, ToolHandler, ToolOutput, handler_fn};
pub use registry::ToolRegistry;
