//! Tool Registry - central registration and dispatch for all tools.
//!
//! This module provides:
//! - A concurrency-safe catalog of tool definitions
//! - Lookup and deterministic listing for discovery
//! - Invocation by name, shared by every transport

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{error, instrument, warn};

use super::definition::ToolDefinition;
use super::error::{ToolError, ToolResult};
use super::handlers::ToolOutput;
use crate::core::InvocationContext;

/// Tool registry - manages all available tools.
///
/// Populated once at startup and then read concurrently. The lock guards
/// only map access and is never held while a handler runs.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<ToolDefinition>>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, replacing any previous one with the same name.
    pub fn register(&self, definition: ToolDefinition) {
        let name = definition.name().to_string();
        let previous = self.tools.write().insert(name.clone(), Arc::new(definition));
        if previous.is_some() {
            warn!("Tool '{}' registered twice, keeping the last definition", name);
        }
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<ToolDefinition>> {
        self.tools.read().get(name).cloned()
    }

    /// Snapshot of all tools, sorted by name.
    pub fn list(&self) -> Vec<Arc<ToolDefinition>> {
        let mut tools: Vec<_> = self.tools.read().values().cloned().collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }

    /// Get all tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.list()
            .iter()
            .map(|tool| tool.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke a tool by name.
    ///
    /// Unknown names yield [`ToolError::NotFound`]. A panicking handler is
    /// contained here and reported as an internal error; shutdown
    /// cancellation abandons the handler with [`ToolError::Cancelled`].
    #[instrument(skip(self, ctx, arguments), fields(transport = %ctx.transport()))]
    pub async fn invoke(
        &self,
        ctx: &InvocationContext,
        name: &str,
        arguments: Value,
    ) -> ToolResult<ToolOutput> {
        let Some(tool) = self.get(name) else {
            warn!("Unknown tool requested: {}", name);
            return Err(ToolError::not_found(name));
        };

        let call = AssertUnwindSafe(tool.handler().call(ctx, arguments)).catch_unwind();

        tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => {
                warn!("Tool '{}' abandoned: shutdown in progress", name);
                Err(ToolError::Cancelled)
            }
            outcome = call => match outcome {
                Ok(result) => result,
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    error!("Tool '{}' panicked: {}", name, reason);
                    Err(ToolError::internal(format!(
                        "tool '{name}' failed unexpectedly: {reason}"
                    )))
                }
            },
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
