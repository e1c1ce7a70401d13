//! Tool handler abstraction.
//!
//! A handler is a function of (invocation context, arguments) returning a
//! [`ToolOutput`] or a [`ToolError`]. The dispatch core turns both into the
//! wire shape, so handlers never build JSON-RPC envelopes themselves.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::error::{ToolError, ToolResult};
use crate::core::InvocationContext;
use crate::core::protocol::ContentBlock;

/// Successful output of a tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Typed content blocks, wrapped in a tool-result envelope.
    Content(Vec<ContentBlock>),
    /// Any JSON value, returned as the result unchanged.
    Raw(Value),
}

impl ToolOutput {
    /// A single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Content(vec![ContentBlock::text(text)])
    }

    /// A raw JSON value serialized from a record.
    pub fn json<T: Serialize>(value: &T) -> ToolResult<Self> {
        serde_json::to_value(value)
            .map(Self::Raw)
            .map_err(|e| ToolError::internal(format!("cannot encode result: {e}")))
    }
}

/// Trait implemented by every tool handler.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the tool with the given arguments.
    async fn call(&self, ctx: &InvocationContext, arguments: Value) -> ToolResult<ToolOutput>;
}

/// Adapter turning an async closure into a [`ToolHandler`].
pub struct FnHandler<F>(F);

#[async_trait::async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(InvocationContext, Value) -> Fut + Send + Sync,
    Fut: Future<Output = ToolResult<ToolOutput>> + Send,
{
    async fn call(&self, ctx: &InvocationContext, arguments: Value) -> ToolResult<ToolOutput> {
        (self.0)(ctx.clone(), arguments).await
    }
}

/// Wrap an async closure as a shareable handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(InvocationContext, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult<ToolOutput>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}
