//! Knowledge tools: documentation search, document fetch and platform guides.
//!
//! These do not act on the platform and need no credential.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::common::{clamp_limit, parse_params, require_text, schema_for, validate_id};
use crate::clients::{GuideCache, KnowledgeApi, KnowledgeDocument, SearchHit};
use crate::domains::tools::{ToolDefinition, ToolError, ToolOutput, ToolResult, handler_fn};

const DEFAULT_SEARCH_LIMIT: u32 = 5;

fn render_document(document: &KnowledgeDocument) -> String {
    let mut text = String::new();
    if !document.title.is_empty() {
        text.push_str(&format!("# {}\n\n", document.title));
    }
    text.push_str(&document.content);
    if let Some(url) = &document.url {
        text.push_str(&format!("\n\nSource: {url}"));
    }
    text
}

fn render_hit(index: usize, hit: &SearchHit) -> String {
    let mut line = format!("{}. {} [{}]", index + 1, hit.title, hit.id);
    if let Some(score) = hit.score {
        line.push_str(&format!(" (score {score:.2})"));
    }
    if let Some(snippet) = &hit.snippet {
        line.push_str(&format!("\n   {}", snippet.trim()));
    }
    if let Some(url) = &hit.url {
        line.push_str(&format!("\n   {url}"));
    }
    line
}

// ============================================================================
// knowledge_search
// ============================================================================

/// Parameters for the knowledge search tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct KnowledgeSearchParams {
    /// What to look for, in natural language.
    pub query: String,

    /// Maximum number of results (1-100, default 5).
    #[serde(default)]
    pub limit: Option<u32>,
}

pub struct KnowledgeSearchTool;

impl KnowledgeSearchTool {
    pub const NAME: &'static str = "knowledge_search";

    pub const DESCRIPTION: &'static str = "Search the platform documentation. Returns ranked \
results with their id; read one in full with knowledge_get.";

    #[instrument(skip_all, fields(query = %params.query))]
    pub async fn execute(
        knowledge: &dyn KnowledgeApi,
        params: KnowledgeSearchParams,
    ) -> ToolResult<ToolOutput> {
        let query = require_text("query", &params.query)?;
        let limit = clamp_limit(params.limit, DEFAULT_SEARCH_LIMIT);

        let hits = knowledge
            .search(query, limit)
            .await
            .map_err(ToolError::knowledge)?;
        debug!("Knowledge search returned {} hits", hits.len());

        if hits.is_empty() {
            return Ok(ToolOutput::text(format!(
                "No documentation found for '{query}'. Try broader terms."
            )));
        }

        let rendered: Vec<String> = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| render_hit(i, hit))
            .collect();
        Ok(ToolOutput::text(format!(
            "{} result(s) for '{}':\n{}",
            hits.len(),
            query,
            rendered.join("\n")
        )))
    }

    pub fn definition(knowledge: Arc<dyn KnowledgeApi>) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<KnowledgeSearchParams>(),
            handler_fn(move |_ctx, args| {
                let knowledge = Arc::clone(&knowledge);
                async move {
                    let params = parse_params(args)?;
                    Self::execute(knowledge.as_ref(), params).await
                }
            }),
        )
    }
}

// ============================================================================
// knowledge_get
// ============================================================================

/// Parameters for the knowledge get tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct KnowledgeGetParams {
    /// Document identifier (from knowledge_search).
    pub id: String,
}

pub struct KnowledgeGetTool;

impl KnowledgeGetTool {
    pub const NAME: &'static str = "knowledge_get";

    pub const DESCRIPTION: &'static str =
        "Read a documentation page in full by the id returned from knowledge_search.";

    #[instrument(skip_all, fields(id = %params.id))]
    pub async fn execute(
        knowledge: &dyn KnowledgeApi,
        params: KnowledgeGetParams,
    ) -> ToolResult<ToolOutput> {
        let id = validate_id("id", &params.id, "knowledge_search")?;
        let document = knowledge.get(id).await.map_err(|e| {
            if e.is_not_found() {
                ToolError::invalid_arguments(format!(
                    "no document with id '{id}'; use knowledge_search to find valid ids"
                ))
            } else {
                ToolError::knowledge(e)
            }
        })?;
        Ok(ToolOutput::text(render_document(&document)))
    }

    pub fn definition(knowledge: Arc<dyn KnowledgeApi>) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<KnowledgeGetParams>(),
            handler_fn(move |_ctx, args| {
                let knowledge = Arc::clone(&knowledge);
                async move {
                    let params = parse_params(args)?;
                    Self::execute(knowledge.as_ref(), params).await
                }
            }),
        )
    }
}

// ============================================================================
// platform_guide
// ============================================================================

/// Parameters for the platform guide tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PlatformGuideParams {
    /// Guide topic, for example "postgres", "nodejs" or "deploy".
    pub topic: String,
}

pub struct PlatformGuideTool;

impl PlatformGuideTool {
    pub const NAME: &'static str = "platform_guide";

    pub const DESCRIPTION: &'static str = "Get the platform guide for a topic (e.g. 'postgres', \
'nodejs', 'deploy'): recommended configuration and common pitfalls.";

    #[instrument(skip_all, fields(topic = %params.topic))]
    pub async fn execute(guides: &GuideCache, params: PlatformGuideParams) -> ToolResult<ToolOutput> {
        let topic = params.topic.trim().to_lowercase();
        let topic = validate_id("topic", &topic, "knowledge_search")?;

        let guide = guides.get(topic).await.map_err(|e| {
            if e.is_not_found() {
                ToolError::invalid_arguments(format!(
                    "no guide for topic '{topic}'; use knowledge_search to explore the documentation"
                ))
            } else {
                ToolError::knowledge(e)
            }
        })?;
        Ok(ToolOutput::text(render_document(&guide)))
    }

    pub fn definition(guides: Arc<GuideCache>) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            Self::DESCRIPTION,
            schema_for::<PlatformGuideParams>(),
            handler_fn(move |_ctx, args| {
                let guides = Arc::clone(&guides);
                async move {
                    let params = parse_params(args)?;
                    Self::execute(&guides, params).await
                }
            }),
        )
    }
}
