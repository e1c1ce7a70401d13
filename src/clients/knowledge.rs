//! Client for the external knowledge (documentation search) service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::error::{ClientError, ClientResult};
use super::response::send_json;

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A full knowledge document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Search and retrieval over the knowledge base.
#[async_trait]
pub trait KnowledgeApi: Send + Sync {
    async fn search(&self, query: &str, limit: u32) -> ClientResult<Vec<SearchHit>>;

    async fn get(&self, id: &str) -> ClientResult<KnowledgeDocument>;
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// HTTP implementation of [`KnowledgeApi`]. The service is unauthenticated.
#[derive(Clone)]
pub struct HttpKnowledgeClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpKnowledgeClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl KnowledgeApi for HttpKnowledgeClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: u32) -> ClientResult<Vec<SearchHit>> {
        let response: SearchResponse = send_json(
            self.http
                .post(format!("{}/search", self.base_url))
                .json(&SearchRequest { query, limit }),
            self.timeout,
        )
        .await?;
        Ok(response.results)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> ClientResult<KnowledgeDocument> {
        send_json(
            self.http.get(format!("{}/knowledge/{}", self.base_url, id)),
            self.timeout,
        )
        .await
    }
}
