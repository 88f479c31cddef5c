//! HTTP client for the hybrid search backend

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::{RagError, Result};
use crate::store::{HybridQuery, KnowledgeStore, StoreHit};

/// Knowledge store reached over HTTP (POST `HybridQuery` as JSON)
#[derive(Debug, Clone)]
pub struct HttpKnowledgeStore {
    client: Client,
    url: String,
    api_key: Option<String>,
}

/// Backends answer with either a bare list or `{hits: [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Bare(Vec<StoreHit>),
    Wrapped { hits: Vec<StoreHit> },
}

impl SearchResponse {
    fn into_hits(self) -> Vec<StoreHit> {
        match self {
            SearchResponse::Bare(hits) | SearchResponse::Wrapped { hits } => hits,
        }
    }
}

impl HttpKnowledgeStore {
    /// Create a store client with a per-request timeout
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RagError::Http)?;

        Ok(Self {
            client,
            url: url.to_string(),
            api_key: None,
        })
    }

    /// Send a bearer token with every request
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Get endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl KnowledgeStore for HttpKnowledgeStore {
    async fn hybrid_search(&self, query: &HybridQuery) -> Result<Vec<StoreHit>> {
        let mut request = self.client.post(&self.url).json(query);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RagError::Store(format!("Failed to reach {}: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(RagError::Store(format!(
                "Search failed with HTTP {}",
                response.status()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| RagError::Store(format!("Failed to parse hits: {}", e)))?;

        Ok(body.into_hits())
    }
}
