//! HTTP client for the optimization and answering agents
//!
//! Endpoints:
//! - Optimization: POST `{question}`, reply is the expansion JSON (optionally
//!   wrapped as `{text}`)
//! - Answering: POST `{prompt}`, reply is `{text}`

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::agents::{AnsweringAgent, OptimizationAgent};
use crate::errors::{RagError, Result};

/// HTTP agent client bound to a single endpoint
#[derive(Debug, Clone)]
pub struct AgentClient {
    client: Client,
    url: String,
    api_key: Option<String>,
}

/// Text envelope returned by agents
#[derive(Debug, Deserialize)]
struct AgentTextResponse {
    text: String,
}

impl AgentClient {
    /// Create a client for `url` with a per-request timeout
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

    /// POST a JSON body and return the response body as text
    async fn post(&self, body: serde_json::Value) -> Result<String> {
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RagError::Agent(format!("Failed to reach {}: {}", self.url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagError::Agent(format!("HTTP {}: {}", status, error_text)));
        }

        response
            .text()
            .await
            .map_err(|e| RagError::Agent(format!("Failed to read response: {}", e)))
    }
}

/// Unwrap a `{text}` envelope, or return the body unchanged
fn unwrap_text_envelope(body: String) -> String {
    match serde_json::from_str::<AgentTextResponse>(&body) {
        Ok(envelope) => envelope.text,
        Err(_) => body,
    }
}

#[async_trait]
impl OptimizationAgent for AgentClient {
    async fn optimize(&self, question: &str) -> Result<String> {
        let body = self.post(json!({ "question": question })).await?;
        Ok(unwrap_text_envelope(body))
    }
}

#[async_trait]
impl AnsweringAgent for AgentClient {
    async fn answer(&self, prompt: &str) -> Result<String> {
        let body = self.post(json!({ "prompt": prompt })).await?;
        let response: AgentTextResponse = serde_json::from_str(&body)
            .map_err(|e| RagError::InvalidResponse(format!("Answer is not {{text}}: {}", e)))?;

        if response.text.trim().is_empty() {
            return Err(RagError::InvalidResponse("Answer text is empty".to_string()));
        }

        Ok(response.text)
    }
}
