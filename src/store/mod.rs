//! Knowledge store collaborator
//!
//! A hybrid (vector + BM25) search backend. Errors are reported through
//! `Result`; an empty list only ever means "no match".

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::types::query::null_as_default;

pub use client::HttpKnowledgeStore;

/// Optional scoping passed through to the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

impl SearchFilter {
    pub fn new(item_id: Option<&str>, tenant: Option<&str>) -> Self {
        Self {
            item_id: item_id.map(str::to_string),
            tenant: tenant.map(str::to_string),
        }
    }
}

/// Hybrid search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridQuery {
    pub query_text: String,
    /// Vector/keyword balance (0.0 = pure keyword, 1.0 = pure vector)
    pub alpha: f64,
    pub limit: usize,
    pub filter: SearchFilter,
}

/// Hit as returned by the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreHit {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub excerpt: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub score: f64,
    #[serde(default)]
    pub source_item_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source_type: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

/// Hybrid search backend
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn hybrid_search(&self, query: &HybridQuery) -> Result<Vec<StoreHit>>;
}
