//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use itemrag::agents::{AnsweringAgent, OptimizationAgent};
use itemrag::store::{HybridQuery, KnowledgeStore, StoreHit};
use itemrag::{Config, RagError, RagPipeline, Result};

/// Expansion the optimizer returns for "Was ist RAG?", wrapped in prose and a fence
pub const RAG_EXPANSION: &str = r#"Here is the expansion:
```json
{"language": "de", "core": "RAG", "synonyms": ["Retrieval Augmented Generation", "retrieval-augmented generation"],
 "phrases": ["retrieval augmented"], "entities": {}, "tags": ["rag", "llm"], "ban": [], "followup_questions": null}
```"#;

/// Optimization agent replying with fixed text
pub struct StaticOptimizer(pub String);

impl StaticOptimizer {
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self(text.to_string()))
    }
}

#[async_trait]
impl OptimizationAgent for StaticOptimizer {
    async fn optimize(&self, _question: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Answering agent replying with fixed text; records the prompts it saw
pub struct StaticAnswerer {
    pub text: String,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl StaticAnswerer {
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnsweringAgent for StaticAnswerer {
    async fn answer(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.text.clone())
    }
}

/// Stands in for any unreachable service
pub struct Failing;

#[async_trait]
impl OptimizationAgent for Failing {
    async fn optimize(&self, _question: &str) -> Result<String> {
        Err(RagError::Agent("connection refused".to_string()))
    }
}

#[async_trait]
impl AnsweringAgent for Failing {
    async fn answer(&self, _prompt: &str) -> Result<String> {
        Err(RagError::Agent("connection refused".to_string()))
    }
}

#[async_trait]
impl KnowledgeStore for Failing {
    async fn hybrid_search(&self, _query: &HybridQuery) -> Result<Vec<StoreHit>> {
        Err(RagError::Store("connection refused".to_string()))
    }
}

/// Replies only after the given delay
pub struct Slow(pub Duration);

#[async_trait]
impl OptimizationAgent for Slow {
    async fn optimize(&self, _question: &str) -> Result<String> {
        tokio::time::sleep(self.0).await;
        Ok(RAG_EXPANSION.to_string())
    }
}

#[async_trait]
impl AnsweringAgent for Slow {
    async fn answer(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(self.0).await;
        Ok("late answer".to_string())
    }
}

#[async_trait]
impl KnowledgeStore for Slow {
    async fn hybrid_search(&self, _query: &HybridQuery) -> Result<Vec<StoreHit>> {
        tokio::time::sleep(self.0).await;
        Ok(Vec::new())
    }
}

/// Store generating `count` hits per query, ids prefixed by branch.
///
/// Branches are told apart by alpha: the semantic profile uses the lower one.
pub struct GeneratedStore {
    pub count: usize,
    pub item_id: Option<String>,
    pub queries: Mutex<Vec<HybridQuery>>,
}

impl GeneratedStore {
    pub fn new(count: usize, item_id: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            count,
            item_id: item_id.map(str::to_string),
            queries: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl KnowledgeStore for GeneratedStore {
    async fn hybrid_search(&self, query: &HybridQuery) -> Result<Vec<StoreHit>> {
        self.queries.lock().unwrap().push(query.clone());
        let prefix = if query.alpha < 0.65 { "sem" } else { "kw" };

        Ok((0..self.count)
            .map(|i| StoreHit {
                id: format!("{}-{:03}", prefix, i),
                title: format!("Document {} {}", prefix, i),
                excerpt: format!("Excerpt about retrieval augmented generation #{}", i),
                score: 1.0 - i as f64 / (self.count as f64 + 1.0),
                source_item_id: self.item_id.clone(),
                source_type: "article".to_string(),
                url: None,
                tags: vec!["rag".to_string()],
            })
            .collect())
    }
}

/// Store returning fixed hits per branch
pub struct FixedStore {
    pub semantic: Vec<StoreHit>,
    pub keyword: Vec<StoreHit>,
}

#[async_trait]
impl KnowledgeStore for FixedStore {
    async fn hybrid_search(&self, query: &HybridQuery) -> Result<Vec<StoreHit>> {
        if query.alpha < 0.65 {
            Ok(self.semantic.clone())
        } else {
            Ok(self.keyword.clone())
        }
    }
}

pub fn hit(id: &str, score: f64, tags: &[&str]) -> StoreHit {
    StoreHit {
        id: id.to_string(),
        title: format!("Title {}", id),
        excerpt: format!("Excerpt {}", id),
        score,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
    }
}

/// Config with short timeouts so degraded paths finish quickly
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.timeouts.optimizer_ms = 200;
    config.timeouts.retrieval_ms = 200;
    config.timeouts.answer_ms = 200;
    config
}

pub fn pipeline(
    optimizer: Arc<dyn OptimizationAgent>,
    store: Arc<dyn KnowledgeStore>,
    answerer: Arc<dyn AnsweringAgent>,
) -> RagPipeline {
    RagPipeline::new(optimizer, store, answerer, &fast_config())
}
