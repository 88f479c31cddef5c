// Retrieval engine: semantic and keyword hybrid searches against the knowledge store
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{RetrievalConfig, SearchProfile};
use crate::errors::Result;
use crate::rag::with_timeout;
use crate::store::{HybridQuery, KnowledgeStore, SearchFilter, StoreHit};
use crate::types::{ExpandedQuery, RetrievalHit, Stage};

const SEMANTIC_SYNONYMS: usize = 3;
const SEMANTIC_PHRASES: usize = 2;
const SEMANTIC_TAGS: usize = 2;

/// Runs both retrieval strategies against one store
pub struct Retriever {
    store: Arc<dyn KnowledgeStore>,
    config: RetrievalConfig,
    timeout: Duration,
}

impl Retriever {
    /// Create new retriever
    pub fn new(store: Arc<dyn KnowledgeStore>, config: RetrievalConfig, timeout: Duration) -> Self {
        Self {
            store,
            config,
            timeout,
        }
    }

    /// Vector-weighted search, reporting backend failures
    pub async fn try_retrieve_semantic(
        &self,
        expanded: &ExpandedQuery,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievalHit>> {
        let text = semantic_query_text(expanded);
        let hits = self
            .search(Stage::RetrieveSemantic, &self.config.semantic, text, filter)
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| {
                let score = finite_or_zero(hit.score);
                RetrievalHit {
                    score_semantic: score,
                    ..into_retrieval_hit(hit)
                }
            })
            .collect())
    }

    /// Keyword-weighted search, reporting backend failures
    pub async fn try_retrieve_keywords(
        &self,
        expanded: &ExpandedQuery,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievalHit>> {
        let text = keyword_query_text(expanded);
        let hits = self
            .search(Stage::RetrieveKeyword, &self.config.keyword, text, filter)
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| {
                let score = finite_or_zero(hit.score);
                RetrievalHit {
                    score_bm25: score,
                    ..into_retrieval_hit(hit)
                }
            })
            .collect())
    }

    /// Semantic retrieval; an unavailable backend yields no hits
    pub async fn retrieve_semantic(
        &self,
        expanded: &ExpandedQuery,
        item_id: Option<&str>,
        tenant: Option<&str>,
    ) -> Vec<RetrievalHit> {
        let filter = SearchFilter::new(item_id, tenant);
        self.try_retrieve_semantic(expanded, &filter)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Semantic retrieval unavailable");
                Vec::new()
            })
    }

    /// Keyword retrieval; an unavailable backend yields no hits
    pub async fn retrieve_keywords(
        &self,
        expanded: &ExpandedQuery,
        item_id: Option<&str>,
        tenant: Option<&str>,
    ) -> Vec<RetrievalHit> {
        let filter = SearchFilter::new(item_id, tenant);
        self.try_retrieve_keywords(expanded, &filter)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Keyword retrieval unavailable");
                Vec::new()
            })
    }

    async fn search(
        &self,
        stage: Stage,
        profile: &SearchProfile,
        query_text: String,
        filter: &SearchFilter,
    ) -> Result<Vec<StoreHit>> {
        if query_text.is_empty() {
            return Ok(Vec::new());
        }

        let query = HybridQuery {
            query_text,
            alpha: profile.alpha,
            limit: profile.limit,
            filter: filter.clone(),
        };

        tracing::debug!(
            stage = %stage,
            query = %query.query_text,
            alpha = query.alpha,
            limit = query.limit,
            "Searching knowledge store"
        );

        let mut hits = with_timeout(stage, self.timeout, self.store.hybrid_search(&query)).await?;
        hits.truncate(profile.limit);
        Ok(hits)
    }

    /// Get retrieval configuration
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }
}

/// Query text for semantic search: core, top synonyms, phrases and tags
pub fn semantic_query_text(expanded: &ExpandedQuery) -> String {
    let extras = expanded
        .synonyms
        .iter()
        .take(SEMANTIC_SYNONYMS)
        .chain(expanded.phrases.iter().take(SEMANTIC_PHRASES))
        .chain(expanded.tags.iter().take(SEMANTIC_TAGS));

    join_terms(expanded, extras)
}

/// Query text for keyword search: core and all tags
pub fn keyword_query_text(expanded: &ExpandedQuery) -> String {
    join_terms(expanded, expanded.tags.iter())
}

/// Core first, then extras that are neither duplicates nor banned
fn join_terms<'a>(expanded: &'a ExpandedQuery, extras: impl Iterator<Item = &'a String>) -> String {
    let mut seen = HashSet::new();
    let core = expanded.core.trim();

    std::iter::once(core)
        .filter(|core| !core.is_empty())
        .chain(
            extras
                .map(|term| term.trim())
                .filter(|term| !term.is_empty() && !expanded.is_banned(term)),
        )
        .filter(|term| seen.insert(term.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn into_retrieval_hit(hit: StoreHit) -> RetrievalHit {
    RetrievalHit {
        id: hit.id,
        title: hit.title,
        excerpt: hit.excerpt,
        score_semantic: 0.0,
        score_bm25: 0.0,
        source_item_id: hit.source_item_id,
        source_type: hit.source_type,
        url: hit.url,
        tags: hit.tags,
    }
}

fn finite_or_zero(score: f64) -> f64 {
    if score.is_finite() {
        score
    } else {
        0.0
    }
}
