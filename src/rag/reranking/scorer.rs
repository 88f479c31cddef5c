// Fusion re-ranker: merges semantic and keyword hits into one deterministic ranking
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::config::FusionConfig;
use crate::types::{ExpandedQuery, FusedResult, RetrievalHit};

/// Merges both hit lists and scores every candidate
pub struct FusionReranker {
    config: FusionConfig,
}

impl FusionReranker {
    /// Create new re-ranker with default weights
    pub fn new() -> Self {
        Self {
            config: FusionConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Merge by id, score, sort and keep the top results.
    ///
    /// Ordering: `final_score` descending, then `score_semantic` descending,
    /// then `id` ascending.
    pub fn fuse_and_rerank(
        &self,
        results_sem: Vec<RetrievalHit>,
        results_kw: Vec<RetrievalHit>,
        expanded: &ExpandedQuery,
        item_id: Option<&str>,
    ) -> Vec<FusedResult> {
        let merged = merge_hits(results_sem.into_iter().chain(results_kw));

        let mut fused: Vec<FusedResult> = merged
            .into_values()
            .map(|hit| {
                let tag_match = tag_match(&expanded.tags, &hit.tags);
                let final_score = self.compute_score(&hit, tag_match, item_id);
                FusedResult {
                    hit,
                    tag_match,
                    final_score,
                    tier: None,
                    marker: None,
                }
            })
            .collect();

        fused.sort_by(compare_fused);
        fused.truncate(self.config.top_n);
        fused
    }

    /// Weighted sum of the score components
    pub fn compute_score(&self, hit: &RetrievalHit, tag_match: f64, item_id: Option<&str>) -> f64 {
        let same_item_boost = if hit.belongs_to(item_id) { 1.0 } else { 0.0 };

        self.config.semantic_weight * hit.score_semantic
            + self.config.bm25_weight * hit.score_bm25
            + self.config.tag_weight * tag_match
            + self.config.same_item_weight * same_item_boost
    }

    /// Get current configuration
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }
}

impl Default for FusionReranker {
    fn default() -> Self {
        Self::new()
    }
}

/// Fraction of query tags found among the hit's tags (case-insensitive).
///
/// Zero when either side has no tags.
pub fn tag_match(query_tags: &[String], hit_tags: &[String]) -> f64 {
    let wanted: HashSet<String> = query_tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    let present: HashSet<String> = hit_tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    if wanted.is_empty() || present.is_empty() {
        return 0.0;
    }

    wanted.intersection(&present).count() as f64 / wanted.len() as f64
}

/// Merge hits sharing an id, keeping the best of each score component
fn merge_hits(hits: impl Iterator<Item = RetrievalHit>) -> BTreeMap<String, RetrievalHit> {
    let mut merged: BTreeMap<String, RetrievalHit> = BTreeMap::new();

    for hit in hits {
        match merged.get_mut(&hit.id) {
            Some(existing) => absorb(existing, hit),
            None => {
                merged.insert(hit.id.clone(), hit);
            }
        }
    }

    merged
}

fn absorb(existing: &mut RetrievalHit, other: RetrievalHit) {
    existing.score_semantic = existing.score_semantic.max(other.score_semantic);
    existing.score_bm25 = existing.score_bm25.max(other.score_bm25);

    if existing.title.is_empty() {
        existing.title = other.title;
    }
    if existing.excerpt.is_empty() {
        existing.excerpt = other.excerpt;
    }
    if existing.source_type.is_empty() {
        existing.source_type = other.source_type;
    }
    if existing.source_item_id.is_none() {
        existing.source_item_id = other.source_item_id;
    }
    if existing.url.is_none() {
        existing.url = other.url;
    }
    for tag in other.tags {
        if !existing.tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            existing.tags.push(tag);
        }
    }
}

fn compare_fused(a: &FusedResult, b: &FusedResult) -> Ordering {
    b.final_score
        .total_cmp(&a.final_score)
        .then_with(|| b.hit.score_semantic.total_cmp(&a.hit.score_semantic))
        .then_with(|| a.hit.id.cmp(&b.hit.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sem(id: &str, score: f64) -> RetrievalHit {
        RetrievalHit {
            id: id.to_string(),
            title: format!("Semantic {}", id),
            score_semantic: score,
            ..Default::default()
        }
    }

    fn kw(id: &str, score: f64) -> RetrievalHit {
        RetrievalHit {
            id: id.to_string(),
            title: format!("Keyword {}", id),
            score_bm25: score,
            ..Default::default()
        }
    }

    fn tagged(mut hit: RetrievalHit, tags: &[&str]) -> RetrievalHit {
        hit.tags = tags.iter().map(|t| t.to_string()).collect();
        hit
    }

    #[test]
    fn test_documented_score_example() {
        let expanded = ExpandedQuery {
            tags: vec!["rag".into(), "search".into()],
            ..Default::default()
        };
        let fused = FusionReranker::new().fuse_and_rerank(
            vec![tagged(sem("X", 0.8), &["rag"])],
            vec![kw("X", 0.6)],
            &expanded,
            None,
        );

        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].hit.score_semantic, 0.8);
        assert_eq!(fused[0].hit.score_bm25, 0.6);
        assert_eq!(fused[0].tag_match, 0.5);
        assert!((fused[0].final_score - 0.675).abs() < 1e-9);
    }

    #[test]
    fn test_overlapping_ids_merge_once() {
        let fused = FusionReranker::new().fuse_and_rerank(
            vec![sem("a", 0.9), sem("b", 0.5)],
            vec![kw("b", 0.7), kw("c", 0.4)],
            &ExpandedQuery::default(),
            None,
        );

        let ids: Vec<&str> = fused.iter().map(|f| f.id()).collect();
        assert_eq!(ids.len(), 3);
        let b = fused.iter().find(|f| f.id() == "b").unwrap();
        assert_eq!(b.hit.score_semantic, 0.5);
        assert_eq!(b.hit.score_bm25, 0.7);
        assert_eq!(b.title(), "Semantic b");
    }

    #[test]
    fn test_truncates_to_six() {
        let sem_hits = (0..10).map(|i| sem(&format!("s{}", i), 0.1 * i as f64)).collect();
        let kw_hits = (0..10).map(|i| kw(&format!("k{}", i), 0.05 * i as f64)).collect();

        let fused = FusionReranker::new().fuse_and_rerank(sem_hits, kw_hits, &ExpandedQuery::default(), None);

        assert_eq!(fused.len(), 6);
        assert_eq!(fused[0].id(), "s9");
    }

    #[test]
    fn test_tie_break_semantic_then_id() {
        let reranker = FusionReranker::with_config(FusionConfig {
            semantic_weight: 0.5,
            bm25_weight: 0.5,
            tag_weight: 0.0,
            same_item_weight: 0.0,
            top_n: 6,
        });
        let both = |id: &str, s: f64, b: f64| RetrievalHit {
            id: id.to_string(),
            score_semantic: s,
            score_bm25: b,
            ..Default::default()
        };

        // All three score 0.375
        let fused = reranker.fuse_and_rerank(
            vec![both("b", 0.25, 0.5), both("z", 0.5, 0.25)],
            vec![both("a", 0.25, 0.5)],
            &ExpandedQuery::default(),
            None,
        );

        let ids: Vec<&str> = fused.iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec!["z", "a", "b"]);
    }

    #[test]
    fn test_same_item_boost() {
        let mut own = sem("own", 0.5);
        own.source_item_id = Some("item-1".into());
        let other = sem("other", 0.5);

        let reranker = FusionReranker::new();
        let fused = reranker.fuse_and_rerank(vec![other, own], vec![], &ExpandedQuery::default(), Some("item-1"));

        assert_eq!(fused[0].id(), "own");
        assert!((fused[0].final_score - 0.35).abs() < 1e-9);
        assert!((fused[1].final_score - 0.30).abs() < 1e-9);
    }

    #[test]
    fn test_no_boost_without_item_id() {
        let mut own = sem("own", 0.5);
        own.source_item_id = Some("item-1".into());

        let fused = FusionReranker::new().fuse_and_rerank(vec![own], vec![], &ExpandedQuery::default(), None);
        assert!((fused[0].final_score - 0.30).abs() < 1e-9);
    }

    #[test]
    fn test_tag_match() {
        let query = vec!["Rust".to_string(), "tokio".to_string()];
        assert_eq!(tag_match(&query, &["rust".to_string()]), 0.5);
        assert_eq!(tag_match(&query, &["RUST".to_string(), "Tokio".to_string()]), 1.0);
        assert_eq!(tag_match(&query, &[]), 0.0);
        assert_eq!(tag_match(&[], &["rust".to_string()]), 0.0);
    }

    #[test]
    fn test_merge_fills_missing_metadata() {
        let mut semantic = sem("a", 0.4);
        semantic.url = None;
        let mut keyword = kw("a", 0.3);
        keyword.url = Some("https://example.org/a".into());
        keyword.tags = vec!["extra".into()];

        let fused = FusionReranker::new().fuse_and_rerank(vec![semantic], vec![keyword], &ExpandedQuery::default(), None);

        assert_eq!(fused[0].hit.url.as_deref(), Some("https://example.org/a"));
        assert_eq!(fused[0].hit.tags, vec!["extra".to_string()]);
    }

    #[test]
    fn test_both_empty() {
        let fused = FusionReranker::new().fuse_and_rerank(vec![], vec![], &ExpandedQuery::default(), None);
        assert!(fused.is_empty());
    }
}
