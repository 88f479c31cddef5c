// End-to-end RAG pipeline: optimize -> retrieve -> fuse -> assemble -> answer
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::agents::{AgentClient, AnsweringAgent, OptimizationAgent};
use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::errors::Result;
use crate::rag::answer::{AnswerGenerator, FALLBACK_ANSWER};
use crate::rag::context::{ContextAssembler, ContextBlock};
use crate::rag::optimizer::QuestionOptimizer;
use crate::rag::reranking::FusionReranker;
use crate::rag::retrieval::Retriever;
use crate::store::{HttpKnowledgeStore, KnowledgeStore, SearchFilter};
use crate::telemetry::RunTelemetry;
use crate::types::{ExpandedQuery, FusedResult, PipelineResult, Stage};

/// Answer returned when the caller cancels the run
pub const CANCELLED_ANSWER: &str = "The request was cancelled before an answer was produced.";

/// Stateless question-answering pipeline.
///
/// Safe to share between concurrent callers: every run builds its own
/// intermediate state and nothing is cached between runs.
pub struct RagPipeline {
    optimizer: QuestionOptimizer,
    retriever: Retriever,
    reranker: FusionReranker,
    assembler: ContextAssembler,
    generator: AnswerGenerator,
}

/// Intermediate state of one run
struct RunState {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    clock: Instant,
    question: String,
    expanded: ExpandedQuery,
    hits_sem: usize,
    hits_kw: usize,
    sources: Vec<FusedResult>,
    context: String,
    telemetry: RunTelemetry,
}

impl RunState {
    fn new(question: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            clock: Instant::now(),
            question: question.to_string(),
            expanded: ExpandedQuery::fallback(question),
            hits_sem: 0,
            hits_kw: 0,
            sources: Vec::new(),
            context: ContextBlock::placeholder().text,
            telemetry: RunTelemetry::new(),
        }
    }

    fn finish(self, answer: String, success: bool, cancelled: bool) -> PipelineResult {
        let token_estimate = PipelineResult::estimate_tokens(&self.context);

        PipelineResult {
            run_id: self.run_id,
            started_at: self.started_at,
            success: success && !cancelled,
            cancelled,
            answer,
            question: self.question,
            expanded: self.expanded,
            hits_sem: self.hits_sem,
            hits_kw: self.hits_kw,
            hits_final: self.sources.len(),
            sources: self.sources,
            context: self.context,
            total_time: self.clock.elapsed().as_secs_f64(),
            token_estimate,
            timings: self.telemetry.timings(),
            degraded: self.telemetry.degraded(),
        }
    }

    fn cancel_at(mut self, stage: Stage, stage_clock: Instant) -> PipelineResult {
        self.telemetry.cancelled(stage, stage_clock.elapsed());
        self.finish(CANCELLED_ANSWER.to_string(), false, true)
    }
}

/// Race a stage against cancellation; `None` means the run was cancelled
async fn unless_cancelled<F: Future>(cancel: &CancellationToken, stage: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = stage => Some(output),
    }
}

impl RagPipeline {
    /// Create pipeline from explicit collaborators
    pub fn new(
        optimization_agent: Arc<dyn OptimizationAgent>,
        store: Arc<dyn KnowledgeStore>,
        answering_agent: Arc<dyn AnsweringAgent>,
        config: &Config,
    ) -> Self {
        Self {
            optimizer: QuestionOptimizer::new(optimization_agent, config.timeouts.optimizer()),
            retriever: Retriever::new(store, config.retrieval.clone(), config.timeouts.retrieval()),
            reranker: FusionReranker::with_config(config.fusion.clone()),
            assembler: ContextAssembler::with_config(config.context.clone()),
            generator: AnswerGenerator::new(answering_agent, config.timeouts.answer()),
        }
    }

    /// Create pipeline backed by the HTTP services named in the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_key();

        let optimizer = AgentClient::new(&config.endpoints.optimizer_url, config.timeouts.optimizer())?
            .with_api_key(api_key.clone());
        let answerer = AgentClient::new(&config.endpoints.answer_url, config.timeouts.answer())?
            .with_api_key(api_key.clone());
        let store = HttpKnowledgeStore::new(&config.endpoints.store_url, config.timeouts.retrieval())?
            .with_api_key(api_key);

        Ok(Self::new(
            Arc::new(optimizer),
            Arc::new(store),
            Arc::new(answerer),
            config,
        ))
    }

    /// Answer a question; never fails, degrading stage by stage instead
    pub async fn process_question(
        &self,
        question: &str,
        item_id: Option<&str>,
        tenant: Option<&str>,
    ) -> PipelineResult {
        self.process_question_with_cancel(question, item_id, tenant, &CancellationToken::new())
            .await
    }

    /// Answer a question, returning promptly with a cancelled result if `cancel` fires
    pub async fn process_question_with_cancel(
        &self,
        question: &str,
        item_id: Option<&str>,
        tenant: Option<&str>,
        cancel: &CancellationToken,
    ) -> PipelineResult {
        let state = RunState::new(question);
        let span = tracing::info_span!(
            "rag_run",
            run_id = %state.run_id,
            item_id = item_id.unwrap_or("-"),
            tenant = tenant.unwrap_or("-"),
        );

        async move {
            let result = self.run(state, item_id, tenant, cancel).await;
            tracing::info!(
                success = result.success,
                cancelled = result.cancelled,
                hits_sem = result.hits_sem,
                hits_kw = result.hits_kw,
                hits_final = result.hits_final,
                total_ms = (result.total_time * 1000.0) as u64,
                "Pipeline finished"
            );
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        mut state: RunState,
        item_id: Option<&str>,
        tenant: Option<&str>,
        cancel: &CancellationToken,
    ) -> PipelineResult {
        let question = state.question.clone();

        if question.trim().is_empty() {
            state
                .telemetry
                .fallback(Stage::Optimize, state.clock.elapsed(), &"question is blank");
            return state.finish(FALLBACK_ANSWER.to_string(), false, false);
        }

        // Step 1: Expand the question
        let clock = Instant::now();
        let expansion = unless_cancelled(cancel, self.optimizer.try_optimize(&question)).await;
        match expansion {
            None => return state.cancel_at(Stage::Optimize, clock),
            Some(Ok(expanded)) => {
                state.telemetry.completed(Stage::Optimize, clock.elapsed(), 1);
                state.expanded = expanded;
            }
            Some(Err(e)) => {
                state.telemetry.fallback(Stage::Optimize, clock.elapsed(), &e);
            }
        }

        // Step 2: Both retrievals, issued concurrently
        let filter = SearchFilter::new(item_id, tenant);
        let clock = Instant::now();
        let retrievals = async {
            tokio::join!(
                async {
                    let result = self.retriever.try_retrieve_semantic(&state.expanded, &filter).await;
                    (result, clock.elapsed())
                },
                async {
                    let result = self.retriever.try_retrieve_keywords(&state.expanded, &filter).await;
                    (result, clock.elapsed())
                },
            )
        };
        let retrieved = unless_cancelled(cancel, retrievals).await;
        let ((sem, sem_time), (kw, kw_time)) = match retrieved {
            Some(pair) => pair,
            None => return state.cancel_at(Stage::RetrieveSemantic, clock),
        };

        let results_sem = match sem {
            Ok(hits) => {
                state.telemetry.completed(Stage::RetrieveSemantic, sem_time, hits.len());
                hits
            }
            Err(e) => {
                state.telemetry.fallback(Stage::RetrieveSemantic, sem_time, &e);
                Vec::new()
            }
        };
        let results_kw = match kw {
            Ok(hits) => {
                state.telemetry.completed(Stage::RetrieveKeyword, kw_time, hits.len());
                hits
            }
            Err(e) => {
                state.telemetry.fallback(Stage::RetrieveKeyword, kw_time, &e);
                Vec::new()
            }
        };
        state.hits_sem = results_sem.len();
        state.hits_kw = results_kw.len();

        // Step 3: Fuse and re-rank
        let clock = Instant::now();
        let fused = self
            .reranker
            .fuse_and_rerank(results_sem, results_kw, &state.expanded, item_id);
        state.telemetry.completed(Stage::Fuse, clock.elapsed(), fused.len());

        // Step 4: Assemble context
        let clock = Instant::now();
        let block = self.assembler.assemble_context(&fused, item_id);
        if block.is_placeholder() {
            state
                .telemetry
                .fallback(Stage::Assemble, clock.elapsed(), &"no results survived fusion");
        } else {
            state.telemetry.completed(Stage::Assemble, clock.elapsed(), block.len());
        }
        state.sources = block.entries;
        state.context = block.text;

        if cancel.is_cancelled() {
            return state.cancel_at(Stage::Answer, Instant::now());
        }

        // Step 5: Generate the answer
        let clock = Instant::now();
        let answer = unless_cancelled(cancel, self.generator.try_answer(&question, &state.context)).await;
        match answer {
            None => state.cancel_at(Stage::Answer, clock),
            Some(Ok(answer)) => {
                state.telemetry.completed(Stage::Answer, clock.elapsed(), 1);
                state.finish(answer, true, false)
            }
            Some(Err(e)) => {
                state.telemetry.fallback(Stage::Answer, clock.elapsed(), &e);
                state.finish(FALLBACK_ANSWER.to_string(), false, false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RagError;
    use crate::rag::context::NO_CONTEXT_TEXT;
    use crate::store::{HybridQuery, StoreHit};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedOptimizer(&'static str);

    #[async_trait]
    impl OptimizationAgent for FixedOptimizer {
        async fn optimize(&self, _question: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FixedAnswer;

    #[async_trait]
    impl AnsweringAgent for FixedAnswer {
        async fn answer(&self, _prompt: &str) -> Result<String> {
            Ok("Grounded answer [#C1]".to_string())
        }
    }

    struct StalledAnswer;

    #[async_trait]
    impl AnsweringAgent for StalledAnswer {
        async fn answer(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("never".to_string())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl OptimizationAgent for Unreachable {
        async fn optimize(&self, _question: &str) -> Result<String> {
            Err(RagError::Agent("connection refused".to_string()))
        }
    }

    #[async_trait]
    impl AnsweringAgent for Unreachable {
        async fn answer(&self, _prompt: &str) -> Result<String> {
            Err(RagError::Agent("connection refused".to_string()))
        }
    }

    #[async_trait]
    impl KnowledgeStore for Unreachable {
        async fn hybrid_search(&self, _query: &HybridQuery) -> Result<Vec<StoreHit>> {
            Err(RagError::Store("connection refused".to_string()))
        }
    }

    /// Returns the same two hits for every query; alpha tells the branches apart
    struct TwoHitStore;

    #[async_trait]
    impl KnowledgeStore for TwoHitStore {
        async fn hybrid_search(&self, query: &HybridQuery) -> Result<Vec<StoreHit>> {
            let score = if query.alpha < 0.65 { 0.8 } else { 0.6 };
            Ok(vec![
                StoreHit {
                    id: "doc-1".to_string(),
                    title: "Retrieval augmented generation".to_string(),
                    excerpt: "RAG combines search with generation.".to_string(),
                    score,
                    tags: vec!["rag".to_string()],
                    ..Default::default()
                },
                StoreHit {
                    id: "doc-2".to_string(),
                    title: "Vector stores".to_string(),
                    excerpt: "Embeddings are stored for similarity search.".to_string(),
                    score: score / 2.0,
                    ..Default::default()
                },
            ])
        }
    }

    const EXPANSION: &str = r#"{"language":"de","core":"RAG","tags":["rag","search"]}"#;

    fn pipeline(
        optimizer: Arc<dyn OptimizationAgent>,
        store: Arc<dyn KnowledgeStore>,
        answerer: Arc<dyn AnsweringAgent>,
    ) -> RagPipeline {
        let mut config = Config::default();
        config.timeouts.answer_ms = 50;
        RagPipeline::new(optimizer, store, answerer, &config)
    }

    #[tokio::test]
    async fn test_happy_path() {
        let rag = pipeline(
            Arc::new(FixedOptimizer(EXPANSION)),
            Arc::new(TwoHitStore),
            Arc::new(FixedAnswer),
        );

        let result = rag.process_question("Was ist RAG?", None, None).await;

        assert!(result.success);
        assert!(!result.cancelled);
        assert_eq!(result.answer, "Grounded answer [#C1]");
        assert_eq!(result.expanded.core, "RAG");
        assert_eq!(result.hits_sem, 2);
        assert_eq!(result.hits_kw, 2);
        assert_eq!(result.hits_final, result.sources.len());
        assert_eq!(result.sources[0].id(), "doc-1");
        assert_eq!(result.sources[0].marker.as_deref(), Some("#C1"));
        assert!(result.context.contains("[#C1] Retrieval augmented generation"));
        assert!(result.degraded.is_empty());
        assert_eq!(
            result.token_estimate,
            PipelineResult::estimate_tokens(&result.context)
        );
    }

    #[tokio::test]
    async fn test_everything_down_still_returns() {
        let down = Arc::new(Unreachable);
        let rag = pipeline(down.clone(), down.clone(), down);

        let result = rag.process_question("Was ist RAG?", Some("item-1"), None).await;

        assert!(!result.success);
        assert_eq!(result.answer, FALLBACK_ANSWER);
        assert_eq!(result.expanded, ExpandedQuery::fallback("Was ist RAG?"));
        assert_eq!(result.hits_final, 0);
        assert_eq!(result.context, NO_CONTEXT_TEXT);
        assert_eq!(
            result.degraded,
            vec![
                Stage::Optimize,
                Stage::RetrieveSemantic,
                Stage::RetrieveKeyword,
                Stage::Assemble,
                Stage::Answer
            ]
        );
    }

    #[tokio::test]
    async fn test_answer_timeout_falls_back() {
        let rag = pipeline(
            Arc::new(FixedOptimizer(EXPANSION)),
            Arc::new(TwoHitStore),
            Arc::new(StalledAnswer),
        );

        let result = rag.process_question("Was ist RAG?", None, None).await;

        assert!(!result.success);
        assert_eq!(result.answer, FALLBACK_ANSWER);
        assert_eq!(result.hits_final, 2);
        assert_eq!(result.degraded, vec![Stage::Answer]);
    }

    #[tokio::test]
    async fn test_blank_question_skips_collaborators() {
        let rag = pipeline(
            Arc::new(FixedOptimizer(EXPANSION)),
            Arc::new(TwoHitStore),
            Arc::new(FixedAnswer),
        );

        let result = rag.process_question("   ", None, None).await;

        assert!(!result.success);
        assert_eq!(result.hits_sem, 0);
        assert_eq!(result.hits_kw, 0);
        assert_eq!(result.context, NO_CONTEXT_TEXT);
        assert_eq!(result.degraded, vec![Stage::Optimize]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let rag = pipeline(
            Arc::new(FixedOptimizer(EXPANSION)),
            Arc::new(TwoHitStore),
            Arc::new(FixedAnswer),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = rag
            .process_question_with_cancel("Was ist RAG?", None, None, &cancel)
            .await;

        assert!(result.cancelled);
        assert!(!result.success);
        assert_eq!(result.answer, CANCELLED_ANSWER);
        assert_eq!(result.hits_final, 0);
    }

    #[tokio::test]
    async fn test_cancel_during_answer() {
        let mut config = Config::default();
        config.timeouts.answer_ms = 30_000;
        let rag = RagPipeline::new(
            Arc::new(FixedOptimizer(EXPANSION)),
            Arc::new(TwoHitStore),
            Arc::new(StalledAnswer),
            &config,
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = rag
            .process_question_with_cancel("Was ist RAG?", None, None, &cancel)
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(result.cancelled);
        assert_eq!(result.hits_final, 2);
        assert_eq!(result.sources.len(), 2);
    }
}
