//! Pipeline runner: drives the five stages over one query.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use ulid::Ulid;

use insight_embeddings::EmbeddingProvider;
use insight_index::ChunkIndex;
use insight_reasoning::ReasoningProvider;
use insight_types::{
    Answer, Evaluation, QueryRecord, RetrievalConfig, Source, Stage, StageStatus, StageTrace,
};

use crate::analyzer::AnalyzeStage;
use crate::error::PipelineError;
use crate::evaluator::EvaluateStage;
use crate::parser::ParseStage;
use crate::retriever::RetrieveStage;
use crate::summarizer::SummarizeStage;

/// The five-stage query pipeline.
///
/// One instance serves many runs; per-run parameters are fixed from
/// the retrieval config captured at construction.
pub struct QueryPipeline {
    parse: ParseStage,
    retrieve: RetrieveStage,
    analyze: AnalyzeStage,
    summarize: SummarizeStage,
    evaluate: EvaluateStage,
}

impl QueryPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        reasoner: Arc<dyn ReasoningProvider>,
        index: Arc<ChunkIndex>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            parse: ParseStage::new(reasoner.clone()),
            retrieve: RetrieveStage::new(embedder, index, retrieval),
            analyze: AnalyzeStage::new(reasoner.clone()),
            summarize: SummarizeStage::new(reasoner.clone()),
            evaluate: EvaluateStage::new(reasoner),
        }
    }

    /// Run the full pipeline over one question.
    ///
    /// Stage failures never surface as errors: the returned record
    /// carries whatever the run produced plus its degraded and failed
    /// stage lists. Only cancellation aborts without a record, and it
    /// is observed strictly between stages.
    pub async fn run(
        &self,
        text: &str,
        session_id: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<QueryRecord, PipelineError> {
        let ulid = Ulid::new();
        let mut record = QueryRecord {
            id: ulid.to_string(),
            text: text.to_string(),
            session_id,
            timestamp: DateTime::<Utc>::from_timestamp_millis(ulid.timestamp_ms() as i64)
                .unwrap_or_else(Utc::now),
            parsed: None,
            sources: Vec::new(),
            answer: None,
            evaluations: Vec::new(),
            degraded_stages: Vec::new(),
            failed_stages: Vec::new(),
            trace: Vec::new(),
        };
        info!(query_id = %record.id, "Pipeline run starting");

        // Stage 1: Parse
        check_cancel(cancel, Stage::Parse)?;
        let started = Instant::now();
        let (parsed, status) = self.parse.run(text).await;
        record_stage(&mut record, Stage::Parse, status, started);
        record.parsed = Some(parsed.clone());

        // Stage 2: Retrieve
        check_cancel(cancel, Stage::Retrieve)?;
        let started = Instant::now();
        let (sources, status) = self.retrieve.run(text, &parsed).await;
        record_stage(&mut record, Stage::Retrieve, status, started);
        record.sources = sources;

        // Stage 3: Analyze (no fallback, failure is terminal)
        check_cancel(cancel, Stage::Analyze)?;
        let started = Instant::now();
        let analysis = match self.analyze.run(text, &parsed, &record.sources).await {
            Ok(analysis) => {
                record_stage(&mut record, Stage::Analyze, StageStatus::Completed, started);
                analysis
            }
            Err(e) => {
                warn!(query_id = %record.id, error = %e, "Run ending at analyze with partial results");
                record_stage(&mut record, Stage::Analyze, StageStatus::Failed, started);
                return Ok(record);
            }
        };

        // Stage 4: Summarize (no fallback, failure is terminal)
        check_cancel(cancel, Stage::Summarize)?;
        let started = Instant::now();
        let answer = match self
            .summarize
            .run(text, &analysis, &record.sources)
            .await
        {
            Ok(answer) => {
                record_stage(&mut record, Stage::Summarize, StageStatus::Completed, started);
                answer
            }
            Err(e) => {
                warn!(query_id = %record.id, error = %e, "Run ending at summarize with partial results");
                record_stage(&mut record, Stage::Summarize, StageStatus::Failed, started);
                return Ok(record);
            }
        };

        // Stage 5: Evaluate (failure keeps the answer, drops the score)
        check_cancel(cancel, Stage::Evaluate)?;
        let started = Instant::now();
        let evaluated = self.evaluate.run(text, &answer, &record.sources).await;
        record.answer = Some(answer);
        match evaluated {
            Ok(evaluation) => {
                record_stage(&mut record, Stage::Evaluate, StageStatus::Completed, started);
                record.evaluations.push(evaluation);
            }
            Err(e) => {
                warn!(query_id = %record.id, error = %e, "Answer delivered without evaluation");
                record_stage(&mut record, Stage::Evaluate, StageStatus::Failed, started);
            }
        }

        info!(
            query_id = %record.id,
            sources = record.sources.len(),
            degraded = record.degraded_stages.len(),
            failed = record.failed_stages.len(),
            "Pipeline run finished"
        );
        Ok(record)
    }

    /// Re-run only the judge over a stored (query, answer, sources)
    /// triple. Appending the result to the record is the caller's job.
    pub async fn evaluate_stored(
        &self,
        text: &str,
        answer: &Answer,
        sources: &[Source],
    ) -> Result<Evaluation, PipelineError> {
        self.evaluate
            .run(text, answer, sources)
            .await
            .map_err(|e| PipelineError::CapabilityUnavailable(e.to_string()))
    }
}

fn check_cancel(cancel: &CancellationToken, next: Stage) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        warn!(stage = %next, "Pipeline run cancelled");
        return Err(PipelineError::Cancelled(next));
    }
    Ok(())
}

fn record_stage(record: &mut QueryRecord, stage: Stage, status: StageStatus, started: Instant) {
    match status {
        StageStatus::Degraded => record.degraded_stages.push(stage),
        StageStatus::Failed => record.failed_stages.push(stage),
        StageStatus::Completed => {}
    }
    record.trace.push(StageTrace {
        stage,
        status,
        duration_ms: started.elapsed().as_millis() as u64,
    });
}
