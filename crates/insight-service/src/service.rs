//! The `InsightService` facade and its operation result shapes.

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use insight_embeddings::EmbeddingProvider;
use insight_index::ChunkIndex;
use insight_ingest::Ingestor;
use insight_pipeline::QueryPipeline;
use insight_reasoning::ReasoningProvider;
use insight_storage::HistoryStore;
use insight_types::{Evaluation, QueryRecord, Settings};

use crate::error::ServiceError;

/// Longest answer excerpt returned in history listings
const SUMMARY_MAX_LEN: usize = 200;

/// Largest accepted history page size
const MAX_PAGE_SIZE: usize = 100;

/// Result of ingesting one document
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub chunk_count: usize,
    pub failed_chunk_count: usize,
}

/// One row in a history listing
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub query_id: String,
    pub text: String,
    pub answer_summary: String,
    pub evaluation_score: Option<f32>,
}

/// One page of history rows, newest-first
#[derive(Debug, Clone, Serialize)]
pub struct HistoryListing {
    pub entries: Vec<HistoryEntry>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Aggregate collection statistics
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub document_count: usize,
    pub chunk_count: usize,
    pub query_count: usize,
    pub average_evaluation_score: Option<f32>,
}

/// Facade over the whole engine: ingestion, querying, history, stats.
pub struct InsightService {
    ingestor: Ingestor,
    pipeline: QueryPipeline,
    index: Arc<ChunkIndex>,
    store: HistoryStore,
}

impl InsightService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        reasoner: Arc<dyn ReasoningProvider>,
        index: Arc<ChunkIndex>,
        store: HistoryStore,
        settings: &Settings,
    ) -> Self {
        Self {
            ingestor: Ingestor::new(embedder.clone(), index.clone(), settings.chunking.clone()),
            pipeline: QueryPipeline::new(
                embedder,
                reasoner,
                index.clone(),
                settings.retrieval.clone(),
            ),
            index,
            store,
        }
    }

    /// Ingest one document's extracted text: chunk, embed, index, and
    /// record. A partially embedded document is still recorded, with
    /// its failed chunk count on the report.
    #[instrument(skip(self, text), fields(filename = filename))]
    pub async fn ingest_document(
        &self,
        text: &str,
        filename: &str,
        content_type: &str,
    ) -> Result<IngestReport, ServiceError> {
        let (document, _chunks) = self.ingestor.ingest(text, filename, content_type).await?;
        self.store.put_document(&document)?;

        info!(
            document_id = %document.id,
            chunks = document.chunk_count,
            failed = document.failed_chunk_count,
            "Document ingested"
        );
        Ok(IngestReport {
            document_id: document.id,
            chunk_count: document.chunk_count,
            failed_chunk_count: document.failed_chunk_count,
        })
    }

    /// Remove a document and every index entry derived from it.
    #[instrument(skip(self))]
    pub async fn remove_document(&self, document_id: &str) -> Result<(), ServiceError> {
        if self.store.get_document(document_id)?.is_none() {
            return Err(ServiceError::NotFound(format!("document {}", document_id)));
        }

        // Record first, index second: a failure in between strands index
        // entries for a gone document rather than leaving a document
        // record with no retrievable chunks.
        self.store.delete_document(document_id)?;
        let removed = self.index.remove_document(document_id);
        self.index.save()?;

        info!(document_id, removed_entries = removed, "Document removed");
        Ok(())
    }

    /// Run the five-stage pipeline over a question and persist the run.
    ///
    /// The record is written after the run completes, so a cancelled
    /// run leaves no history entry.
    #[instrument(skip(self, text, cancel))]
    pub async fn run_query(
        &self,
        text: &str,
        session_id: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<QueryRecord, ServiceError> {
        if text.trim().is_empty() {
            return Err(ServiceError::Validation("query text is empty".to_string()));
        }
        if let Some(session) = &session_id {
            validate_session_id(session)?;
        }

        let record = self.pipeline.run(text, session_id, cancel).await?;
        self.store.append_query(&record)?;
        Ok(record)
    }

    /// Re-run the judge over a stored run and append the result.
    #[instrument(skip(self))]
    pub async fn re_evaluate(&self, query_id: &str) -> Result<Evaluation, ServiceError> {
        let record = self
            .store
            .get_query(query_id)
            .map_err(absorb_bad_key(query_id))?
            .ok_or_else(|| ServiceError::NotFound(format!("query {}", query_id)))?;

        let answer = record.answer.as_ref().ok_or_else(|| {
            ServiceError::NotFound(format!("query {} has no stored answer", query_id))
        })?;

        let evaluation = self
            .pipeline
            .evaluate_stored(&record.text, answer, &record.sources)
            .await?;
        self.store.append_evaluation(query_id, evaluation.clone())?;

        info!(query_id, score = evaluation.score, "Re-evaluation appended");
        Ok(evaluation)
    }

    /// Page through past runs, newest-first, optionally scoped to a
    /// session. Pages are 1-based.
    #[instrument(skip(self))]
    pub fn list_history(
        &self,
        session_id: Option<&str>,
        page: usize,
        page_size: usize,
    ) -> Result<HistoryListing, ServiceError> {
        if page == 0 {
            return Err(ServiceError::Validation("page is 1-based".to_string()));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ServiceError::Validation(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if let Some(session) = session_id {
            validate_session_id(session)?;
        }

        let offset = (page - 1) * page_size;
        let history = self.store.list_queries(session_id, offset, page_size)?;

        let entries = history
            .records
            .into_iter()
            .map(|record| HistoryEntry {
                answer_summary: record.answer_summary(SUMMARY_MAX_LEN),
                evaluation_score: record.latest_evaluation().map(|e| e.score),
                query_id: record.id,
                text: record.text,
            })
            .collect();

        Ok(HistoryListing {
            entries,
            total: history.total,
            page,
            page_size,
        })
    }

    /// Aggregate counts over documents, chunks, and runs.
    #[instrument(skip(self))]
    pub fn get_collection_stats(&self) -> Result<CollectionStats, ServiceError> {
        Ok(CollectionStats {
            document_count: self.store.document_count()?,
            chunk_count: self.index.stats().entry_count,
            query_count: self.store.query_count()?,
            average_evaluation_score: self.store.average_latest_score()?,
        })
    }
}

/// A malformed id cannot match any stored record; report it as
/// NotFound rather than leaking key-encoding internals.
fn absorb_bad_key(
    query_id: &str,
) -> impl FnOnce(insight_storage::StorageError) -> ServiceError + '_ {
    move |err| match err {
        insight_storage::StorageError::Key(_) => {
            ServiceError::NotFound(format!("query {}", query_id))
        }
        other => ServiceError::Storage(other),
    }
}

fn validate_session_id(session_id: &str) -> Result<(), ServiceError> {
    if session_id.trim().is_empty() {
        return Err(ServiceError::Validation("session_id is empty".to_string()));
    }
    if session_id.contains(':') {
        return Err(ServiceError::Validation(
            "session_id must not contain ':'".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_embeddings::MockEmbedder;
    use insight_index::IndexConfig;
    use insight_reasoning::MockReasoner;
    use insight_types::{ChunkingConfig, RetrievalConfig};
    use tempfile::TempDir;

    const DIM: usize = 64;

    fn test_settings() -> Settings {
        Settings {
            chunking: ChunkingConfig {
                window: 80,
                overlap: 20,
            },
            retrieval: RetrievalConfig {
                top_k: 3,
                max_sources: 6,
                score_threshold: 0.0,
            },
            ..Settings::default()
        }
    }

    fn build_service(reasoner: MockReasoner) -> (InsightService, TempDir) {
        let dir = TempDir::new().unwrap();
        let index = Arc::new(
            ChunkIndex::open_or_create(IndexConfig::new(DIM, dir.path().join("index"))).unwrap(),
        );
        let store = HistoryStore::open(&dir.path().join("db")).unwrap();
        let service = InsightService::new(
            Arc::new(MockEmbedder::new(DIM)),
            Arc::new(reasoner),
            index,
            store,
            &test_settings(),
        );
        (service, dir)
    }

    #[tokio::test]
    async fn test_ingest_then_stats() {
        let (service, _dir) = build_service(MockReasoner::new());
        let text = "alpha ".repeat(40);
        let report = service
            .ingest_document(&text, "a.txt", "text/plain")
            .await
            .unwrap();
        assert!(report.chunk_count > 1);
        assert_eq!(report.failed_chunk_count, 0);

        let stats = service.get_collection_stats().unwrap();
        assert_eq!(stats.document_count, 1);
        assert_eq!(stats.chunk_count, report.chunk_count);
        assert_eq!(stats.query_count, 0);
        assert!(stats.average_evaluation_score.is_none());
    }

    #[tokio::test]
    async fn test_empty_text_is_validation_error() {
        let (service, _dir) = build_service(MockReasoner::new());
        let err = service
            .ingest_document("   ", "a.txt", "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_remove_document_clears_index() {
        let (service, _dir) = build_service(MockReasoner::new());
        let report = service
            .ingest_document("some document body text", "a.txt", "text/plain")
            .await
            .unwrap();

        service.remove_document(&report.document_id).await.unwrap();
        let stats = service.get_collection_stats().unwrap();
        assert_eq!(stats.document_count, 0);
        assert_eq!(stats.chunk_count, 0);

        let err = service
            .remove_document(&report.document_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_run_query_persists_record() {
        let (service, _dir) = build_service(MockReasoner::new());
        service
            .ingest_document("the quarterly revenue grew eight percent", "r.txt", "text/plain")
            .await
            .unwrap();

        let record = service
            .run_query(
                "what was the quarterly revenue",
                Some("sess-1".to_string()),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(record.answer.is_some());

        let listing = service.list_history(Some("sess-1"), 1, 10).unwrap();
        assert_eq!(listing.total, 1);
        assert_eq!(listing.entries[0].query_id, record.id);
        assert!(listing.entries[0].evaluation_score.is_some());
    }

    #[tokio::test]
    async fn test_run_query_validation() {
        let (service, _dir) = build_service(MockReasoner::new());
        let cancel = CancellationToken::new();

        assert!(matches!(
            service.run_query("  ", None, &cancel).await.unwrap_err(),
            ServiceError::Validation(_)
        ));
        assert!(matches!(
            service
                .run_query("q", Some("bad:session".to_string()), &cancel)
                .await
                .unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_re_evaluate_appends() {
        let (service, _dir) = build_service(MockReasoner::new());
        let record = service
            .run_query("anything", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(record.evaluations.len(), 1);

        let evaluation = service.re_evaluate(&record.id).await.unwrap();
        assert!((0.0..=5.0).contains(&evaluation.score));

        let listing = service.list_history(None, 1, 10).unwrap();
        assert_eq!(listing.total, 1);

        let stats = service.get_collection_stats().unwrap();
        assert_eq!(stats.query_count, 1);
        assert!(stats.average_evaluation_score.is_some());
    }

    #[tokio::test]
    async fn test_re_evaluate_unknown_id() {
        let (service, _dir) = build_service(MockReasoner::new());
        let err = service.re_evaluate("01ARZ3NDEKTSV4RRFFQ69G5FAV").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = service.re_evaluate("garbage-id").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_re_evaluate_without_answer_is_not_found() {
        // Analyze fails, leaving a record with no answer to judge
        let reasoner = MockReasoner::new().with_failure_marker("Analyze the question");
        let (service, _dir) = build_service(reasoner);
        let record = service
            .run_query("anything", None, &CancellationToken::new())
            .await
            .unwrap();
        assert!(record.answer.is_none());

        let err = service.re_evaluate(&record.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_history_pagination_bounds() {
        let (service, _dir) = build_service(MockReasoner::new());
        assert!(matches!(
            service.list_history(None, 0, 10).unwrap_err(),
            ServiceError::Validation(_)
        ));
        assert!(matches!(
            service.list_history(None, 1, 0).unwrap_err(),
            ServiceError::Validation(_)
        ));
        assert!(matches!(
            service.list_history(None, 1, 1000).unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_cancelled_query_leaves_no_history() {
        let (service, _dir) = build_service(MockReasoner::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service.run_query("anything", None, &cancel).await.unwrap_err();
        assert!(matches!(err, ServiceError::Cancelled(_)));
        assert_eq!(service.list_history(None, 1, 10).unwrap().total, 0);
    }
}
