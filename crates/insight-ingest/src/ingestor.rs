//! Ingestion orchestrator: chunk, embed, index.

use std::sync::Arc;

use chrono::Utc;
use insight_embeddings::EmbeddingProvider;
use insight_index::{ChunkIndex, IndexEntry};
use insight_types::{Chunk, ChunkingConfig, Document};
use tracing::{info, warn};
use ulid::Ulid;

use crate::chunker::Chunker;
use crate::error::IngestError;

/// Orchestrates the ingestion write path.
///
/// Embedding retries happen inside the provider; an error here means the
/// chunk's retry budget is exhausted, so the chunk is skipped and counted
/// on the document record rather than failing the whole ingestion.
pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<ChunkIndex>,
    chunker: Chunker,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<ChunkIndex>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            chunker: Chunker::new(chunking),
        }
    }

    /// Ingest one document: split, embed, batch-insert, persist.
    ///
    /// Re-ingesting identical content is not deduplicated; callers that
    /// want replacement semantics remove the prior document first.
    pub async fn ingest(
        &self,
        text: &str,
        filename: &str,
        content_type: &str,
    ) -> Result<(Document, Vec<Chunk>), IngestError> {
        if text.trim().is_empty() {
            return Err(IngestError::InvalidInput(
                "document text is empty".to_string(),
            ));
        }
        if filename.trim().is_empty() {
            return Err(IngestError::InvalidInput("filename is empty".to_string()));
        }

        let mut document = Document::new(
            Ulid::new().to_string(),
            filename.to_string(),
            content_type.to_string(),
            text.chars().count(),
            Utc::now(),
        );

        let spans = self.chunker.split(text);
        let mut chunks = Vec::with_capacity(spans.len());
        let mut batch = Vec::with_capacity(spans.len());

        for span in spans {
            let embedding = match self.embedder.embed(&span.text).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!(
                        document_id = %document.id,
                        ordinal = span.ordinal,
                        error = %e,
                        "Chunk embedding failed after retries, skipping chunk"
                    );
                    document.failed_chunk_count += 1;
                    continue;
                }
            };

            let chunk = Chunk {
                id: Ulid::new().to_string(),
                document_id: document.id.clone(),
                ordinal: span.ordinal,
                text: span.text,
                start: span.start,
                end: span.end,
            };

            batch.push(IndexEntry {
                chunk_id: chunk.id.clone(),
                document_id: chunk.document_id.clone(),
                filename: document.filename.clone(),
                ordinal: chunk.ordinal,
                text: chunk.text.clone(),
                start: chunk.start,
                end: chunk.end,
                vector: embedding.values,
            });
            chunks.push(chunk);
        }

        // One atomic batch: searches see all of these chunks or none.
        self.index.insert_batch(batch)?;
        self.index.save()?;

        document.chunk_count = chunks.len();

        info!(
            document_id = %document.id,
            filename = %filename,
            chunks = document.chunk_count,
            failed = document.failed_chunk_count,
            "Ingested document"
        );

        Ok((document, chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_embeddings::MockEmbedder;
    use insight_index::IndexConfig;
    use tempfile::TempDir;

    fn setup(embedder: MockEmbedder, temp: &TempDir) -> (Ingestor, Arc<ChunkIndex>) {
        let index = Arc::new(
            ChunkIndex::open_or_create(IndexConfig::new(embedder.dimension(), temp.path()))
                .unwrap(),
        );
        let ingestor = Ingestor::new(
            Arc::new(embedder),
            index.clone(),
            ChunkingConfig {
                window: 50,
                overlap: 10,
            },
        );
        (ingestor, index)
    }

    #[tokio::test]
    async fn test_ingest_indexes_every_chunk() {
        let temp = TempDir::new().unwrap();
        let (ingestor, index) = setup(MockEmbedder::new(32), &temp);

        let text = "the hydraulic pump manual ".repeat(10);
        let (document, chunks) = ingestor.ingest(&text, "manual.txt", "text/plain").await.unwrap();

        assert!(document.chunk_count > 1);
        assert_eq!(document.failed_chunk_count, 0);
        assert_eq!(chunks.len(), document.chunk_count);
        assert_eq!(index.len(), document.chunk_count);
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let temp = TempDir::new().unwrap();
        let (ingestor, _) = setup(MockEmbedder::new(32), &temp);

        let result = ingestor.ingest("   \n ", "empty.txt", "text/plain").await;
        assert!(matches!(result, Err(IngestError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_failed_chunk_is_skipped_not_fatal() {
        let temp = TempDir::new().unwrap();
        let (ingestor, index) = setup(
            MockEmbedder::new(32).with_failure_marker("POISON"),
            &temp,
        );

        // Five windows of 50 chars with 10 overlap start at 0, 40, 80,
        // 120, 160. Characters 50-79 belong only to the second window, so
        // a marker there fails exactly one chunk.
        let mut text = "x".repeat(50);
        text.push_str("POISON");
        text.push_str(&"y".repeat(154));
        let (document, _) = ingestor.ingest(&text, "doc.txt", "text/plain").await.unwrap();

        assert_eq!(document.failed_chunk_count, 1);
        assert!(document.is_partial());
        assert_eq!(document.chunk_count, 4);
        assert_eq!(index.len(), 4);
    }

    #[tokio::test]
    async fn test_reingest_is_not_deduplicated() {
        let temp = TempDir::new().unwrap();
        let (ingestor, index) = setup(MockEmbedder::new(32), &temp);

        let text = "repeatable content for dedup checks";
        let (first, _) = ingestor.ingest(text, "a.txt", "text/plain").await.unwrap();
        let (second, _) = ingestor.ingest(text, "a.txt", "text/plain").await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(index.len(), first.chunk_count + second.chunk_count);
    }
}
