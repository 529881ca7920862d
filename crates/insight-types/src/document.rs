//! Document and chunk types for ingested content.
//!
//! Documents are immutable once created; removal is explicit and cascades
//! to the document's chunks and index entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An ingested document.
///
/// Created once at ingestion time and never mutated afterwards. The
/// `failed_chunk_count` field records partial embedding failure: chunks
/// whose embedding exhausted retries were skipped, the rest are indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier (ULID string)
    pub id: String,

    /// Original filename supplied by the caller
    pub filename: String,

    /// MIME content type of the source file
    pub content_type: String,

    /// Length of the extracted text in characters
    pub text_len: usize,

    /// Upload timestamp
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub uploaded_at: DateTime<Utc>,

    /// Number of chunks successfully embedded and indexed
    pub chunk_count: usize,

    /// Number of chunks skipped because embedding failed after retries
    pub failed_chunk_count: usize,
}

impl Document {
    pub fn new(
        id: String,
        filename: String,
        content_type: String,
        text_len: usize,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            filename,
            content_type,
            text_len,
            uploaded_at,
            chunk_count: 0,
            failed_chunk_count: 0,
        }
    }

    /// Whether some chunks were dropped during ingestion.
    pub fn is_partial(&self) -> bool {
        self.failed_chunk_count > 0
    }
}

/// A bounded contiguous span of a document's text.
///
/// Chunks are the unit of embedding and retrieval. They are never mutated
/// after creation; consecutive chunks share a deterministic overlap region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier (ULID string)
    pub id: String,

    /// Parent document id (back-reference, not ownership)
    pub document_id: String,

    /// Zero-based position within the document
    pub ordinal: usize,

    /// The chunk text
    pub text: String,

    /// Character offset of the chunk start in the document text
    pub start: usize,

    /// Character offset one past the chunk end
    pub end: usize,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_partial_flag() {
        let mut doc = Document::new(
            "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string(),
            "report.pdf".to_string(),
            "application/pdf".to_string(),
            4200,
            Utc::now(),
        );
        assert!(!doc.is_partial());

        doc.chunk_count = 4;
        doc.failed_chunk_count = 1;
        assert!(doc.is_partial());
    }

    #[test]
    fn test_document_serialization_round_trip() {
        let doc = Document::new(
            "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string(),
            "notes.txt".to_string(),
            "text/plain".to_string(),
            120,
            Utc::now(),
        );

        let json = serde_json::to_string(&doc).unwrap();
        let decoded: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.filename, "notes.txt");
        assert_eq!(decoded.text_len, 120);
    }
}
