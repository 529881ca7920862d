//! # insight-ingest
//!
//! Document ingestion for the document insight core.
//!
//! Splits extracted text into overlapping chunks, embeds each chunk via
//! the configured provider, and inserts the successful ones into the
//! chunk index as a single batch. A chunk whose embedding fails after
//! retries is skipped and counted; ingestion never aborts for one chunk.

pub mod chunker;
pub mod error;
pub mod ingestor;

pub use chunker::{ChunkSpan, Chunker};
pub use error::IngestError;
pub use ingestor::Ingestor;
