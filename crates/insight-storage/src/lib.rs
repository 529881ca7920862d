//! Append-only history storage for the insight engine.
//!
//! Provides RocksDB-backed storage with:
//! - Column family isolation for documents, query runs, and session index
//! - Time-prefixed keys so history scans read newest-first without sorting
//! - Atomic writes via WriteBatch (query record + session index entry)
//! - Append-only query history: the only permitted mutation of a stored
//!   run is appending a new evaluation

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;

pub use db::{HistoryPage, HistoryStore};
pub use error::StorageError;
pub use keys::{DocumentKey, QueryKey, SessionKey};
