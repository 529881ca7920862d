//! RocksDB wrapper for insight history storage.
//!
//! Provides:
//! - Database open/close with column family setup
//! - Atomic write batches (query record + session index entry)
//! - Newest-first history pagination with optional session filter
//! - Append-only evaluation history per query run

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use tracing::{debug, info};

use crate::column_families::{build_cf_descriptors, ALL_CF_NAMES, CF_DOCUMENTS, CF_QUERIES, CF_SESSIONS};
use crate::error::StorageError;
use crate::keys::{DocumentKey, QueryKey, SessionKey};
use insight_types::{Document, Evaluation, QueryRecord};

/// One page of query history, newest-first
#[derive(Debug)]
pub struct HistoryPage {
    pub records: Vec<QueryRecord>,
    /// Total records matching the filter, across all pages
    pub total: usize,
}

/// Main storage interface for the insight engine
pub struct HistoryStore {
    db: DB,
}

impl HistoryStore {
    /// Open storage at the given path, creating if necessary.
    ///
    /// Uses Universal compaction since the query history is append-only.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening history store at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_compaction_style(rocksdb::DBCompactionStyle::Universal);
        db_opts.set_max_background_jobs(4);

        let cf_descriptors = build_cf_descriptors();
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        Ok(Self { db })
    }

    fn cf(&self, name: &'static str) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(name.to_string()))
    }

    // ==================== Document Methods ====================

    /// Store or overwrite a document metadata record
    pub fn put_document(&self, document: &Document) -> Result<(), StorageError> {
        let cf = self.cf(CF_DOCUMENTS)?;
        let key = DocumentKey::from_document_id(&document.id)?;
        let bytes = serde_json::to_vec(document)?;
        self.db.put_cf(&cf, key.to_bytes(), bytes)?;
        debug!(document_id = %document.id, "Stored document record");
        Ok(())
    }

    /// Get a document by id
    pub fn get_document(&self, document_id: &str) -> Result<Option<Document>, StorageError> {
        let cf = self.cf(CF_DOCUMENTS)?;
        let key = DocumentKey::from_document_id(document_id)?;
        match self.db.get_cf(&cf, key.to_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Delete a document record. Returns false if it did not exist.
    pub fn delete_document(&self, document_id: &str) -> Result<bool, StorageError> {
        let cf = self.cf(CF_DOCUMENTS)?;
        let key = DocumentKey::from_document_id(document_id)?;
        let key_bytes = key.to_bytes();
        if self.db.get_cf(&cf, &key_bytes)?.is_none() {
            return Ok(false);
        }
        self.db.delete_cf(&cf, &key_bytes)?;
        debug!(document_id, "Deleted document record");
        Ok(true)
    }

    /// All document records, in id order
    pub fn list_documents(&self) -> Result<Vec<Document>, StorageError> {
        let cf = self.cf(CF_DOCUMENTS)?;
        let mut documents = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            documents.push(serde_json::from_slice(&value)?);
        }
        Ok(documents)
    }

    /// Number of stored documents
    pub fn document_count(&self) -> Result<usize, StorageError> {
        let cf = self.cf(CF_DOCUMENTS)?;
        let mut count = 0;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    // ==================== Query History Methods ====================

    /// Append a query run record to the history.
    ///
    /// The record is keyed under the timestamp embedded in its ULID id,
    /// so lookups by query_id reconstruct the same key. When the record
    /// carries a session_id, a session index entry is written in the
    /// same atomic batch.
    pub fn append_query(&self, record: &QueryRecord) -> Result<(), StorageError> {
        let queries_cf = self.cf(CF_QUERIES)?;
        let key = QueryKey::from_query_id(&record.id)?;
        let bytes = serde_json::to_vec(record)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&queries_cf, key.to_bytes(), &bytes);

        if let Some(session_id) = &record.session_id {
            let sessions_cf = self.cf(CF_SESSIONS)?;
            let session_key = SessionKey::new(session_id.clone(), &key);
            batch.put_cf(&sessions_cf, session_key.to_bytes(), key.to_bytes());
        }

        self.db.write(batch)?;
        debug!(query_id = %record.id, "Appended query record");
        Ok(())
    }

    /// Get a query run record by id
    pub fn get_query(&self, query_id: &str) -> Result<Option<QueryRecord>, StorageError> {
        let cf = self.cf(CF_QUERIES)?;
        let key = QueryKey::from_query_id(query_id)?;
        match self.db.get_cf(&cf, key.to_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Append an evaluation to a stored query run.
    ///
    /// This is the only mutation permitted on a stored record: the
    /// evaluations list grows, everything else is rewritten unchanged.
    /// Returns the updated record.
    pub fn append_evaluation(
        &self,
        query_id: &str,
        evaluation: Evaluation,
    ) -> Result<QueryRecord, StorageError> {
        let cf = self.cf(CF_QUERIES)?;
        let key = QueryKey::from_query_id(query_id)?;
        let key_bytes = key.to_bytes();

        let bytes = self
            .db
            .get_cf(&cf, &key_bytes)?
            .ok_or_else(|| StorageError::NotFound(format!("query {}", query_id)))?;
        let mut record: QueryRecord = serde_json::from_slice(&bytes)?;
        record.evaluations.push(evaluation);

        self.db.put_cf(&cf, &key_bytes, serde_json::to_vec(&record)?)?;
        debug!(
            query_id,
            evaluation_count = record.evaluations.len(),
            "Appended evaluation"
        );
        Ok(record)
    }

    /// Page through the query history, newest-first.
    ///
    /// With a session filter, entries come from the session index; the
    /// value under each session key is the query key to fetch.
    pub fn list_queries(
        &self,
        session_id: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<HistoryPage, StorageError> {
        match session_id {
            Some(session) => self.list_session_queries(session, offset, limit),
            None => self.list_all_queries(offset, limit),
        }
    }

    fn list_all_queries(&self, offset: usize, limit: usize) -> Result<HistoryPage, StorageError> {
        let cf = self.cf(CF_QUERIES)?;
        let mut records = Vec::new();
        let mut total = 0;

        for item in self.db.iterator_cf(&cf, IteratorMode::End) {
            let (_, value) = item?;
            if total >= offset && records.len() < limit {
                records.push(serde_json::from_slice(&value)?);
            }
            total += 1;
        }

        Ok(HistoryPage { records, total })
    }

    fn list_session_queries(
        &self,
        session_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<HistoryPage, StorageError> {
        let sessions_cf = self.cf(CF_SESSIONS)?;
        let queries_cf = self.cf(CF_QUERIES)?;

        let prefix = SessionKey::prefix(session_id);
        let upper = SessionKey::prefix_upper(session_id);

        let mut records = Vec::new();
        let mut total = 0;

        let iter = self
            .db
            .iterator_cf(&sessions_cf, IteratorMode::From(&upper, Direction::Reverse));
        for item in iter {
            let (key, query_key) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            if total >= offset && records.len() < limit {
                let bytes = self.db.get_cf(&queries_cf, &query_key)?.ok_or_else(|| {
                    StorageError::NotFound(format!(
                        "query for session entry {}",
                        String::from_utf8_lossy(&key)
                    ))
                })?;
                records.push(serde_json::from_slice(&bytes)?);
            }
            total += 1;
        }

        Ok(HistoryPage { records, total })
    }

    /// Number of stored query runs
    pub fn query_count(&self) -> Result<usize, StorageError> {
        let cf = self.cf(CF_QUERIES)?;
        let mut count = 0;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Mean of the latest evaluation score across all runs that have one
    pub fn average_latest_score(&self) -> Result<Option<f32>, StorageError> {
        let cf = self.cf(CF_QUERIES)?;
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            let record: QueryRecord = serde_json::from_slice(&value)?;
            if let Some(evaluation) = record.latest_evaluation() {
                sum += evaluation.score as f64;
                count += 1;
            }
        }
        if count == 0 {
            Ok(None)
        } else {
            Ok(Some((sum / count as f64) as f32))
        }
    }

    /// Flush all column families to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.flush_cf(&cf)?;
            }
        }
        Ok(())
    }
}
