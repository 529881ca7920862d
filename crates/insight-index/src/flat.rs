//! Exact flat index over normalized chunk vectors.
//!
//! Inner product on unit vectors equals cosine similarity, and an exact
//! scan keeps ranking fully deterministic: descending score with ties
//! resolved by insertion order. Collections here are document chunks, small
//! enough that exactness beats approximate structures.

use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use insight_embeddings::Embedding;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::IndexError;

const INDEX_FILE: &str = "chunks.json";

/// Index configuration.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Embedding dimension (must match the provider)
    pub dimension: usize,
    /// Directory holding the persisted index file
    pub path: PathBuf,
}

impl IndexConfig {
    pub fn new(dimension: usize, path: impl Into<PathBuf>) -> Self {
        Self {
            dimension,
            path: path.into(),
        }
    }
}

/// One indexed chunk: vector plus denormalized metadata for filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk_id: String,
    pub document_id: String,
    pub filename: String,
    pub ordinal: usize,
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// L2-normalized embedding values
    pub vector: Vec<f32>,
}

/// Metadata filter applied before ranking.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Restrict hits to these documents
    pub document_ids: Option<Vec<String>>,
}

impl SearchFilter {
    fn matches(&self, entry: &IndexEntry) -> bool {
        match &self.document_ids {
            Some(ids) => ids.iter().any(|id| *id == entry.document_id),
            None => true,
        }
    }
}

/// A search hit: entry snapshot plus similarity score.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: IndexEntry,
    pub score: f32,
}

/// Index statistics
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    /// Number of chunk entries in the index
    pub entry_count: usize,
    /// Number of distinct documents represented
    pub document_count: usize,
    /// Embedding dimension
    pub dimension: usize,
    /// Persisted file size in bytes
    pub size_bytes: u64,
}

/// On-disk shape of the index.
#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

/// Persisted exact-scan chunk index.
///
/// Interior `RwLock` makes a batch insert atomic with respect to
/// concurrent searches: a search sees either none or all of a batch.
pub struct ChunkIndex {
    entries: RwLock<Vec<IndexEntry>>,
    config: IndexConfig,
}

impl ChunkIndex {
    /// Open the persisted index or start empty.
    ///
    /// A missing, unreadable, or dimension-mismatched index file is treated
    /// as an empty index and logged as a warning.
    pub fn open_or_create(config: IndexConfig) -> Result<Self, IndexError> {
        let index_file = config.path.join(INDEX_FILE);

        let entries = if index_file.exists() {
            match Self::load_entries(&index_file, config.dimension) {
                Ok(entries) => {
                    info!(path = ?index_file, entries = entries.len(), "Opened existing chunk index");
                    entries
                }
                Err(e) => {
                    warn!(path = ?index_file, error = %e, "Persisted index unreadable, starting empty");
                    Vec::new()
                }
            }
        } else {
            info!(path = ?index_file, dim = config.dimension, "Creating new chunk index");
            fs::create_dir_all(&config.path)?;
            Vec::new()
        };

        Ok(Self {
            entries: RwLock::new(entries),
            config,
        })
    }

    fn load_entries(index_file: &PathBuf, dimension: usize) -> Result<Vec<IndexEntry>, IndexError> {
        let raw = fs::read_to_string(index_file)?;
        let persisted: PersistedIndex =
            serde_json::from_str(&raw).map_err(|e| IndexError::Serialization(e.to_string()))?;

        if persisted.dimension != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: persisted.dimension,
            });
        }

        Ok(persisted.entries)
    }

    /// Get the index file path
    pub fn index_file(&self) -> PathBuf {
        self.config.path.join(INDEX_FILE)
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Number of chunk entries in the index.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a batch of entries as one atomic unit.
    ///
    /// Either the whole batch becomes visible to searches or, on a
    /// validation error, none of it does.
    pub fn insert_batch(&self, batch: Vec<IndexEntry>) -> Result<(), IndexError> {
        for entry in &batch {
            if entry.vector.len() != self.config.dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: self.config.dimension,
                    actual: entry.vector.len(),
                });
            }
        }

        let count = batch.len();
        let mut entries = self.entries.write().unwrap();
        entries.extend(batch);
        debug!(inserted = count, total = entries.len(), "Inserted chunk batch");
        Ok(())
    }

    /// Search for the k most similar entries.
    ///
    /// Hits scoring below `score_threshold` are dropped before truncation.
    /// Returns fewer than k results when fewer entries qualify.
    pub fn search(
        &self,
        query: &Embedding,
        k: usize,
        score_threshold: f32,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredEntry>, IndexError> {
        if query.dimension() != self.config.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.config.dimension,
                actual: query.dimension(),
            });
        }

        let entries = self.entries.read().unwrap();

        let mut hits: Vec<ScoredEntry> = entries
            .iter()
            .filter(|entry| filter.map(|f| f.matches(entry)).unwrap_or(true))
            .map(|entry| {
                let score: f32 = entry
                    .vector
                    .iter()
                    .zip(query.values.iter())
                    .map(|(a, b)| a * b)
                    .sum();
                ScoredEntry {
                    entry: entry.clone(),
                    score,
                }
            })
            .filter(|hit| hit.score >= score_threshold)
            .collect();

        // Stable sort keeps insertion order for equal scores.
        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(k);

        debug!(k = k, found = hits.len(), "Search complete");
        Ok(hits)
    }

    /// Remove every entry belonging to a document.
    /// Returns the number of entries removed.
    pub fn remove_document(&self, document_id: &str) -> usize {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|entry| entry.document_id != document_id);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(document_id = %document_id, removed = removed, "Removed document entries");
        }
        removed
    }

    /// Get index statistics
    pub fn stats(&self) -> IndexStats {
        let entries = self.entries.read().unwrap();
        let mut document_ids: Vec<&str> =
            entries.iter().map(|e| e.document_id.as_str()).collect();
        document_ids.sort_unstable();
        document_ids.dedup();

        let size_bytes = fs::metadata(self.index_file()).map(|m| m.len()).unwrap_or(0);

        IndexStats {
            entry_count: entries.len(),
            document_count: document_ids.len(),
            dimension: self.config.dimension,
            size_bytes,
        }
    }

    /// Persist the index to disk.
    ///
    /// Writes a temp file and renames it over the old one so a crash
    /// mid-save never leaves a torn index behind.
    pub fn save(&self) -> Result<(), IndexError> {
        let entries = self.entries.read().unwrap();
        let persisted = PersistedIndex {
            dimension: self.config.dimension,
            entries: entries.clone(),
        };

        fs::create_dir_all(&self.config.path)?;
        let tmp_path = self.config.path.join(format!("{INDEX_FILE}.tmp"));
        let raw = serde_json::to_string(&persisted)
            .map_err(|e| IndexError::Serialization(e.to_string()))?;
        fs::write(&tmp_path, raw)?;
        fs::rename(&tmp_path, self.index_file())?;

        info!(path = ?self.index_file(), entries = entries.len(), "Saved chunk index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(chunk_id: &str, document_id: &str, ordinal: usize, vector: Vec<f32>) -> IndexEntry {
        let normalized = Embedding::new(vector);
        IndexEntry {
            chunk_id: chunk_id.to_string(),
            document_id: document_id.to_string(),
            filename: "doc.txt".to_string(),
            ordinal,
            text: format!("chunk {ordinal}"),
            start: ordinal * 10,
            end: ordinal * 10 + 10,
            vector: normalized.values,
        }
    }

    #[test]
    fn test_create_index() {
        let temp = TempDir::new().unwrap();
        let index = ChunkIndex::open_or_create(IndexConfig::new(4, temp.path())).unwrap();
        assert_eq!(index.dimension(), 4);
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_ranks_by_similarity() {
        let temp = TempDir::new().unwrap();
        let index = ChunkIndex::open_or_create(IndexConfig::new(3, temp.path())).unwrap();

        index
            .insert_batch(vec![
                entry("c1", "d1", 0, vec![1.0, 0.0, 0.0]),
                entry("c2", "d1", 1, vec![0.0, 1.0, 0.0]),
                entry("c3", "d1", 2, vec![0.7, 0.7, 0.0]),
            ])
            .unwrap();

        let query = Embedding::new(vec![0.0, 1.0, 0.0]);
        let hits = index.search(&query, 3, -1.0, None).unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].entry.chunk_id, "c2");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_equal_scores_break_ties_by_insertion_order() {
        let temp = TempDir::new().unwrap();
        let index = ChunkIndex::open_or_create(IndexConfig::new(2, temp.path())).unwrap();

        // Identical vectors, so identical similarity to any query.
        index
            .insert_batch(vec![
                entry("first", "d1", 0, vec![1.0, 0.0]),
                entry("second", "d1", 1, vec![1.0, 0.0]),
                entry("third", "d1", 2, vec![1.0, 0.0]),
            ])
            .unwrap();

        let query = Embedding::new(vec![1.0, 0.0]);
        let hits = index.search(&query, 3, -1.0, None).unwrap();

        let ids: Vec<&str> = hits.iter().map(|h| h.entry.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_threshold_filters_before_truncation() {
        let temp = TempDir::new().unwrap();
        let index = ChunkIndex::open_or_create(IndexConfig::new(2, temp.path())).unwrap();

        index
            .insert_batch(vec![
                entry("near", "d1", 0, vec![1.0, 0.0]),
                entry("far", "d1", 1, vec![0.0, 1.0]),
            ])
            .unwrap();

        let query = Embedding::new(vec![1.0, 0.0]);
        let hits = index.search(&query, 5, 0.5, None).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.chunk_id, "near");
    }

    #[test]
    fn test_fewer_entries_than_k_returns_all() {
        let temp = TempDir::new().unwrap();
        let index = ChunkIndex::open_or_create(IndexConfig::new(2, temp.path())).unwrap();

        index
            .insert_batch(vec![entry("only", "d1", 0, vec![1.0, 0.0])])
            .unwrap();

        let query = Embedding::new(vec![1.0, 0.0]);
        let hits = index.search(&query, 10, -1.0, None).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_document_filter() {
        let temp = TempDir::new().unwrap();
        let index = ChunkIndex::open_or_create(IndexConfig::new(2, temp.path())).unwrap();

        index
            .insert_batch(vec![
                entry("a", "d1", 0, vec![1.0, 0.0]),
                entry("b", "d2", 0, vec![1.0, 0.0]),
            ])
            .unwrap();

        let query = Embedding::new(vec![1.0, 0.0]);
        let filter = SearchFilter {
            document_ids: Some(vec!["d2".to_string()]),
        };
        let hits = index.search(&query, 10, -1.0, Some(&filter)).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.chunk_id, "b");
    }

    #[test]
    fn test_remove_document_cascades() {
        let temp = TempDir::new().unwrap();
        let index = ChunkIndex::open_or_create(IndexConfig::new(2, temp.path())).unwrap();

        index
            .insert_batch(vec![
                entry("a", "d1", 0, vec![1.0, 0.0]),
                entry("b", "d1", 1, vec![0.0, 1.0]),
                entry("c", "d2", 0, vec![1.0, 0.0]),
            ])
            .unwrap();

        assert_eq!(index.remove_document("d1"), 2);
        assert_eq!(index.len(), 1);
        assert_eq!(index.remove_document("d1"), 0);
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let config = IndexConfig::new(2, temp.path());

        {
            let index = ChunkIndex::open_or_create(config.clone()).unwrap();
            index
                .insert_batch(vec![
                    entry("a", "d1", 0, vec![1.0, 0.0]),
                    entry("b", "d1", 1, vec![0.0, 1.0]),
                ])
                .unwrap();
            index.save().unwrap();
        }

        let index = ChunkIndex::open_or_create(config).unwrap();
        assert_eq!(index.len(), 2);

        let query = Embedding::new(vec![0.0, 1.0]);
        let hits = index.search(&query, 1, -1.0, None).unwrap();
        assert_eq!(hits[0].entry.chunk_id, "b");
    }

    #[test]
    fn test_corrupt_file_loads_as_empty() {
        let temp = TempDir::new().unwrap();
        let config = IndexConfig::new(2, temp.path());
        fs::write(temp.path().join(INDEX_FILE), "not json at all {{{").unwrap();

        let index = ChunkIndex::open_or_create(config).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_dimension_mismatched_file_loads_as_empty() {
        let temp = TempDir::new().unwrap();

        {
            let index = ChunkIndex::open_or_create(IndexConfig::new(2, temp.path())).unwrap();
            index
                .insert_batch(vec![entry("a", "d1", 0, vec![1.0, 0.0])])
                .unwrap();
            index.save().unwrap();
        }

        let index = ChunkIndex::open_or_create(IndexConfig::new(3, temp.path())).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_rejects_wrong_dimension() {
        let temp = TempDir::new().unwrap();
        let index = ChunkIndex::open_or_create(IndexConfig::new(3, temp.path())).unwrap();

        let result = index.insert_batch(vec![entry("a", "d1", 0, vec![1.0, 0.0])]);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_determinism() {
        let temp = TempDir::new().unwrap();
        let index = ChunkIndex::open_or_create(IndexConfig::new(3, temp.path())).unwrap();

        index
            .insert_batch(vec![
                entry("c1", "d1", 0, vec![0.9, 0.1, 0.0]),
                entry("c2", "d1", 1, vec![0.5, 0.5, 0.0]),
                entry("c3", "d1", 2, vec![0.1, 0.9, 0.0]),
            ])
            .unwrap();

        let query = Embedding::new(vec![1.0, 0.3, 0.0]);
        let first = index.search(&query, 3, -1.0, None).unwrap();
        let second = index.search(&query, 3, -1.0, None).unwrap();

        let ids = |hits: &[ScoredEntry]| {
            hits.iter()
                .map(|h| (h.entry.chunk_id.clone(), h.score))
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
    }
}
