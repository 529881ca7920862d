//! Retrieve stage: embed the question and search the chunk index.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use insight_embeddings::EmbeddingProvider;
use insight_index::{ChunkIndex, ScoredEntry};
use insight_types::{ParsedQuery, QueryKind, RetrievalConfig, Source, StageStatus};

/// Score boost for hits whose text mentions a parsed entity
const ENTITY_BOOST: f32 = 0.05;

/// Word-overlap threshold above which a later hit is dropped as a
/// near-duplicate of an earlier one
const DUPLICATE_JACCARD: f32 = 0.9;

/// Stage 2: vector retrieval with query-kind-adaptive breadth.
///
/// Embedding or index failure degrades to an empty source list; zero
/// hits from a healthy index is a normal completed outcome.
pub struct RetrieveStage {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<ChunkIndex>,
    config: RetrievalConfig,
}

impl RetrieveStage {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<ChunkIndex>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    pub async fn run(&self, raw_text: &str, parsed: &ParsedQuery) -> (Vec<Source>, StageStatus) {
        let k = self.adaptive_k(parsed.kind);

        let query = match self.embedder.embed(raw_text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "Query embedding failed, degrading to empty sources");
                return (Vec::new(), StageStatus::Degraded);
            }
        };

        let hits = match self
            .index
            .search(&query, k, self.config.score_threshold, None)
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Index search failed, degrading to empty sources");
                return (Vec::new(), StageStatus::Degraded);
            }
        };

        let hits = boost_entity_hits(hits, &parsed.entities);
        let hits = suppress_duplicates(hits);

        let sources = hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| Source {
                chunk_id: hit.entry.chunk_id,
                document_id: hit.entry.document_id,
                filename: hit.entry.filename,
                ordinal: hit.entry.ordinal,
                text: hit.entry.text,
                score: hit.score,
                rank: i + 1,
            })
            .collect::<Vec<_>>();

        debug!(k, found = sources.len(), kind = %parsed.kind, "Retrieval complete");
        (sources, StageStatus::Completed)
    }

    /// Comparison and analytical questions need evidence from more
    /// places than a single-fact lookup; summaries sit in between.
    /// Always capped at the configured maximum.
    fn adaptive_k(&self, kind: QueryKind) -> usize {
        let k = match kind {
            QueryKind::Comparison | QueryKind::Analytical => self.config.top_k * 2,
            QueryKind::Summary => self.config.top_k + 2,
            QueryKind::Factual | QueryKind::General => self.config.top_k,
        };
        k.min(self.config.max_sources)
    }
}

/// Re-rank hits so chunks mentioning a parsed entity edge ahead of
/// equally scored chunks that do not. The stable sort preserves the
/// original order among hits with equal boosted scores.
fn boost_entity_hits(mut hits: Vec<ScoredEntry>, entities: &[String]) -> Vec<ScoredEntry> {
    if entities.is_empty() {
        return hits;
    }
    for hit in &mut hits {
        let text = hit.entry.text.to_lowercase();
        if entities
            .iter()
            .any(|entity| text.contains(&entity.to_lowercase()))
        {
            hit.score += ENTITY_BOOST;
        }
    }
    hits.sort_by(|left, right| right.score.total_cmp(&left.score));
    hits
}

/// Drop later hits that near-duplicate an earlier one by word overlap.
fn suppress_duplicates(hits: Vec<ScoredEntry>) -> Vec<ScoredEntry> {
    let mut kept: Vec<ScoredEntry> = Vec::with_capacity(hits.len());
    for hit in hits {
        let duplicate = kept
            .iter()
            .any(|k| jaccard(&k.entry.text, &hit.entry.text) > DUPLICATE_JACCARD);
        if duplicate {
            debug!(chunk_id = %hit.entry.chunk_id, "Suppressed near-duplicate source");
        } else {
            kept.push(hit);
        }
    }
    kept
}

fn jaccard(a: &str, b: &str) -> f32 {
    let words_a: HashSet<String> = a.to_lowercase().split_whitespace().map(String::from).collect();
    let words_b: HashSet<String> = b.to_lowercase().split_whitespace().map(String::from).collect();
    if words_a.is_empty() && words_b.is_empty() {
        return 1.0;
    }
    let intersection = words_a.intersection(&words_b).count() as f32;
    let union = words_a.union(&words_b).count() as f32;
    intersection / union
}
