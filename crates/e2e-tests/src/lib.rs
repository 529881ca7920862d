//! End-to-end test infrastructure for the insight engine.
//!
//! Provides a shared TestHarness wiring the full stack with mock
//! providers over temp directories, plus helpers used across the
//! E2E test suites.

use std::sync::Arc;

use insight_embeddings::MockEmbedder;
use insight_index::{ChunkIndex, IndexConfig};
use insight_reasoning::MockReasoner;
use insight_service::InsightService;
use insight_storage::HistoryStore;
use insight_types::{ChunkingConfig, RetrievalConfig, Settings};

/// Embedding dimension used by all E2E suites
pub const TEST_DIM: usize = 64;

/// Shared test harness for E2E tests.
///
/// Wires the service facade over mock providers, a temp-dir chunk
/// index, and a temp-dir history store.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// The fully wired service facade
    pub service: InsightService,
    /// Shared chunk index (also reachable through the service)
    pub index: Arc<ChunkIndex>,
}

impl TestHarness {
    /// Harness with the default prompt-driven mock reasoner.
    pub fn new() -> Self {
        Self::with_providers(MockEmbedder::new(TEST_DIM), MockReasoner::new())
    }

    /// Harness over caller-configured mock providers.
    pub fn with_providers(embedder: MockEmbedder, reasoner: MockReasoner) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");

        let index = Arc::new(
            ChunkIndex::open_or_create(IndexConfig::new(
                TEST_DIM,
                temp_dir.path().join("vector-index"),
            ))
            .expect("Failed to open test index"),
        );
        let store =
            HistoryStore::open(&temp_dir.path().join("db")).expect("Failed to open test store");

        let service = InsightService::new(
            Arc::new(embedder),
            Arc::new(reasoner),
            index.clone(),
            store,
            &test_settings(),
        );

        Self {
            _temp_dir: temp_dir,
            service,
            index,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings tuned for small test documents: narrow chunk windows and a
/// zero score threshold so mock-embedder similarities always pass.
pub fn test_settings() -> Settings {
    Settings {
        chunking: ChunkingConfig {
            window: 120,
            overlap: 30,
        },
        retrieval: RetrievalConfig {
            top_k: 3,
            max_sources: 6,
            score_threshold: 0.0,
        },
        ..Settings::default()
    }
}

/// A small corpus of distinct document bodies for retrieval tests.
pub fn sample_corpus() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "finance.txt",
            "Quarterly revenue grew eight percent year over year, driven by \
subscription renewals. Operating margin held steady at twenty one percent \
despite increased cloud infrastructure spending in the period.",
        ),
        (
            "hiring.txt",
            "The engineering organization plans to hire twelve backend \
developers and four data scientists next quarter, with onboarding handled \
by the platform enablement team in the Austin office.",
        ),
        (
            "security.txt",
            "All production services now require hardware security keys for \
administrative access. The incident response runbook was revised after the \
March tabletop exercise surfaced gaps in escalation paths.",
        ),
    ]
}
