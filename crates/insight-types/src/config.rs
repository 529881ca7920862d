//! Configuration loading for the document insight core.
//!
//! Layered precedence: built-in defaults -> config file -> env vars.
//! The resolved `Settings` value is immutable and threaded through
//! constructors; no component reads ambient global state during a run.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::InsightError;

/// Chunking window configuration.
///
/// Chunks are measured in characters of the extracted text. Consecutive
/// chunks share `overlap` characters; `overlap` must be smaller than
/// `window`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    #[serde(default = "default_chunk_window")]
    pub window: usize,

    /// Characters shared between consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

fn default_chunk_window() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window: default_chunk_window(),
            overlap: default_chunk_overlap(),
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.window == 0 {
            return Err("chunking.window must be > 0".to_string());
        }
        if self.overlap >= self.window {
            return Err(format!(
                "chunking.overlap ({}) must be smaller than chunking.window ({})",
                self.overlap, self.window
            ));
        }
        Ok(())
    }
}

/// Retrieval stage configuration, fixed at run start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Base number of sources to fetch
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Hard cap on sources per run, after query-kind adjustment
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,

    /// Hits scoring below this are dropped before truncation to k
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
}

fn default_top_k() -> usize {
    5
}

fn default_max_sources() -> usize {
    10
}

fn default_score_threshold() -> f32 {
    0.25
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_sources: default_max_sources(),
            score_threshold: default_score_threshold(),
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.top_k == 0 {
            return Err("retrieval.top_k must be > 0".to_string());
        }
        if self.max_sources < self.top_k {
            return Err(format!(
                "retrieval.max_sources ({}) must be >= retrieval.top_k ({})",
                self.max_sources, self.top_k
            ));
        }
        if !(-1.0..=1.0).contains(&self.score_threshold) {
            return Err(format!(
                "retrieval.score_threshold must be in [-1.0, 1.0], got {}",
                self.score_threshold
            ));
        }
        Ok(())
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// API base URL
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Expected vector dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// API key (loaded from env var, not stored in config file)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum attempts per embedding call
    #[serde(default = "default_provider_max_retries")]
    pub max_retries: u32,
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimension() -> usize {
    1536
}

fn default_provider_timeout_secs() -> u64 {
    30
}

fn default_provider_max_retries() -> u32 {
    3
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            api_key: None,
            timeout_secs: default_provider_timeout_secs(),
            max_retries: default_provider_max_retries(),
        }
    }
}

impl EmbeddingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Reasoning provider settings, shared by the parse, analyze, summarize,
/// and evaluate stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningSettings {
    /// API base URL
    #[serde(default = "default_reasoning_base_url")]
    pub base_url: String,

    /// Model for parse/analyze/summarize calls
    #[serde(default = "default_reasoning_model")]
    pub model: String,

    /// Model for the judge; defaults to a cheaper one
    #[serde(default = "default_evaluation_model")]
    pub evaluation_model: String,

    /// API key (loaded from env var, not stored in config file)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_reasoning_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum attempts per completion call
    #[serde(default = "default_provider_max_retries")]
    pub max_retries: u32,
}

fn default_reasoning_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_reasoning_model() -> String {
    "gpt-4o".to_string()
}

fn default_evaluation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_reasoning_timeout_secs() -> u64 {
    60
}

impl Default for ReasoningSettings {
    fn default() -> Self {
        Self {
            base_url: default_reasoning_base_url(),
            model: default_reasoning_model(),
            evaluation_model: default_evaluation_model(),
            api_key: None,
            timeout_secs: default_reasoning_timeout_secs(),
            max_retries: default_provider_max_retries(),
        }
    }
}

impl ReasoningSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Main application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the RocksDB history store directory
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Path to the persisted vector index directory
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Chunking window configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Retrieval stage configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingSettings,

    /// Reasoning provider configuration
    #[serde(default)]
    pub reasoning: ReasoningSettings,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", "doc-insight")
        .map(|p| p.data_local_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .to_string()
}

fn default_index_path() -> String {
    ProjectDirs::from("", "", "doc-insight")
        .map(|p| p.data_local_dir().join("vector-index"))
        .unwrap_or_else(|| PathBuf::from("./vector-index"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            index_path: default_index_path(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingSettings::default(),
            reasoning: ReasoningSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/doc-insight/config.toml)
    /// 3. Caller-specified config file (optional)
    /// 4. Environment variables (INSIGHT_*)
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, InsightError> {
        let config_dir = ProjectDirs::from("", "", "doc-insight")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())
            .map_err(|e| InsightError::Config(e.to_string()))?
            .set_default("index_path", default_index_path())
            .map_err(|e| InsightError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| InsightError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("INSIGHT")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .map_err(|e| InsightError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| InsightError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), InsightError> {
        self.chunking.validate().map_err(InsightError::Config)?;
        self.retrieval.validate().map_err(InsightError::Config)?;
        if self.embedding.dimension == 0 {
            return Err(InsightError::Config(
                "embedding.dimension must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
