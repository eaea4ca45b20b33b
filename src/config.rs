//! Application configuration.
//!
//! All pipeline parameters live in one explicit [`AppConfig`] value built at
//! the entry point and passed (by reference or inside the service) to every
//! stage. Nothing is memoized in globals. `Default` carries the fixed
//! constants of the pipeline; the environment contributes only the API
//! credential, the bind address, and the data directory.

use std::env;
use std::path::PathBuf;

use crate::types::RagError;

/// Environment variable holding the hosted-model API credential.
pub const API_TOKEN_ENV: &str = "HUGGINGFACEHUB_API_TOKEN";

/// Top-level configuration, grouped by pipeline stage.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bearer credential for both hosted model endpoints.
    pub api_token: String,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

/// Character-window chunking parameters.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Exact character overlap between consecutive chunks of one page.
    pub chunk_overlap: usize,
}

/// Remote embedding endpoint parameters.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Model identifier sent with every request.
    pub model: String,
    /// Base URL of the OpenAI-compatible endpoint (no trailing path).
    pub base_url: String,
    /// Vector length produced by the model.
    pub dimensions: usize,
    /// Maximum texts per request; larger inputs are split into sub-batches.
    pub max_batch: usize,
    /// Attempts per request before a transient failure becomes an error.
    pub max_retries: u32,
}

/// Remote text-generation endpoint parameters.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    /// Maximum tokens the model may generate for one answer.
    pub max_new_tokens: u32,
    pub max_retries: u32,
}

/// Retrieval parameters.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Number of nearest chunks fetched per question.
    pub top_k: usize,
}

/// On-disk layout.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root under which each session gets its own index directory.
    pub index_root: PathBuf,
}

/// HTTP server parameters.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50_000,
            chunk_overlap: 1_000,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            base_url: "https://router.huggingface.co/v1".to_string(),
            dimensions: 384,
            max_batch: 32,
            max_retries: 3,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "meta-llama/Llama-3.1-8B-Instruct".to_string(),
            base_url: "https://router.huggingface.co/v1".to_string(),
            temperature: 0.3,
            max_new_tokens: 4000,
            max_retries: 3,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_root: PathBuf::from("./data/indexes"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            retrieval: RetrievalConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Builds a configuration from defaults plus the environment.
    ///
    /// Reads `HUGGINGFACEHUB_API_TOKEN` (credential), `RAGSHELF_ADDR` (bind
    /// address), and `RAGSHELF_DATA_DIR` (index root). Call after
    /// `dotenvy::dotenv()` if an `.env` file should participate.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(token) = env::var(API_TOKEN_ENV) {
            config.api_token = token;
        }
        if let Ok(addr) = env::var("RAGSHELF_ADDR") {
            config.server.bind_addr = addr;
        }
        if let Ok(dir) = env::var("RAGSHELF_DATA_DIR") {
            config.storage.index_root = PathBuf::from(dir).join("indexes");
        }
        config
    }

    /// Rejects parameter combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunking.chunk_size == 0 {
            return Err(RagError::Config("chunk size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(RagError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(RagError::Config("retrieval depth must be at least 1".into()));
        }
        if self.embedding.dimensions == 0 {
            return Err(RagError::Config(
                "embedding dimensions must be positive".into(),
            ));
        }
        if self.embedding.max_batch == 0 {
            return Err(RagError::Config(
                "embedding batch size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
