//! Shared error type for the ingestion, retrieval, and answering pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by pipeline stages.
///
/// Every fallible operation in the crate returns `Result<_, RagError>` so the
/// HTTP layer can map each failure category to a status code in one place.
#[derive(Debug, Error)]
pub enum RagError {
    /// An upload batch contained no PDF files. Raised before any side effect.
    #[error("no PDF files were provided")]
    NoFiles,

    /// A staged PDF could not be parsed into page text.
    #[error("failed to extract text from '{file}': {reason}")]
    PdfExtraction { file: String, reason: String },

    /// The embedding endpoint failed after retries, or returned a malformed
    /// batch.
    #[error("embedding request failed: {0}")]
    Embedding(String),

    /// The text-generation endpoint failed after retries, or returned no
    /// choices.
    #[error("generation request failed: {0}")]
    Generation(String),

    /// A vector-store operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Retrieval was attempted against a session that never built an index.
    #[error("no vector index found at {}", path.display())]
    IndexNotFound { path: PathBuf },

    /// The request referenced a session id the server never issued, or one
    /// that has already been evicted.
    #[error("unknown session '{0}'")]
    UnknownSession(String),

    /// Invalid or incomplete configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}
