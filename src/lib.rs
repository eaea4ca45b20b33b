//! ```text
//! Uploaded PDFs ──► ingestion::extract_documents ──► page documents
//!                                     │
//! Page documents ──► chunking::RecursiveCharacterSplitter ──► chunks
//!                                     │
//! Chunks ──► embeddings::EmbeddingProvider ──► stores::SqliteVectorIndex
//!                                                  (one file per session)
//!
//! Question ──► embeddings (query vector) ──► stores::top_k ──► prompt
//!           └─► generation::CompletionProvider ──► answer + sources
//! ```
//!
//! [`service::ShelfService`] drives both flows; [`server`] exposes them over
//! HTTP with one index per browser session.

pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod generation;
pub mod ingestion;
mod net;
pub mod server;
pub mod service;
pub mod session;
pub mod stores;
pub mod types;

pub use config::AppConfig;
pub use service::{Answer, IngestSummary, ShelfService, SourceRef};
pub use session::{SessionContext, SessionManager};
pub use types::RagError;
