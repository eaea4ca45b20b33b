//! Pipeline orchestration.
//!
//! [`ShelfService`] owns the configuration and the two provider seams, and
//! drives both halves of the pipeline:
//!
//! ```text
//! upload:  PDFs ─► pages ─► chunks ─► embeddings ─► session index (rebuild)
//! ask:     question ─► query embedding ─► nearest chunks ─► prompt ─► answer
//! ```
//!
//! Everything the stages need travels through this one value; there is no
//! global state and no implicit caching between requests.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::chunking::RecursiveCharacterSplitter;
use crate::config::AppConfig;
use crate::embeddings::{EmbeddingProvider, ProviderEmbeddingModel, RemoteEmbeddingClient};
use crate::generation::{CompletionProvider, CompletionRequest, RemoteChatClient};
use crate::ingestion::{UploadedPdf, extract_documents};
use crate::session::SessionContext;
use crate::stores::{ChunkRecord, SqliteVectorIndex};
use crate::types::RagError;

/// What one upload produced.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub files: usize,
    pub pages: usize,
    pub chunks: usize,
}

/// One retrieved chunk reference returned alongside an answer.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub file: String,
    pub page: usize,
    pub similarity: f32,
}

/// A generated answer with the chunks that grounded it.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

/// Builder for [`ShelfService`]. Providers left unset are constructed as
/// remote clients from the configuration, which then must carry an API
/// credential.
pub struct ShelfServiceBuilder {
    config: AppConfig,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn CompletionProvider>>,
}

impl ShelfServiceBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            embedder: None,
            generator: None,
        }
    }

    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn CompletionProvider>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn try_build(self) -> Result<ShelfService, RagError> {
        self.config.validate()?;
        let splitter = RecursiveCharacterSplitter::new(&self.config.chunking)?;
        let embedder: Arc<dyn EmbeddingProvider> = match self.embedder {
            Some(embedder) => embedder,
            None => Arc::new(RemoteEmbeddingClient::new(
                &self.config.embedding,
                &self.config.api_token,
            )?),
        };
        let generator: Arc<dyn CompletionProvider> = match self.generator {
            Some(generator) => generator,
            None => Arc::new(RemoteChatClient::new(
                &self.config.generation,
                &self.config.api_token,
            )?),
        };
        Ok(ShelfService {
            config: self.config,
            splitter,
            embedder,
            generator,
        })
    }
}

/// The document-question pipeline for one deployment.
pub struct ShelfService {
    config: AppConfig,
    splitter: RecursiveCharacterSplitter,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn CompletionProvider>,
}

impl ShelfService {
    pub fn builder(config: AppConfig) -> ShelfServiceBuilder {
        ShelfServiceBuilder::new(config)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Ingests uploaded PDFs into the session's index.
    ///
    /// Extracts pages, chunks them, embeds every chunk, and rebuilds the
    /// session index from scratch. With no files nothing is written and the
    /// call fails with [`RagError::NoFiles`]; a failure in any stage aborts
    /// the whole upload.
    pub async fn index_documents(
        &self,
        session: &SessionContext,
        files: Vec<UploadedPdf>,
    ) -> Result<IngestSummary, RagError> {
        if files.is_empty() {
            return Err(RagError::NoFiles);
        }
        let started = Instant::now();

        let documents = extract_documents(&files).await?;
        let chunks = self.splitter.split_documents(&documents);

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(RagError::Embedding(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let rows: Vec<(ChunkRecord, Vec<f32>)> = chunks
            .into_iter()
            .map(ChunkRecord::from)
            .zip(vectors)
            .collect();

        let model = self.embedding_model();
        let index = SqliteVectorIndex::build(&session.index_db_path, &model, rows).await?;
        let stored = index.count().await?;

        let summary = IngestSummary {
            files: files.len(),
            pages: documents.len(),
            chunks: stored,
        };
        info!(
            session_id = %session.session_id,
            files = summary.files,
            pages = summary.pages,
            chunks = summary.chunks,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "documents indexed"
        );
        Ok(summary)
    }

    /// Answers a question from the session's index.
    ///
    /// Embeds the question, retrieves the nearest chunks, and sends the
    /// assembled prompt to the completion provider. Requires an index built
    /// by an earlier upload; a missing one surfaces as
    /// [`RagError::IndexNotFound`].
    pub async fn answer(
        &self,
        session: &SessionContext,
        question: &str,
    ) -> Result<Answer, RagError> {
        let started = Instant::now();
        let question = question.trim();
        let query = self.embedder.embed_query(question).await?;

        let model = self.embedding_model();
        let index = SqliteVectorIndex::open_existing(&session.index_db_path, &model).await?;
        let hits = index.top_k(&query, self.config.retrieval.top_k).await?;

        let context = hits
            .iter()
            .map(|(record, _)| record.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = answer_prompt(&context, question);

        let text = self
            .generator
            .complete(CompletionRequest {
                prompt,
                temperature: self.config.generation.temperature,
                max_tokens: self.config.generation.max_new_tokens,
            })
            .await?;

        info!(
            session_id = %session.session_id,
            retrieved = hits.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "question answered"
        );
        let sources = hits
            .into_iter()
            .map(|(record, similarity)| SourceRef {
                file: record.source,
                page: record.page,
                similarity,
            })
            .collect();
        Ok(Answer { text, sources })
    }

    fn embedding_model(&self) -> ProviderEmbeddingModel {
        ProviderEmbeddingModel::new(Arc::clone(&self.embedder))
    }
}

/// Builds the fixed answering prompt.
///
/// The "answer is not available in the context" instruction is a soft guard:
/// it steers the model away from inventing answers but nothing enforces it,
/// so replies must not be treated as verified against the context.
fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question as detailed as possible from the provided context, \
         make sure to provide all the details, if the answer is not in provided \
         context just say, \"answer is not available in the context\", don't \
         provide the wrong answer\n\n\
         Context:\n{context}\n\n\
         Question:\n{question}\n\n\
         Answer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use crate::generation::MockCompletionProvider;

    fn mock_service() -> ShelfService {
        ShelfService::builder(AppConfig::default())
            .with_embedder(Arc::new(MockEmbeddingProvider::new()))
            .with_generator(Arc::new(MockCompletionProvider::new()))
            .try_build()
            .unwrap()
    }

    #[tokio::test]
    async fn empty_upload_is_rejected_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionContext::new("s1", dir.path());
        let service = mock_service();

        let err = service
            .index_documents(&session, Vec::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::NoFiles), "got {err:?}");
        assert!(!session.index_dir.exists());
        assert!(!session.index_db_path.exists());
    }

    #[tokio::test]
    async fn asking_before_any_upload_reports_the_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionContext::new("s1", dir.path());
        let service = mock_service();

        let err = service.answer(&session, "anything there?").await.unwrap_err();
        assert!(matches!(err, RagError::IndexNotFound { .. }), "got {err:?}");
    }

    #[test]
    fn prompt_carries_context_then_question() {
        let prompt = answer_prompt("CONTEXT GOES HERE", "WHERE IS IT?");

        assert!(prompt.starts_with("Answer the question as detailed as possible"));
        assert!(prompt.contains("\"answer is not available in the context\""));
        assert!(prompt.contains("Context:\nCONTEXT GOES HERE"));
        assert!(prompt.contains("Question:\nWHERE IS IT?"));
        assert!(prompt.ends_with("Answer:"));
        let context_at = prompt.find("Context:").unwrap();
        let question_at = prompt.find("Question:").unwrap();
        assert!(context_at < question_at);
    }

    #[test]
    fn builder_without_mocks_requires_a_credential() {
        let err = ShelfService::builder(AppConfig::default())
            .try_build()
            .unwrap_err();
        assert!(matches!(err, RagError::Config(_)), "got {err:?}");
    }

    #[test]
    fn builder_accepts_a_configured_credential() {
        let config = AppConfig {
            api_token: "hf_test_token".to_string(),
            ..AppConfig::default()
        };
        assert!(ShelfService::builder(config).try_build().is_ok());
    }
}
