//! Embedding provider seam.
//!
//! Text-to-vector conversion sits behind [`EmbeddingProvider`] so the
//! pipeline runs against the hosted endpoint in production and a
//! deterministic in-process mock in tests:
//!
//! ```text
//! chunk / question text ──► EmbeddingProvider ──► fixed-length f32 vectors
//!                               │
//!                               └─► ProviderEmbeddingModel (rig adapter for store schema)
//! ```

mod remote;

pub use remote::RemoteEmbeddingClient;

use std::sync::Arc;

use async_trait::async_trait;
use rig::embeddings::embedding::{Embedding, EmbeddingError, EmbeddingModel};

use crate::types::RagError;

/// Maps text to fixed-length vectors, for both chunk indexing and query
/// embedding.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier reported in logs.
    fn name(&self) -> &str;

    /// Vector length this provider produces.
    fn dimensions(&self) -> usize;

    /// Embeds a batch of texts: one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embeds a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let batch = [text.to_string()];
        let mut vectors = self.embed_batch(&batch).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("provider returned no vector for the query".into()))
    }
}

/// Deterministic provider for tests: equal text always maps to the same
/// vector, different text almost surely to a different one. No network.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 8 }
    }

    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts
            .iter()
            .map(|text| hash_to_vec(text, self.dimensions))
            .collect())
    }
}

/// Strictly positive components keep the cosine distance well defined.
fn hash_to_vec(text: &str, dimensions: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..dimensions)
        .map(|i| {
            let bits = seed.rotate_left((i as u32 % 63) * 7) ^ ((i as u64) << 17);
            0.25 + ((bits % 1_000_003) as f32) / 1_000_003.0
        })
        .collect()
}

/// Exposes an [`EmbeddingProvider`] as a `rig` embedding model so the SQLite
/// vector store can size its embedding table from `ndims`.
#[derive(Clone)]
pub struct ProviderEmbeddingModel {
    provider: Arc<dyn EmbeddingProvider>,
}

impl ProviderEmbeddingModel {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }
}

impl EmbeddingModel for ProviderEmbeddingModel {
    const MAX_DOCUMENTS: usize = 64;

    fn ndims(&self) -> usize {
        self.provider.dimensions()
    }

    fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> impl std::future::Future<Output = Result<Vec<Embedding>, EmbeddingError>> + Send {
        let documents: Vec<String> = texts.into_iter().collect();
        let provider = Arc::clone(&self.provider);
        async move {
            let vectors = provider
                .embed_batch(&documents)
                .await
                .map_err(|err| EmbeddingError::ProviderError(err.to_string()))?;
            Ok(documents
                .into_iter()
                .zip(vectors)
                .map(|(document, vector)| Embedding {
                    vec: vector.into_iter().map(f64::from).collect(),
                    document,
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let inputs = vec![
            "Hello world".to_string(),
            "Goodbye world".to_string(),
            "Hello world".to_string(),
        ];

        let first = provider.embed_batch(&inputs).await.unwrap();
        let second = provider.embed_batch(&inputs).await.unwrap();

        assert_eq!(first, second, "mock embeddings should be deterministic");
        assert_eq!(
            first[0], first[2],
            "identical text should have identical embedding"
        );
        assert_ne!(
            first[0], first[1],
            "different text should have different embeddings"
        );
    }

    #[tokio::test]
    async fn embed_query_matches_the_batch_path() {
        let provider = MockEmbeddingProvider::new().with_dimensions(16);
        let query = provider.embed_query("what is this").await.unwrap();
        let batch = provider
            .embed_batch(&["what is this".to_string()])
            .await
            .unwrap();
        assert_eq!(query.len(), 16);
        assert_eq!(query, batch[0]);
    }

    #[tokio::test]
    async fn adapter_reports_provider_dimensions() {
        let provider: Arc<dyn EmbeddingProvider> =
            Arc::new(MockEmbeddingProvider::new().with_dimensions(12));
        let model = ProviderEmbeddingModel::new(provider);
        assert_eq!(model.ndims(), 12);

        let embeddings = model
            .embed_texts(vec!["one".to_string(), "two".to_string()])
            .await
            .unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].vec.len(), 12);
        assert_eq!(embeddings[0].document, "one");
    }
}
