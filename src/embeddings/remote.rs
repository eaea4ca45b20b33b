//! Client for a hosted embedding endpoint speaking the OpenAI-compatible
//! `/embeddings` wire format.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{API_TOKEN_ENV, EmbeddingConfig};
use crate::net::{USER_AGENT, backoff_delay, retryable_status, retryable_transport};
use crate::types::RagError;

use super::EmbeddingProvider;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Remote embedding provider.
///
/// Inputs are split into sub-batches of at most `max_batch` texts. Responses
/// are re-ordered by their `index` field before use, and HTTP 429, 5xx and
/// transport failures are retried with exponential backoff.
pub struct RemoteEmbeddingClient {
    http: reqwest::Client,
    endpoint: String,
    api_token: String,
    model: String,
    dimensions: usize,
    max_batch: usize,
    max_retries: u32,
}

impl RemoteEmbeddingClient {
    pub fn new(config: &EmbeddingConfig, api_token: &str) -> Result<Self, RagError> {
        if api_token.trim().is_empty() {
            return Err(RagError::Config(format!(
                "{API_TOKEN_ENV} is not set; the embedding endpoint requires a credential"
            )));
        }
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .use_rustls_tls()
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            api_token: api_token.trim().to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            max_batch: config.max_batch.max(1),
            max_retries: config.max_retries.max(1),
        })
    }

    async fn embed_sub_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_token)
                .json(&request)
                .send()
                .await;
            match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let mut parsed: EmbeddingResponse = response.json().await.map_err(|err| {
                            RagError::Embedding(format!("malformed embedding response: {err}"))
                        })?;
                        if parsed.data.len() != texts.len() {
                            return Err(RagError::Embedding(format!(
                                "endpoint returned {} vectors for {} inputs",
                                parsed.data.len(),
                                texts.len()
                            )));
                        }
                        parsed.data.sort_by_key(|entry| entry.index);
                        return Ok(parsed
                            .data
                            .into_iter()
                            .map(|entry| entry.embedding)
                            .collect());
                    }
                    if retryable_status(status) && attempt < self.max_retries {
                        warn!(%status, attempt, "embedding endpoint busy, retrying");
                        tokio::time::sleep(backoff_delay(attempt)).await;
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    return Err(RagError::Embedding(format!(
                        "endpoint returned {status}: {body}"
                    )));
                }
                Err(err) => {
                    if retryable_transport(&err) && attempt < self.max_retries {
                        warn!(error = %err, attempt, "embedding request failed, retrying");
                        tokio::time::sleep(backoff_delay(attempt)).await;
                        continue;
                    }
                    return Err(RagError::Embedding(err.to_string()));
                }
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbeddingClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut vectors = Vec::with_capacity(texts.len());
        for sub_batch in texts.chunks(self.max_batch) {
            vectors.extend(self.embed_sub_batch(sub_batch).await?);
        }
        if let Some(vector) = vectors.first()
            && vector.len() != self.dimensions
        {
            return Err(RagError::Embedding(format!(
                "endpoint produced {}-dimensional vectors, expected {}",
                vector.len(),
                self.dimensions
            )));
        }
        Ok(vectors)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    index: usize,
    embedding: Vec<f32>,
}
