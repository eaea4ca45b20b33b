//! Client for a hosted chat-completions endpoint speaking the
//! OpenAI-compatible `/chat/completions` wire format.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{API_TOKEN_ENV, GenerationConfig};
use crate::net::{USER_AGENT, backoff_delay, retryable_status, retryable_transport};
use crate::types::RagError;

use super::{CompletionProvider, CompletionRequest};

// Generation is the slowest call in the pipeline; give it more room than the
// embedding client before declaring a timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Remote completion provider.
///
/// The prompt travels as a single user message. HTTP 429, 5xx and transport
/// failures are retried with exponential backoff.
pub struct RemoteChatClient {
    http: reqwest::Client,
    endpoint: String,
    api_token: String,
    model: String,
    max_retries: u32,
}

impl RemoteChatClient {
    pub fn new(config: &GenerationConfig, api_token: &str) -> Result<Self, RagError> {
        if api_token.trim().is_empty() {
            return Err(RagError::Config(format!(
                "{API_TOKEN_ENV} is not set; the completion endpoint requires a credential"
            )));
        }
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .use_rustls_tls()
            .build()?;
        Ok(Self {
            http,
            endpoint: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            api_token: api_token.trim().to_string(),
            model: config.model.clone(),
            max_retries: config.max_retries.max(1),
        })
    }
}

#[async_trait]
impl CompletionProvider for RemoteChatClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, RagError> {
        let payload = ChatRequest {
            model: &self.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
        };
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_token)
                .json(&payload)
                .send()
                .await;
            match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed: ChatResponse = response.json().await.map_err(|err| {
                            RagError::Generation(format!("malformed completion response: {err}"))
                        })?;
                        return parsed
                            .choices
                            .into_iter()
                            .next()
                            .map(|choice| choice.message.content)
                            .ok_or_else(|| {
                                RagError::Generation("endpoint returned no choices".into())
                            });
                    }
                    if retryable_status(status) && attempt < self.max_retries {
                        warn!(%status, attempt, "completion endpoint busy, retrying");
                        tokio::time::sleep(backoff_delay(attempt)).await;
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    return Err(RagError::Generation(format!(
                        "endpoint returned {status}: {body}"
                    )));
                }
                Err(err) => {
                    if retryable_transport(&err) && attempt < self.max_retries {
                        warn!(error = %err, attempt, "completion request failed, retrying");
                        tokio::time::sleep(backoff_delay(attempt)).await;
                        continue;
                    }
                    return Err(RagError::Generation(err.to_string()));
                }
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}
