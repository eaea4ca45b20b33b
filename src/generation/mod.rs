//! Answer generation seam.
//!
//! The assembled prompt goes to a [`CompletionProvider`]; the hosted chat
//! endpoint answers in production, a recording mock answers in tests.

mod remote;

pub use remote::RemoteChatClient;

use std::sync::Mutex;

use async_trait::async_trait;

use crate::types::RagError;

/// One completion call to a chat model.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Produces answer text from an assembled prompt.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Identifier reported in logs.
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<String, RagError>;
}

/// Test double. Replies with canned text when one is set, otherwise echoes
/// the prompt back, and records every prompt it sees for assertions.
#[derive(Debug, Default)]
pub struct MockCompletionProvider {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockCompletionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Prompts seen so far, oldest first.
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, RagError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Ok(self.reply.clone().unwrap_or(request.prompt))
    }
}
