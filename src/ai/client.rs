//! The seam between the prompt pipeline and a chat completion
//! provider.

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::stream::FragmentStream;
use crate::core::AppConfig;
use crate::openai::{Message, completion, completion_stream};

/// Sampling is pinned to the most conservative value so the same
/// prompt tends to produce the same document.
pub const TEMPERATURE: f32 = 0.0;

/// A chat completion model. Every failure (network, authentication,
/// malformed response) is reported as a single opaque error and is
/// never retried.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Return the full completion for `messages`.
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Start a streaming completion for `messages`.
    async fn stream(&self, messages: &[Message]) -> Result<FragmentStream>;
}

/// `ModelClient` for any OpenAI compatible API.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    api_hostname: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_hostname: &str, api_key: &str, model: &str) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.openai_api_hostname,
            &config.openai_api_key,
            &config.openai_model,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let resp = completion(
            messages,
            &self.api_hostname,
            &self.api_key,
            &self.model,
            TEMPERATURE,
        )
        .await?;

        resp["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("No message received. Resp:\n\n {}", resp))
    }

    async fn stream(&self, messages: &[Message]) -> Result<FragmentStream> {
        let fragments = completion_stream(
            messages,
            &self.api_hostname,
            &self.api_key,
            &self.model,
            TEMPERATURE,
        )
        .await?;

        Ok(FragmentStream::new(fragments))
    }
}
