//! Public types for the chat API
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, PartialEq)]
pub struct ChatRequestMessage {
    pub content: String,
}

/// Request body shared by every endpoint that takes a user message:
/// `{"message": {"content": "..."}}`
#[derive(Deserialize, Serialize, Debug, PartialEq)]
pub struct ChatRequest {
    pub message: ChatRequestMessage,
}

impl ChatRequest {
    pub fn new(content: &str) -> Self {
        Self {
            message: ChatRequestMessage {
                content: content.to_string(),
            },
        }
    }

    /// Parse a raw request body. Malformed bodies are reported like any
    /// other failure rather than as an extractor rejection.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn content(&self) -> &str {
        &self.message.content
    }
}
