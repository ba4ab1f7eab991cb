//! Public types for the conversation API
use serde::Serialize;

use crate::ai::chat::{Conversation, StreamState};
use crate::openai::Message;

#[derive(Serialize)]
pub struct ConversationResponse {
    pub messages: Vec<Message>,
    pub generation: u64,
    pub state: StreamState,
}

impl From<&Conversation> for ConversationResponse {
    fn from(conversation: &Conversation) -> Self {
        Self {
            messages: conversation.messages(),
            generation: conversation.generation(),
            state: conversation.state(),
        }
    }
}
