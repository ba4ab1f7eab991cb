//! The core models for a chat transcript that is updated incrementally
//! by a streaming generation.
use anyhow::{Result, bail};
use serde::Serialize;

use crate::openai::{Message, Role};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn new_with_messages(messages: Vec<Message>) -> Self {
        Self(messages)
    }

    pub fn messages(&self) -> Vec<Message> {
        self.0.clone()
    }

    pub fn push(&mut self, msg: Message) {
        self.0.push(msg)
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut Message> {
        self.0.last_mut()
    }

    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Where the conversation is in consuming a generation stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Idle,
    AwaitingFirstFragment,
    Accumulating,
    Aborted,
}

impl StreamState {
    fn is_streaming(self) -> bool {
        matches!(
            self,
            StreamState::AwaitingFirstFragment | StreamState::Accumulating
        )
    }
}

/// Identifies one submission. Updates carrying an older token than the
/// conversation's current one are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GenerationToken(u64);

impl GenerationToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// The visible chat transcript.
///
/// Always holds at least the greeting. Only the last message is ever
/// modified, and only by the generation that is currently streaming.
/// Every reset and every submission bumps the generation counter so
/// output from an orphaned stream is dropped instead of landing in the
/// new transcript.
#[derive(Clone, Debug)]
pub struct Conversation {
    greeting: String,
    transcript: Transcript,
    generation: u64,
    state: StreamState,
    // Transcript length before the current submission's user message
    rollback_len: usize,
}

impl Conversation {
    pub fn new(greeting: &str) -> Self {
        let mut conversation = Self {
            greeting: greeting.to_string(),
            transcript: Transcript::new(),
            generation: 0,
            state: StreamState::Idle,
            rollback_len: 0,
        };
        conversation.seed();
        conversation
    }

    fn seed(&mut self) {
        self.transcript = Transcript::new_with_messages(vec![Message::new(
            Role::Assistant,
            &self.greeting,
        )]);
        self.rollback_len = self.transcript.len();
    }

    fn is_current(&self, token: GenerationToken) -> bool {
        token.0 == self.generation && self.state.is_streaming()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.transcript.messages()
    }

    pub fn last(&self) -> Option<&Message> {
        self.transcript.last()
    }

    pub fn len(&self) -> usize {
        self.transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Discard all history and go back to just the greeting. Any stream
    /// still running becomes stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = StreamState::Idle;
        self.seed();
    }

    /// Record a user message and start a new generation for it.
    pub fn submit(&mut self, msg: Message) -> Result<GenerationToken> {
        if self.state.is_streaming() {
            bail!("A generation is already in flight");
        }
        self.rollback_len = self.transcript.len();
        self.transcript.push(msg);
        self.generation += 1;
        self.state = StreamState::AwaitingFirstFragment;
        Ok(GenerationToken(self.generation))
    }

    /// Append `fragment` to the generated message. Returns `false` if
    /// `token` is stale and nothing was changed.
    pub fn apply_fragment(&mut self, token: GenerationToken, fragment: &str) -> bool {
        if !self.is_current(token) {
            return false;
        }
        match self.state {
            StreamState::AwaitingFirstFragment => {
                self.transcript
                    .push(Message::new(Role::Assistant, fragment));
                self.state = StreamState::Accumulating;
            }
            StreamState::Accumulating => {
                if let Some(last) = self.transcript.last_mut() {
                    last.content.push_str(fragment);
                }
            }
            StreamState::Idle | StreamState::Aborted => return false,
        }
        true
    }

    /// The stream ended normally.
    pub fn finish(&mut self, token: GenerationToken) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.state = StreamState::Idle;
        true
    }

    /// The stream failed. A partially generated message is kept and
    /// marked as truncated.
    pub fn fail(&mut self, token: GenerationToken) -> bool {
        if !self.is_current(token) {
            return false;
        }
        if self.state == StreamState::Accumulating
            && let Some(last) = self.transcript.last_mut()
        {
            last.truncated = true;
        }
        self.state = StreamState::Aborted;
        true
    }

    /// The generation never started. Removes the submission's user
    /// message so the transcript is back to where it was before.
    pub fn rollback(&mut self, token: GenerationToken) -> bool {
        if !self.is_current(token) || self.state != StreamState::AwaitingFirstFragment {
            return false;
        }
        self.transcript.truncate(self.rollback_len);
        self.state = StreamState::Idle;
        true
    }
}
