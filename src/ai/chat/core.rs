use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::models::{Conversation, GenerationToken};
use crate::ai::pipeline::{InFlightGuard, Pipeline};
use crate::ai::stream::FragmentStream;
use crate::openai::{Message, Role};

/// The submission currently holding the pipeline.
struct Active {
    token: GenerationToken,
    cancel: CancellationToken,
    _guard: InFlightGuard,
}

/// A conversation driven by the UIDL pipeline.
///
/// The conversation lock is only held for the synchronous updates
/// between awaits, never while waiting on the model.
#[derive(Clone)]
pub struct ChatSession {
    pipeline: Arc<Pipeline>,
    conversation: Arc<Mutex<Conversation>>,
    active: Arc<Mutex<Option<Active>>>,
}

impl ChatSession {
    pub fn new(pipeline: Arc<Pipeline>, greeting: &str) -> Self {
        Self {
            pipeline,
            conversation: Arc::new(Mutex::new(Conversation::new(greeting))),
            active: Arc::new(Mutex::new(None)),
        }
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        // Every update leaves the data consistent, so a panic elsewhere
        // doesn't invalidate it
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A snapshot of the current conversation.
    pub fn conversation(&self) -> Conversation {
        Self::lock(&self.conversation).clone()
    }

    /// Go back to the greeting. A submission that is still running is
    /// cancelled and gives up the pipeline immediately, so the next
    /// message can be sent straight away.
    pub fn reset(&self) {
        Self::lock(&self.conversation).reset();
        if let Some(active) = Self::lock(&self.active).take() {
            active.cancel.cancel();
        }
    }

    /// Claim the pipeline, record the user's message and reserve the
    /// next generation for it. Fails without touching the conversation
    /// if the pipeline is busy, whether with this conversation or with
    /// another caller.
    pub fn submit(&self, content: &str) -> Result<Submission> {
        let guard = self.pipeline.acquire()?;
        let token = Self::lock(&self.conversation).submit(Message::new(Role::User, content))?;
        let cancel = CancellationToken::new();
        *Self::lock(&self.active) = Some(Active {
            token,
            cancel: cancel.clone(),
            _guard: guard,
        });

        Ok(Submission {
            pipeline: Arc::clone(&self.pipeline),
            conversation: Arc::clone(&self.conversation),
            active: Arc::clone(&self.active),
            token,
            cancel,
            content: content.to_string(),
        })
    }

    /// Submit `content` and run the pipeline to completion.
    pub async fn send(&self, content: &str, tx: Option<mpsc::UnboundedSender<String>>) -> Result<()> {
        self.submit(content)?.run(tx).await
    }
}

/// A user message waiting for its generated reply.
///
/// Dropping a submission that never started streaming withdraws the
/// user message. Either way the pipeline is released.
pub struct Submission {
    pipeline: Arc<Pipeline>,
    conversation: Arc<Mutex<Conversation>>,
    active: Arc<Mutex<Option<Active>>>,
    token: GenerationToken,
    cancel: CancellationToken,
    content: String,
}

impl Submission {
    pub fn token(&self) -> GenerationToken {
        self.token
    }

    /// Run both stages and apply each fragment to the conversation as
    /// it arrives. Fragments are also forwarded to `tx` when given; a
    /// closed receiver does not stop the generation.
    ///
    /// If extraction fails the user message is removed again. If the
    /// generation fails, before or after its first fragment, the
    /// conversation is left as it is and marked aborted. A reset at any
    /// point stops the submission and nothing more is applied.
    pub async fn run(self, tx: Option<mpsc::UnboundedSender<String>>) -> Result<()> {
        let canonical = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(()),
            canonical = self.pipeline.extract(&self.content) => canonical,
        };
        let canonical = match canonical {
            Ok(canonical) => canonical,
            Err(e) => {
                ChatSession::lock(&self.conversation).rollback(self.token);
                return Err(e);
            }
        };

        let fragments = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(()),
            fragments = self.pipeline.generate(&canonical) => fragments,
        };
        let mut fragments = match fragments {
            Ok(fragments) => fragments.with_cancel(self.cancel.clone()),
            Err(e) => {
                ChatSession::lock(&self.conversation).fail(self.token);
                return Err(e);
            }
        };

        self.consume(&mut fragments, tx).await
    }

    async fn consume(
        &self,
        fragments: &mut FragmentStream,
        tx: Option<mpsc::UnboundedSender<String>>,
    ) -> Result<()> {
        while let Some(fragment) = fragments.next().await {
            let fragment = match fragment {
                Ok(fragment) => fragment,
                Err(e) => {
                    ChatSession::lock(&self.conversation).fail(self.token);
                    return Err(e);
                }
            };

            let applied =
                ChatSession::lock(&self.conversation).apply_fragment(self.token, &fragment);
            if !applied {
                tracing::warn!(
                    "Dropping fragment from stale generation {}",
                    self.token.value()
                );
                fragments.cancel();
                return Ok(());
            }

            if let Some(tx) = &tx {
                // The result is ignored here because we want to finish
                // building the transcript even if nobody is listening
                let _ = tx.send(fragment);
            }
        }

        ChatSession::lock(&self.conversation).finish(self.token);
        Ok(())
    }
}

impl Drop for Submission {
    fn drop(&mut self) {
        // No-op unless the submission never got past the user message
        ChatSession::lock(&self.conversation).rollback(self.token);

        let mut active = ChatSession::lock(&self.active);
        if active.as_ref().is_some_and(|a| a.token == self.token) {
            active.take();
        }
    }
}
