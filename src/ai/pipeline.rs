//! Two stage prompt pipeline that turns a free-form interface request
//! into a UIDL document.
//!
//! 1. Extraction: a blocking completion rewrites the request into a
//!    single canonical sentence listing the required UI elements.
//! 2. Generation: the canonical sentence and the reference grammar are
//!    sent as a streaming completion and the document is returned
//!    fragment by fragment.
//!
//! Only one generation may be alive per pipeline. `run` keeps the
//! in-flight guard inside the returned `Generation` so it is released
//! when the caller drops it, whether or not the stream was exhausted.
//! Callers that drive the stages themselves take the guard with
//! `acquire` and decide when to let it go.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use anyhow::{Result, bail};
use futures::Stream;
use handlebars::Handlebars;
use serde_json::json;

use super::client::ModelClient;
use super::decoder::{OutputDecoder, StringDecoder};
use super::grammar::ReferenceGrammar;
use super::prompt::{Prompt, templates};
use super::stream::FragmentStream;
use crate::openai::{Message, Role};

/// Held while a generation is running on a pipeline.
pub struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            bail!("A generation is already in flight");
        }
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A running generation: the canonical sentence from the extraction
/// stage and the stream of decoded document fragments.
pub struct Generation {
    canonical: String,
    fragments: FragmentStream,
    _guard: InFlightGuard,
}

impl Generation {
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl Stream for Generation {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.fragments).poll_next(cx)
    }
}

pub struct Pipeline {
    client: Arc<dyn ModelClient>,
    decoder: Arc<dyn OutputDecoder>,
    grammar: ReferenceGrammar,
    templates: Handlebars<'static>,
    in_flight: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(client: Arc<dyn ModelClient>, grammar: ReferenceGrammar) -> Self {
        Self {
            client,
            decoder: Arc::new(StringDecoder),
            grammar,
            templates: templates(),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn OutputDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn grammar(&self) -> &ReferenceGrammar {
        &self.grammar
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim the pipeline without calling the model. Fails if another
    /// generation is in flight.
    pub fn acquire(&self) -> Result<InFlightGuard> {
        InFlightGuard::acquire(&self.in_flight)
    }

    pub fn extraction_request(&self, utterance: &str) -> Result<Vec<Message>> {
        let system = self
            .templates
            .render(&Prompt::Extraction.to_string(), &json!({}))?;
        Ok(vec![
            Message::new(Role::System, &system),
            Message::new(Role::User, utterance),
        ])
    }

    pub fn generation_request(&self, canonical: &str) -> Result<Vec<Message>> {
        let system = self.templates.render(
            &Prompt::Generation.to_string(),
            &json!({
                "grammar": self.grammar.text(),
                "version": self.grammar.version(),
            }),
        )?;
        Ok(vec![
            Message::new(Role::System, &system),
            Message::new(Role::User, canonical),
        ])
    }

    /// Rewrite `utterance` into the canonical requirement sentence.
    /// The answer is used verbatim; it is not checked against the
    /// expected pattern.
    pub async fn extract(&self, utterance: &str) -> Result<String> {
        let request = self.extraction_request(utterance)?;
        let raw = self.client.complete(&request).await?;
        let canonical = self.decoder.decode(&raw);
        tracing::debug!("Extracted requirement: {}", canonical);
        Ok(canonical)
    }

    /// Start streaming a UIDL document for `canonical`.
    pub async fn generate(&self, canonical: &str) -> Result<FragmentStream> {
        let request = self.generation_request(canonical)?;
        let fragments = self.client.stream(&request).await?;
        Ok(fragments.decoded(Arc::clone(&self.decoder)))
    }

    /// Run both stages for `utterance`. Fails without calling the model
    /// if another generation from this pipeline is still alive. If
    /// extraction fails the generation stage is never started.
    pub async fn run(&self, utterance: &str) -> Result<Generation> {
        let guard = self.acquire()?;
        let canonical = self.extract(utterance).await?;
        let fragments = self.generate(&canonical).await?;

        Ok(Generation {
            canonical,
            fragments,
            _guard: guard,
        })
    }
}
