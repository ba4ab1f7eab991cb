//! Router for the chat API

use std::sync::{Arc, RwLock};

use anyhow::Result;
use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
};
use futures::Stream;
use futures_util::TryStreamExt;
use http::header;

use super::public;
use crate::api::state::AppState;
use crate::openai::{Message, Role};

type SharedState = Arc<RwLock<AppState>>;

/// Stream text fragments back as a plain text body. A failure after
/// the first fragment can only cut the body short.
fn text_stream<S>(fragments: S) -> Response
where
    S: Stream<Item = Result<String>> + Send + 'static,
{
    let fragments = fragments.inspect_err(|e| tracing::error!("Stream failed: {:#}", e));
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(fragments),
    )
        .into_response()
}

/// Forward the message straight to the model and stream its answer
async fn chat_handler(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse, crate::api::public::ApiError> {
    let payload = public::ChatRequest::from_slice(&body)?;
    let client = state
        .read()
        .expect("Unable to read share state")
        .client
        .clone();

    let fragments = client
        .stream(&[Message::new(Role::User, payload.content())])
        .await?;

    Ok(text_stream(fragments))
}

/// Run the extraction and generation stages and stream the UIDL
/// document
async fn uidl_handler(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse, crate::api::public::ApiError> {
    let payload = public::ChatRequest::from_slice(&body)?;
    let pipeline = state
        .read()
        .expect("Unable to read share state")
        .pipeline
        .clone();

    let generation = pipeline.run(payload.content()).await?;
    tracing::info!("Generating UIDL for: {}", generation.canonical());

    Ok(text_stream(generation))
}

/// Create the chat router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/uidl", post(uidl_handler))
}
