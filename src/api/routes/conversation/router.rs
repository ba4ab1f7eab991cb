//! Router for the server-side conversation

use std::convert::Infallible;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    response::{IntoResponse, sse::Event, sse::KeepAlive, sse::Sse},
    routing::{get, post},
};
use tokio::sync::mpsc;
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::public::ConversationResponse;
use crate::api::public::chat::ChatRequest;
use crate::api::state::AppState;

type SharedState = Arc<RwLock<AppState>>;

/// Get the current transcript
async fn conversation(State(state): State<SharedState>) -> Json<ConversationResponse> {
    let session = state
        .read()
        .expect("Unable to read share state")
        .session
        .clone();
    Json(ConversationResponse::from(&session.conversation()))
}

/// Add a user message and stream the generated document. Each
/// fragment is sent as one event and applied to the transcript as it
/// arrives.
async fn send_message(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse, crate::api::public::ApiError> {
    let payload = ChatRequest::from_slice(&body)?;
    let session = state
        .read()
        .expect("Unable to read share state")
        .session
        .clone();

    // Fails right away if this conversation or `/api/uidl` is already
    // generating
    let submission = session.submit(payload.content())?;
    let token = submission.token();

    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let sse_stream = UnboundedReceiverStream::new(rx)
        .map(|chunk| Ok::<Event, Infallible>(Event::default().data(chunk)));

    tokio::spawn(async move {
        if let Err(e) = submission.run(Some(tx)).await {
            tracing::error!(
                "Generation {} failed: {}. Root cause: {}",
                token.value(),
                e,
                e.root_cause()
            );
        }
    });

    let resp = Sse::new(sse_stream)
        .keep_alive(
            KeepAlive::default()
                .text("keep-alive")
                .interval(Duration::from_secs(15)),
        )
        .into_response();

    Ok(resp)
}

/// Discard the transcript and start over from the greeting
async fn reset(State(state): State<SharedState>) -> Json<ConversationResponse> {
    let session = state
        .read()
        .expect("Unable to read share state")
        .session
        .clone();
    session.reset();
    Json(ConversationResponse::from(&session.conversation()))
}

/// Create the conversation router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(conversation))
        .route("/messages", post(send_message))
        .route("/reset", post(reset))
}
