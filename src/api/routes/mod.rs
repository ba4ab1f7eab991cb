//! API routes module

pub mod chat;
pub mod conversation;

use std::sync::{Arc, RwLock};

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<RwLock<AppState>>;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Single shot chat and UIDL generation routes
        .merge(chat::router())
        // Server-side conversation routes
        .nest("/conversation", conversation::router())
}
