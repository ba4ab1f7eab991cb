//! Public API types

use axum::response::{IntoResponse, Response};
use http::StatusCode;

// Errors

/// Every failure is reported to the caller the same way. The cause is
/// only logged.
pub struct ApiError(anyhow::Error);

/// Convert `ApiError` into an Axum compatible response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Always log the error
        tracing::error!("{:#}", self.0);

        (StatusCode::INTERNAL_SERVER_ERROR, "Error").into_response()
    }
}

/// Enables using `?` on functions that return `Result<_,
/// anyhow::Error>` to turn them into `Result<_, ApiError>`
impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// Re-export public types from each route

pub mod chat {
    pub use crate::api::routes::chat::public::*;
}

pub mod conversation {
    pub use crate::api::routes::conversation::public::*;
}
