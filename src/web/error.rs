//! Server error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::api::ErrorResponse;
use crate::chat::TeachError;
use crate::knowledge::KnowledgeError;

/// Errors that can occur while serving requests.
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Listener failed while serving.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    /// Knowledge base could not be loaded.
    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),

    /// Teaching failed.
    #[error(transparent)]
    Teach(#[from] TeachError),

    /// Request was well-formed JSON but unusable.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Blocking task was cancelled.
    #[error("Blocking task cancelled")]
    TaskCancelled,
}

impl ServerError {
    /// HTTP status reported for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Teach(TeachError::InvalidEntry(_)) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(status = %status, error = %self, "Request failed");
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
