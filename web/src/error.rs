//! HTTP error responses.
//!
//! Every failure the API reports is an [`AppError`], rendered as
//! `{"error": "<message>"}` with its status code. Handlers build them from
//! domain outcomes; store failures convert with `?`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use todo_api_runtime::StoreError;

/// An error a handler answers with
///
/// `message` goes to the client verbatim. `source`, when present, is only
/// logged.
///
/// ```ignore
/// let todo = store
///     .state(|s| s.get(index).cloned())
///     .await
///     .ok_or_else(|| AppError::not_found("Task not found"))?;
/// ```
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Error with an explicit status
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause for the server log
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Response status
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 400
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500, with a generic message
    #[must_use]
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let cause = self.source.as_ref().map(tracing::field::display);
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), message = %self.message, cause, "Request failed");
        } else {
            tracing::debug!(status = self.status.as_u16(), message = %self.message, "Request rejected");
        }

        let body = Json(ErrorBody {
            error: &self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal().with_source(error)
    }
}

/// A command that never got its outcome
impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            // The command may still have been applied
            StoreError::Timeout => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, "Request timed out").with_source(error)
            },
            StoreError::ShutdownInProgress | StoreError::ChannelClosed => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down")
            },
            StoreError::ShutdownTimeout(_) => Self::internal().with_source(error),
        }
    }
}
