//! Error types for the HTTP server.

use std::io;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use ona_site::RenderError;

/// Error returned when the server cannot start or stops abnormally.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Host and port do not form a socket address.
    #[error("Invalid listen address {0}")]
    InvalidAddress(String),

    /// I/O error while binding or serving.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failure while handling one request.
#[derive(Debug, thiserror::Error)]
pub(crate) enum RequestError {
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("bad request URL: {0}")]
    BadUrl(String),

    #[error("cannot decode request path: {0}")]
    Decode(String),

    #[error("no node matches the request path")]
    NotFound,

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("request exceeded its time limit")]
    Timeout,

    #[error("request handler panicked: {0}")]
    Panicked(String),
}

impl RequestError {
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadUrl(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            Self::Decode(_) | Self::Render(_) | Self::Panicked(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => (StatusCode::NOT_FOUND, "not found").into_response(),
            other => other.status().into_response(),
        }
    }
}
