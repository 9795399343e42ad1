//! Front Desk Server
//!
//! Lets a browser act as the speech collaborators over a WebSocket and
//! exposes the call over HTTP.

pub mod http;
pub mod metrics;
pub mod state;
pub mod websocket;

pub use http::create_router;
pub use metrics::init_metrics;
pub use state::AppState;
pub use websocket::{ClientMessage, ServerMessage, WsCapture, WsSynthesis};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use front_desk_agent::AgentError;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("No client attached")]
    NoClient,

    #[error("A client is already attached")]
    ClientAttached,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        (&err).into()
    }
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::NoClient => StatusCode::NOT_FOUND,
            ServerError::ClientAttached => StatusCode::CONFLICT,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::WebSocket(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AgentError> for ServerError {
    fn from(err: AgentError) -> Self {
        if err.is_invalid_transition() {
            ServerError::Conflict(err.to_string())
        } else if err.is_closed() {
            ServerError::NoClient
        } else {
            ServerError::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
