//! HTTP endpoints and the error type they share.

mod health;
pub mod planner;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use agenda_core::error::CoreError;

pub use health::health;
pub use planner::{planner, planner_options};

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing required parameter `{0}`")]
    MissingParameter(&'static str),

    #[error("Missing or invalid identity header `{0}`")]
    MissingIdentity(&'static str),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_) | ApiError::MissingIdentity(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            ApiError::Core(CoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to clients. Infrastructure failures are logged and
    /// replaced with a generic message.
    fn public_message(&self) -> String {
        match self {
            ApiError::Core(
                e @ (CoreError::Database(_)
                | CoreError::Migration(_)
                | CoreError::Io(_)
                | CoreError::Serialization(_)),
            ) => {
                error!(error = %e, "Planner request failed");
                "Internal server error".to_string()
            }
            ApiError::Core(e @ CoreError::InvalidRecurrence { .. }) => {
                error!(error = %e, "Stored recurrence rule could not be evaluated");
                e.to_string()
            }
            ApiError::Core(CoreError::InvalidInput(message)) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.public_message(),
        });
        (status, body).into_response()
    }
}
