use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::errors::build::BuildError;
use crate::errors::engine::EngineError;
use crate::errors::{HasErrorCode, ShimError};

/// Body of a 500 response. Client-caused failures (4xx) get plain text, the
/// way Docker's own daemon responds.
#[derive(Debug, Serialize)]
pub struct Problem {
    pub message: String,
    pub code: &'static str,
}

impl IntoResponse for ShimError {
    fn into_response(self) -> Response {
        warn!(code = self.error_code(), error = %self, "request failed");
        match &self {
            ShimError::Engine(EngineError::NotFound { message }) => {
                (StatusCode::NOT_FOUND, message.clone()).into_response()
            }
            ShimError::Api(_)
            | ShimError::Build(BuildError::UnsafePath { .. })
            | ShimError::Build(BuildError::BadArchive { .. }) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Problem {
                    message: self.to_string(),
                    code: self.error_code(),
                }),
            )
                .into_response(),
        }
    }
}
