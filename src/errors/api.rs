use thiserror::Error;

/// Client-side request problems detected before any CLI is invoked.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{received} is not a tar media type")]
    NotTar { received: String },

    #[error("Missing required query parameter '{name}'")]
    MissingQuery { name: &'static str },

    #[error("Invalid query parameter '{name}': {reason}")]
    InvalidQuery { name: &'static str, reason: String },
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        use crate::errors::codes::ErrorCode;

        match self {
            ApiError::NotTar { .. } => ErrorCode::API_NOT_TAR,
            ApiError::MissingQuery { .. } => ErrorCode::API_MISSING_QUERY,
            ApiError::InvalidQuery { .. } => ErrorCode::API_INVALID_QUERY,
        }
    }
}
