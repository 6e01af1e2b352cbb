pub mod api;
pub mod build;
pub mod codes;
pub mod engine;

use thiserror::Error;

use crate::config::ConfigError;
use crate::errors::api::ApiError;
use crate::errors::build::BuildError;
use crate::errors::engine::EngineError;

pub type ShimResult<T> = Result<T, ShimError>;

pub trait HasErrorCode {
    fn error_code(&self) -> &'static str;
}

#[derive(Debug, Error)]
pub enum ShimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl HasErrorCode for ShimError {
    fn error_code(&self) -> &'static str {
        match self {
            ShimError::Config(e) => e.error_code(),
            ShimError::Engine(e) => e.error_code(),
            ShimError::Build(e) => e.error_code(),
            ShimError::Api(e) => e.error_code(),
            ShimError::Internal(_) => codes::ErrorCode::INTERNAL,
        }
    }
}
