use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to prepare build context: {0}")]
    Context(#[from] std::io::Error),

    #[error("Archive entry '{name}' escapes the build context")]
    UnsafePath { name: String },

    #[error("Failed to read build archive: {reason}")]
    BadArchive { reason: String },
}

impl BuildError {
    pub fn error_code(&self) -> &'static str {
        use crate::errors::codes::ErrorCode;

        match self {
            BuildError::Context(_) => ErrorCode::BUILD_CONTEXT_FAILED,
            BuildError::UnsafePath { .. } => ErrorCode::BUILD_UNSAFE_ARCHIVE_PATH,
            BuildError::BadArchive { .. } => ErrorCode::BUILD_BAD_ARCHIVE,
        }
    }
}
