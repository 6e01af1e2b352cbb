use thiserror::Error;

/// Failures from the external engine and build CLIs. Every variant is scoped
/// to the request that triggered the invocation; none of them is fatal to the
/// server process.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to spawn {command}: {reason}")]
    SpawnFailed { command: String, reason: String },

    #[error("Command {command} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Unexpected output from {command}: {reason}")]
    UnparsableOutput { command: String, reason: String },

    #[error("{message}")]
    NotFound { message: String },
}

impl EngineError {
    pub fn error_code(&self) -> &'static str {
        use crate::errors::codes::ErrorCode;

        match self {
            EngineError::SpawnFailed { .. } => ErrorCode::ENGINE_SPAWN_FAILED,
            EngineError::CommandFailed { .. } => ErrorCode::ENGINE_COMMAND_FAILED,
            EngineError::UnparsableOutput { .. } => ErrorCode::ENGINE_UNPARSABLE_OUTPUT,
            EngineError::NotFound { .. } => ErrorCode::ENGINE_RESOURCE_NOT_FOUND,
        }
    }
}
