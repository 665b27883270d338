use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Result type for process operations
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

/// Errors that can occur while running an external command
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to spawn process: {0}")]
    SpawnError(#[from] io::Error),

    #[error("Process exited with non-zero status: {status}: {stderr}")]
    NonZeroExit { status: ExitStatus, stderr: String },

    #[error("Process timed out after {0:?}")]
    Timeout(Duration),

    #[error("Process output parse error: {0}")]
    ParseError(String),
}

impl From<ProcessError> for crate::error::AgentError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Timeout(limit) => {
                crate::error::AgentError::Timeout(format!("Process timed out after {:?}", limit))
            }
            ProcessError::SpawnError(e) => crate::error::AgentError::Io(e),
            other => crate::error::AgentError::Process(other.to_string()),
        }
    }
}
