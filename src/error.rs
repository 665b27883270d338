// src/error.rs
use std::io;
use thiserror::Error;

/// Result type used throughout the agent
pub type Result<T> = std::result::Result<T, AgentError>;

/// Custom Error type for the varnish agent
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("No metric has been configured for instance \"{instance}\"")]
    EmptyConfiguration { instance: String },

    #[error("Instance \"{0}\" is already registered")]
    DuplicateInstance(String),

    #[error("Unable to load statistics for instance \"{instance}\": {reason}")]
    SnapshotFetch { instance: String, reason: String },

    #[error("Failed to emit sample: {0}")]
    SampleEmit(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl AgentError {
    /// Wrap any error raised while reading statistics as a fetch failure
    pub fn snapshot_fetch(instance: impl Into<String>, reason: impl ToString) -> Self {
        AgentError::SnapshotFetch {
            instance: instance.into(),
            reason: reason.to_string(),
        }
    }
}
