//! Error types for the workflow crate.

use std::path::PathBuf;

/// Unified error type for hand-off files, logging, and orchestration.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The Markdown input does not exist.
    #[error("input file not found: {}", path.display())]
    InputMissing { path: PathBuf },

    /// A hand-off file could not be read or written.
    #[error("cannot access {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A hand-off file is not valid JSON of the expected shape.
    #[error("malformed {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A step process could not be started.
    #[error("failed to start step `{step}`: {source}")]
    Spawn {
        step: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A required step exited unsuccessfully.
    #[error("step `{step}` failed: {reason}")]
    StepFailed { step: &'static str, reason: String },

    /// A required step exited cleanly but left no output file.
    #[error("step `{step}` produced no {}", path.display())]
    MissingOutput { step: &'static str, path: PathBuf },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, WorkflowError>;
