//! Error types for the Markdown parser.

use std::path::PathBuf;

/// Errors that can occur while reading or parsing a Markdown source.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The Markdown file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line pattern failed to compile.
    #[error("invalid line pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// JSON (de)serialization of the block document failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ParseError>;
