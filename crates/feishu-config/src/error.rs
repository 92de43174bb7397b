//! Error types for the config crate.

use std::path::PathBuf;

/// Errors raised while locating, reading, or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No config file was found in any of the searched locations.
    #[error("config file not found (searched: {searched})")]
    NotFound {
        /// Human-readable list of the paths that were tried.
        searched: String,
    },

    /// A required key is absent or empty.
    #[error("missing required config key `{key}`")]
    Missing {
        /// The key that was expected.
        key: String,
    },

    /// A key is present but its value cannot be used.
    #[error("invalid value for `{key}`: {reason}")]
    Invalid {
        /// The offending key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The env file could not be parsed.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// The file being parsed.
        path: PathBuf,
        /// The underlying dotenv error.
        #[source]
        source: dotenvy::Error,
    },

    /// I/O error while reading the config file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_missing() {
        let err = ConfigError::Missing {
            key: "FEISHU_APP_ID".to_string(),
        };
        assert_eq!(err.to_string(), "missing required config key `FEISHU_APP_ID`");
    }

    #[test]
    fn error_display_invalid() {
        let err = ConfigError::Invalid {
            key: "FEISHU_MAX_RETRIES".to_string(),
            reason: "not a number".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for `FEISHU_MAX_RETRIES`: not a number"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConfigError>();
    }
}
