//! Error types for the auth crate.
//!
//! Every token operation surfaces failures through [`AuthError`]. Variants
//! carry enough context to tell the user what to do next (usually: run
//! `feishu-doc auth` again).

/// Unified error type for token exchange, refresh, and the OAuth flow.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The Open API answered with a non-zero `code`.
    #[error("Feishu API error (code {code}): {msg}")]
    Api {
        /// The API error code.
        code: i64,
        /// The API error message.
        msg: String,
    },

    /// No user token file exists yet.
    #[error("no user access token at {path}; run `feishu-doc auth` first")]
    TokenMissing {
        /// Where the token file was expected.
        path: String,
    },

    /// Both the access token and the refresh token have expired.
    #[error("user access token expired and cannot be refreshed; run `feishu-doc auth` again")]
    TokenExpired,

    /// The code exchange or refresh grant was rejected.
    #[error("invalid grant: {reason}")]
    InvalidGrant {
        /// Explanation from the authorization server.
        reason: String,
    },

    /// The OAuth flow failed for a non-specific reason.
    #[error("authorization flow failed: {reason}")]
    FlowFailed {
        /// Details about why the flow failed.
        reason: String,
    },

    /// The local callback server timed out waiting for the redirect.
    #[error("callback timed out after {timeout_secs} seconds")]
    CallbackTimeout {
        /// How many seconds we waited before giving up.
        timeout_secs: u64,
    },

    /// An HTTP request failed at the transport level.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (token file, callback listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("url parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The configuration cannot support the requested operation.
    #[error("config error: {0}")]
    Config(#[from] feishu_config::ConfigError),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
