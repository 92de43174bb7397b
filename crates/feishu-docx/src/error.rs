//! Docx client error types.
//!
//! [`DocxError::is_retryable`] decides which failures the client retries:
//! throttling, server errors, and transport failures.

/// Frequency-limit code returned by the Open API.
pub const RATE_LIMIT_CODE: i64 = 99_991_400;

/// Unified error type for document API calls.
#[derive(Debug, thiserror::Error)]
pub enum DocxError {
    /// The API envelope carried a non-zero `code`.
    #[error("{op} failed: Feishu API error (code {code}): {msg}")]
    Api {
        op: &'static str,
        code: i64,
        msg: String,
    },

    /// Non-success HTTP status without a parsable API envelope.
    #[error("{op} failed: HTTP {status}: {body}")]
    Http {
        op: &'static str,
        status: u16,
        body: String,
    },

    /// The response lacked a field the caller needs.
    #[error("{op} failed: unexpected response: {reason}")]
    InvalidResponse { op: &'static str, reason: String },

    /// An image block has no usable source.
    #[error("image source unavailable: {0}")]
    ImageSource(String),

    /// Transport-level HTTP failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Token acquisition failed.
    #[error("auth error: {0}")]
    Auth(#[from] feishu_auth::AuthError),

    /// Reading a local image failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DocxError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { code, .. } => *code == RATE_LIMIT_CODE,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Network(e) => !e.is_builder() && !e.is_decode(),
            _ => false,
        }
    }
}

/// Convenience alias used throughout the docx crate.
pub type Result<T> = std::result::Result<T, DocxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_and_server_errors_retry() {
        let throttled = DocxError::Api {
            op: "add_children",
            code: RATE_LIMIT_CODE,
            msg: "request trigger frequency limit".into(),
        };
        assert!(throttled.is_retryable());

        for status in [429, 500, 503] {
            let err = DocxError::Http {
                op: "add_children",
                status,
                body: String::new(),
            };
            assert!(err.is_retryable(), "HTTP {status} should retry");
        }
    }

    #[test]
    fn client_errors_do_not_retry() {
        let bad_request = DocxError::Http {
            op: "create_document",
            status: 400,
            body: "bad".into(),
        };
        assert!(!bad_request.is_retryable());

        let forbidden = DocxError::Api {
            op: "create_document",
            code: 1_770_032,
            msg: "forbidden".into(),
        };
        assert!(!forbidden.is_retryable());
        assert!(!DocxError::ImageSource("none".into()).is_retryable());
    }

    #[test]
    fn error_display_names_operation() {
        let err = DocxError::Api {
            op: "transfer_owner",
            code: 1063001,
            msg: "invalid param".into(),
        };
        assert_eq!(
            err.to_string(),
            "transfer_owner failed: Feishu API error (code 1063001): invalid param"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DocxError>();
    }
}
