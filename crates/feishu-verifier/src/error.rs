//! Error types for the verifier.
//!
//! None of these abort a verification run: [`crate::Verifier`] records them
//! as strings in the result file.

/// Unified error type for browser control.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// No Chromium executable could be found.
    #[error("could not find a Chrome/Chromium executable; set FEISHU_BROWSER_PATH")]
    BrowserNotFound,

    /// Spawning the browser process failed.
    #[error("failed to launch browser at `{path}`: {source}")]
    Launch {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A browser operation did not finish in time.
    #[error("timed out after {seconds}s: {reason}")]
    Timeout { seconds: u64, reason: String },

    /// The DevTools endpoint or a CDP command returned an error.
    #[error("devtools error: {0}")]
    Cdp(String),

    /// WebSocket transport failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP failure talking to the DevTools endpoint.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The screenshot payload was not valid base64.
    #[error("screenshot decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, VerifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display() {
        let err = VerifyError::Timeout {
            seconds: 30,
            reason: "waiting for `Page.navigate`".into(),
        };
        assert_eq!(
            err.to_string(),
            "timed out after 30s: waiting for `Page.navigate`"
        );
    }

    #[test]
    fn launch_display_names_path() {
        let err = VerifyError::Launch {
            path: "/opt/chrome".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("/opt/chrome"));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VerifyError>();
    }
}
