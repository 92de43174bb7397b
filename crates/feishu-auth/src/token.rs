//! Token types and the on-disk user token file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Seconds before the real expiry at which a token is treated as expired.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Lifetime assumed when a grant omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: i64 = 7200;

/// Lifetime assumed when a grant omits `refresh_token_expires_in`.
pub const DEFAULT_REFRESH_EXPIRES_IN: i64 = 604_800;

/// An app-level token from the internal tenant endpoint.
#[derive(Debug, Clone)]
pub struct TenantToken {
    pub token: String,
    /// Unix timestamp (seconds).
    pub expires_at: i64,
}

impl TenantToken {
    pub fn is_valid_at(&self, now: i64) -> bool {
        now < self.expires_at - EXPIRY_MARGIN_SECS
    }
}

/// The persisted user token file.
///
/// `user_access_token` mirrors `access_token`; files written by older tools
/// only carry one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserToken {
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) when the access token expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// Unix timestamp (seconds) when the refresh token expires.
    #[serde(default)]
    pub refresh_expires_at: Option<i64>,
    #[serde(default)]
    pub scope: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl UserToken {
    /// The bearer value, whichever field holds it.
    pub fn bearer(&self) -> Option<&str> {
        self.user_access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| Some(self.access_token.as_str()).filter(|t| !t.is_empty()))
    }

    /// Whether the access token can still be used at `now`.
    ///
    /// A file without `expires_at` is trusted as-is.
    pub fn is_access_valid_at(&self, now: i64) -> bool {
        self.bearer().is_some()
            && self
                .expires_at
                .is_none_or(|exp| now < exp - EXPIRY_MARGIN_SECS)
    }

    /// Whether the refresh token can still be exchanged at `now`.
    pub fn can_refresh_at(&self, now: i64) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
            && self
                .refresh_expires_at
                .is_none_or(|exp| now < exp - EXPIRY_MARGIN_SECS)
    }
}

/// Reads and writes the user token JSON file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the token file; `Ok(None)` when it does not exist.
    pub fn load(&self) -> Result<Option<UserToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let token: UserToken = serde_json::from_str(&raw)?;
        Ok(Some(token))
    }

    /// Write the token file (pretty JSON), creating parent directories.
    pub fn save(&self, token: &UserToken) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(token)?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "user token saved");
        Ok(())
    }
}
