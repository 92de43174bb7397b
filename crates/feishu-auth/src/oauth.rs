//! Feishu OAuth 2.0 authorization code flow with PKCE.
//!
//! 1. Generate a PKCE verifier and a `state` value.
//! 2. Send the user to the Feishu authorize page.
//! 3. Receive `code` on the local redirect URI.
//! 4. Exchange code + verifier at `/open-apis/authen/v2/oauth/token`.
//! 5. Refresh the same endpoint with `grant_type=refresh_token` later on.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use feishu_config::FeishuConfig;
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use serde_json::{Value, json};
use url::Url;

use crate::error::{AuthError, Result};
use crate::token::{DEFAULT_EXPIRES_IN, DEFAULT_REFRESH_EXPIRES_IN, UserToken};

/// Authorize page used when the API domain does not follow the
/// `https://open.<host>` pattern.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.feishu.cn/open-apis/authen/v1/authorize";

/// Scopes needed to create documents, edit them, and transfer ownership.
pub const SCOPES: &[&str] = &[
    "drive:drive",
    "docs:doc",
    "docx:document",
    "docs:permission.member:create",
    "offline_access",
];

/// Path of the user token endpoint, below `/open-apis`.
pub const TOKEN_PATH: &str = "/authen/v2/oauth/token";

/// Length of the PKCE code verifier in bytes (before base64 encoding).
const PKCE_VERIFIER_BYTES: usize = 32;

// ---------------------------------------------------------------------------
// PKCE helpers
// ---------------------------------------------------------------------------

/// Generate a PKCE code verifier (random 32 bytes, base64url encoded).
pub fn generate_pkce_verifier() -> Result<String> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; PKCE_VERIFIER_BYTES];
    rng.fill(&mut bytes).map_err(|_| AuthError::FlowFailed {
        reason: "failed to generate PKCE verifier: CSPRNG error".to_string(),
    })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// `BASE64URL(SHA256(verifier))`.
pub fn pkce_challenge(verifier: &str) -> String {
    let hash = digest::digest(&digest::SHA256, verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash.as_ref())
}

// ---------------------------------------------------------------------------
// URLs
// ---------------------------------------------------------------------------

/// The authorize page for an API domain: `https://open.feishu.cn` maps to
/// `https://accounts.feishu.cn`, `https://open.larksuite.com` to
/// `https://accounts.larksuite.com`.
pub fn authorize_endpoint(api_domain: &str) -> String {
    match api_domain.strip_prefix("https://open.") {
        Some(host) => format!("https://accounts.{host}/open-apis/authen/v1/authorize"),
        None => DEFAULT_AUTHORIZE_URL.to_string(),
    }
}

/// Build the URL the user must visit to grant access.
pub fn authorization_url(config: &FeishuConfig, state: &str, code_challenge: &str) -> Result<String> {
    let mut url = Url::parse(&authorize_endpoint(&config.api_domain))?;
    url.query_pairs_mut()
        .append_pair("client_id", &config.app_id)
        .append_pair("redirect_uri", &config.oauth_redirect_uri)
        .append_pair("scope", &SCOPES.join(" "))
        .append_pair("response_type", "code")
        .append_pair("state", state)
        .append_pair("code_challenge", code_challenge)
        .append_pair("code_challenge_method", "S256");
    Ok(url.to_string())
}

// ---------------------------------------------------------------------------
// Grants
// ---------------------------------------------------------------------------

/// JSON body for the authorization code exchange.
pub fn code_grant_body(config: &FeishuConfig, code: &str, code_verifier: &str) -> Value {
    json!({
        "grant_type": "authorization_code",
        "client_id": config.app_id,
        "client_secret": config.app_secret,
        "code": code,
        "redirect_uri": config.oauth_redirect_uri,
        "code_verifier": code_verifier,
    })
}

/// JSON body for the refresh grant.
pub fn refresh_grant_body(config: &FeishuConfig, refresh_token: &str) -> Value {
    json!({
        "grant_type": "refresh_token",
        "client_id": config.app_id,
        "client_secret": config.app_secret,
        "refresh_token": refresh_token,
    })
}

/// Turn a token endpoint response into a [`UserToken`].
///
/// The v2 endpoint reports failures with a non-zero `code` plus OAuth-style
/// `error` / `error_description` fields; `invalid_grant` is surfaced as
/// [`AuthError::InvalidGrant`].
pub fn parse_grant_response(response: &Value, now: i64) -> Result<UserToken> {
    let code = response.get("code").and_then(Value::as_i64).unwrap_or(0);
    let error = response.get("error").and_then(Value::as_str);

    if code != 0 || error.is_some() {
        let description = response
            .get("error_description")
            .or_else(|| response.get("msg"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        if error == Some("invalid_grant") {
            return Err(AuthError::InvalidGrant {
                reason: description,
            });
        }
        return Err(AuthError::Api {
            code,
            msg: description,
        });
    }

    // Some gateway versions wrap the grant in `data`.
    let grant = response.get("data").filter(|d| d.is_object()).unwrap_or(response);
    let access_token = grant
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::FlowFailed {
            reason: "access_token not found in token response".to_string(),
        })?
        .to_string();

    let expires_in = grant
        .get("expires_in")
        .and_then(Value::as_i64)
        .unwrap_or(DEFAULT_EXPIRES_IN);
    let refresh_expires_in = grant
        .get("refresh_token_expires_in")
        .or_else(|| grant.get("refresh_expires_in"))
        .and_then(Value::as_i64)
        .unwrap_or(DEFAULT_REFRESH_EXPIRES_IN);
    let text = |key: &str| grant.get(key).and_then(Value::as_str).map(str::to_string);

    Ok(UserToken {
        user_access_token: Some(access_token.clone()),
        access_token,
        refresh_token: text("refresh_token"),
        expires_at: Some(now + expires_in),
        refresh_expires_at: Some(now + refresh_expires_in),
        scope: text("scope").unwrap_or_default(),
        token_type: text("token_type").unwrap_or_else(|| "Bearer".to_string()),
    })
}

/// POST a grant body to the token endpoint.
pub async fn request_grant(
    client: &reqwest::Client,
    config: &FeishuConfig,
    body: &Value,
) -> Result<UserToken> {
    let url = config.api_url(TOKEN_PATH);
    tracing::debug!(url = %url, grant_type = %body["grant_type"], "requesting user token");

    let response: Value = client
        .post(&url)
        .header("Content-Type", "application/json; charset=utf-8")
        .json(body)
        .send()
        .await?
        .json()
        .await?;

    parse_grant_response(&response, chrono::Utc::now().timestamp())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
