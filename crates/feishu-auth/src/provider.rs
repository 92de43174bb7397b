//! Token provider: the single place the rest of the workspace asks for
//! bearer tokens.
//!
//! Tenant tokens are fetched with the app credentials and cached in memory
//! until shortly before they expire. User tokens come from the token file,
//! refreshed transparently when only the access token has expired.

use feishu_config::FeishuConfig;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::callback::CallbackServer;
use crate::error::{AuthError, Result};
use crate::oauth::{
    authorization_url, code_grant_body, generate_pkce_verifier, pkce_challenge,
    refresh_grant_body, request_grant,
};
use crate::token::{TenantToken, TokenStore, UserToken};

/// How long the callback server waits for the user to approve access.
pub const CALLBACK_TIMEOUT_SECS: u64 = 300;

/// Path of the internal tenant token endpoint, below `/open-apis`.
const TENANT_TOKEN_PATH: &str = "/auth/v3/tenant_access_token/internal";

/// Hands out tenant and user access tokens for one configuration.
pub struct TokenProvider {
    config: FeishuConfig,
    client: reqwest::Client,
    store: TokenStore,
    tenant: Mutex<Option<TenantToken>>,
}

impl TokenProvider {
    pub fn new(config: FeishuConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("feishu-docflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        let store = TokenStore::new(config.token_file.clone());

        Self {
            config,
            client,
            store,
            tenant: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &FeishuConfig {
        &self.config
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Tenant token
    // -----------------------------------------------------------------------

    /// A tenant access token, reusing the cached one while it is valid.
    pub async fn tenant_token(&self) -> Result<String> {
        let mut cached = self.tenant.lock().await;
        let now = chrono::Utc::now().timestamp();
        if let Some(token) = cached.as_ref().filter(|t| t.is_valid_at(now)) {
            return Ok(token.token.clone());
        }

        let fresh = self.fetch_tenant_token().await?;
        let value = fresh.token.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn fetch_tenant_token(&self) -> Result<TenantToken> {
        let url = self.config.api_url(TENANT_TOKEN_PATH);
        debug!(url = %url, "requesting tenant access token");

        let response: Value = self
            .client
            .post(&url)
            .header("Content-Type", "application/json; charset=utf-8")
            .json(&tenant_token_body(&self.config))
            .send()
            .await?
            .json()
            .await?;

        parse_tenant_response(&response, chrono::Utc::now().timestamp())
    }

    // -----------------------------------------------------------------------
    // User token
    // -----------------------------------------------------------------------

    /// A valid user access token, refreshing it when needed.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenMissing`] without a token file,
    /// [`AuthError::TokenExpired`] when neither token is usable.
    pub async fn user_token(&self) -> Result<String> {
        let token = self.store.load()?.ok_or_else(|| AuthError::TokenMissing {
            path: self.store.path().display().to_string(),
        })?;

        let now = chrono::Utc::now().timestamp();
        if token.is_access_valid_at(now)
            && let Some(bearer) = token.bearer()
        {
            return Ok(bearer.to_string());
        }

        if !token.can_refresh_at(now) {
            return Err(AuthError::TokenExpired);
        }

        info!("user access token expired, refreshing");
        let refreshed = self.refresh(&token).await?;
        refreshed
            .bearer()
            .map(str::to_string)
            .ok_or(AuthError::TokenExpired)
    }

    /// Exchange the refresh token for a new token pair and persist it.
    pub async fn refresh(&self, token: &UserToken) -> Result<UserToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or(AuthError::TokenExpired)?;
        let body = refresh_grant_body(&self.config, refresh_token);
        let mut refreshed = request_grant(&self.client, &self.config, &body).await?;

        // Feishu may omit the scope on refresh.
        if refreshed.scope.is_empty() {
            refreshed.scope = token.scope.clone();
        }
        self.store.save(&refreshed)?;
        Ok(refreshed)
    }

    // -----------------------------------------------------------------------
    // Interactive authorization
    // -----------------------------------------------------------------------

    /// Run the browser authorization flow and save the resulting token.
    ///
    /// 1. Generate a PKCE verifier and a random state.
    /// 2. Start the callback server on the redirect URI's port.
    /// 3. Open (or print) the authorize URL.
    /// 4. Wait for the redirect and check the state.
    /// 5. Exchange the code and write the token file.
    pub async fn authorize(&self, launch_browser: bool) -> Result<UserToken> {
        let code_verifier = generate_pkce_verifier()?;
        let challenge = pkce_challenge(&code_verifier);
        let state = uuid::Uuid::new_v4().simple().to_string();

        let auth_url = authorization_url(&self.config, &state, &challenge)?;
        let port = self.config.redirect_port()?;

        let server = tokio::spawn(CallbackServer::start(port, CALLBACK_TIMEOUT_SECS));

        println!("Open this URL to authorize feishu-docflow:\n\n  {auth_url}\n");
        if launch_browser
            && let Err(e) = open_browser(&auth_url)
        {
            warn!(error = %e, "could not open a browser, use the URL above");
        }
        info!(
            redirect_uri = %self.config.oauth_redirect_uri,
            timeout_secs = CALLBACK_TIMEOUT_SECS,
            "waiting for authorization"
        );

        let (code, returned_state) = server.await.map_err(|e| AuthError::FlowFailed {
            reason: format!("callback server task failed: {e}"),
        })??;

        if returned_state != state {
            return Err(AuthError::FlowFailed {
                reason: "state mismatch in OAuth callback".to_string(),
            });
        }
        debug!("state verified, exchanging authorization code");

        let body = code_grant_body(&self.config, &code, &code_verifier);
        let token = request_grant(&self.client, &self.config, &body).await?;
        self.store.save(&token)?;

        info!(
            path = %self.store.path().display(),
            scope = %token.scope,
            "user token saved"
        );
        Ok(token)
    }
}

/// JSON body for the tenant token request.
pub fn tenant_token_body(config: &FeishuConfig) -> Value {
    json!({
        "app_id": config.app_id,
        "app_secret": config.app_secret,
    })
}

/// Parse `{code, msg, tenant_access_token, expire}`.
pub fn parse_tenant_response(response: &Value, now: i64) -> Result<TenantToken> {
    let code = response.get("code").and_then(Value::as_i64).unwrap_or(-1);
    if code != 0 {
        let msg = response
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(AuthError::Api {
            code,
            msg: msg.to_string(),
        });
    }

    let token = response
        .get("tenant_access_token")
        .and_then(Value::as_str)
        .ok_or_else(|| AuthError::FlowFailed {
            reason: "tenant_access_token not found in response".to_string(),
        })?;
    let expire = response.get("expire").and_then(Value::as_i64).unwrap_or(7200);

    Ok(TenantToken {
        token: token.to_string(),
        expires_at: now + expire,
    })
}

/// Open `url` in the desktop browser.
pub fn open_browser(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    let mut command = std::process::Command::new("open");
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = std::process::Command::new("xdg-open");

    command.arg(url).spawn()?;
    Ok(())
}
