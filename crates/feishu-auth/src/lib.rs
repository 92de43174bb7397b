//! Feishu access tokens for feishu-docflow.
//!
//! - **Tenant tokens** from the app credentials, cached in memory.
//! - **User tokens** from a JSON token file, refreshed when the access token
//!   expires and the refresh token is still valid.
//! - **Authorization** through the browser: OAuth 2.0 authorization code
//!   with PKCE and a local callback server.
//!
//! ```text
//! TokenProvider
//! ├── tenant_token()  POST /auth/v3/tenant_access_token/internal
//! ├── user_token()    TokenStore ──(expired)──▶ refresh grant
//! └── authorize()     CallbackServer + authorize URL + code grant
//! ```

pub mod callback;
pub mod error;
pub mod oauth;
pub mod provider;
pub mod token;

pub use callback::CallbackServer;
pub use error::{AuthError, Result};
pub use provider::{TokenProvider, open_browser};
pub use token::{TenantToken, TokenStore, UserToken};
