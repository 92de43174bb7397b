//! Configuration for feishu-docflow.
//!
//! Settings live in a dotenv-style file (`feishu-config.env`) holding
//! `KEY=value` pairs. Process environment variables with the same names
//! override file values, so CI can inject secrets without touching the file.
//!
//! ```text
//! FEISHU_APP_ID=cli_xxx
//! FEISHU_APP_SECRET="xxxx"
//! FEISHU_API_DOMAIN=https://open.feishu.cn
//! FEISHU_AUTO_COLLABORATOR_ID=ou_xxx
//! ```

pub mod error;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

pub use error::{ConfigError, Result};

/// Default Feishu Open Platform domain.
pub const DEFAULT_API_DOMAIN: &str = "https://open.feishu.cn";

/// Default domain used to build human-facing document URLs.
pub const DEFAULT_WEB_DOMAIN: &str = "https://feishu.cn";

/// Default OAuth redirect URI (a local callback server listens here).
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/callback";

/// Default pause between consecutive block insertions.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 50;

/// Default number of retries for a transient HTTP failure.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// File name of the cached user token, stored next to the config file.
pub const TOKEN_FILE_NAME: &str = "feishu-token.json";

/// Environment variable that may point at a config file.
pub const CONFIG_PATH_ENV: &str = "FEISHU_CONFIG";

/// Locations searched, in order, when no explicit path is given.
const SEARCH_PATHS: &[&str] = &[".claude/feishu-config.env", "feishu-config.env"];

/// Every key understood by [`FeishuConfig::from_map`].
pub const KNOWN_KEYS: &[&str] = &[
    "FEISHU_APP_ID",
    "FEISHU_APP_SECRET",
    "FEISHU_API_DOMAIN",
    "FEISHU_WEB_DOMAIN",
    "FEISHU_DEFAULT_FOLDER",
    "FEISHU_AUTO_COLLABORATOR_ID",
    "FEISHU_AUTO_COLLABORATOR_TYPE",
    "FEISHU_AUTO_COLLABORATOR_PERM",
    "FEISHU_OAUTH_REDIRECT_URI",
    "FEISHU_TOKEN_FILE",
    "FEISHU_REQUEST_DELAY_MS",
    "FEISHU_MAX_RETRIES",
    "FEISHU_BROWSER_PATH",
    "FEISHU_BROWSER_PROFILE",
];

// ---------------------------------------------------------------------------
// Typed configuration
// ---------------------------------------------------------------------------

/// The user that gets edit rights (and later ownership) on new documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollaboratorConfig {
    /// Member id, e.g. an `ou_...` open id.
    pub member_id: String,
    /// Member id type understood by the permission API (`openid`, `userid`, ...).
    pub member_type: String,
    /// Permission level granted (`view`, `edit`, `full_access`).
    pub perm: String,
}

/// Fully resolved feishu-docflow configuration.
#[derive(Debug, Clone)]
pub struct FeishuConfig {
    pub app_id: String,
    pub app_secret: String,
    /// API domain without trailing slash, e.g. `https://open.feishu.cn`.
    pub api_domain: String,
    /// Web domain used for document links.
    pub web_domain: String,
    /// Folder token new documents are created in.
    pub default_folder: Option<String>,
    pub collaborator: Option<CollaboratorConfig>,
    pub oauth_redirect_uri: String,
    /// Where the user access token is cached.
    pub token_file: PathBuf,
    /// Pause after each block insertion.
    pub request_delay: Duration,
    pub max_retries: u32,
    /// Chromium executable used by the verifier.
    pub browser_path: Option<String>,
    /// Persistent browser profile, so a logged-in session can be reused.
    pub browser_profile_dir: Option<PathBuf>,
}

impl FeishuConfig {
    /// Locate, read, and validate the configuration.
    ///
    /// File values are loaded first; process environment variables with a
    /// known key override them. When no file is found the environment alone
    /// must supply the required keys.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (mut map, source) = match locate(explicit) {
            Some(path) => (load_env_file(&path)?, Some(path)),
            None if explicit.is_some() => {
                return Err(ConfigError::NotFound {
                    searched: explicit.map(|p| p.display().to_string()).unwrap_or_default(),
                });
            }
            None => (BTreeMap::new(), None),
        };

        overlay_env(&mut map, std::env::vars());

        if source.is_none() && !map.contains_key("FEISHU_APP_ID") {
            return Err(ConfigError::NotFound {
                searched: searched_paths(),
            });
        }

        let mut config = Self::from_map(&map)?;
        if !map.contains_key("FEISHU_TOKEN_FILE")
            && let Some(dir) = source.as_deref().and_then(Path::parent)
        {
            config.token_file = dir.join(TOKEN_FILE_NAME);
        }

        debug!(
            source = ?source,
            api_domain = %config.api_domain,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Build a typed configuration from raw key/value pairs.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self> {
        let app_id = required(map, "FEISHU_APP_ID")?;
        let app_secret = required(map, "FEISHU_APP_SECRET")?;

        let api_domain = domain(map, "FEISHU_API_DOMAIN", DEFAULT_API_DOMAIN)?;
        let web_domain = domain(map, "FEISHU_WEB_DOMAIN", DEFAULT_WEB_DOMAIN)?;

        let collaborator = optional(map, "FEISHU_AUTO_COLLABORATOR_ID").map(|member_id| {
            CollaboratorConfig {
                member_id,
                member_type: optional(map, "FEISHU_AUTO_COLLABORATOR_TYPE")
                    .unwrap_or_else(|| "openid".to_string()),
                perm: optional(map, "FEISHU_AUTO_COLLABORATOR_PERM")
                    .unwrap_or_else(|| "full_access".to_string()),
            }
        });

        let delay_ms = parse_number(map, "FEISHU_REQUEST_DELAY_MS", DEFAULT_REQUEST_DELAY_MS)?;
        let max_retries = parse_number(map, "FEISHU_MAX_RETRIES", u64::from(DEFAULT_MAX_RETRIES))?;
        let max_retries = u32::try_from(max_retries).map_err(|_| ConfigError::Invalid {
            key: "FEISHU_MAX_RETRIES".to_string(),
            reason: "value too large".to_string(),
        })?;

        Ok(Self {
            app_id,
            app_secret,
            api_domain,
            web_domain,
            default_folder: optional(map, "FEISHU_DEFAULT_FOLDER"),
            collaborator,
            oauth_redirect_uri: optional(map, "FEISHU_OAUTH_REDIRECT_URI")
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            token_file: optional(map, "FEISHU_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".claude").join(TOKEN_FILE_NAME)),
            request_delay: Duration::from_millis(delay_ms),
            max_retries,
            browser_path: optional(map, "FEISHU_BROWSER_PATH"),
            browser_profile_dir: optional(map, "FEISHU_BROWSER_PROFILE").map(PathBuf::from),
        })
    }

    /// Full Open API URL for `path` (which starts with `/`).
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/open-apis{}", self.api_domain, path)
    }

    /// Browser URL of a docx document.
    pub fn document_url(&self, document_id: &str) -> String {
        format!("{}/docx/{}", self.web_domain, document_id)
    }

    /// Port of the local OAuth callback server, taken from the redirect URI.
    pub fn redirect_port(&self) -> Result<u16> {
        let invalid = |reason: &str| ConfigError::Invalid {
            key: "FEISHU_OAUTH_REDIRECT_URI".to_string(),
            reason: reason.to_string(),
        };

        let url = url::Url::parse(&self.oauth_redirect_uri)
            .map_err(|e| invalid(&format!("not a URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        url.port_or_known_default()
            .ok_or_else(|| invalid("no port and no default for the scheme"))
    }
}

// ---------------------------------------------------------------------------
// File loading
// ---------------------------------------------------------------------------

/// Find the config file to use.
///
/// Order: explicit path, `$FEISHU_CONFIG`, then [`SEARCH_PATHS`] relative to
/// the working directory.
pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    if let Ok(from_env) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(from_env);
        if path.exists() {
            return Some(path);
        }
    }

    SEARCH_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

/// Read every `KEY=value` pair from a dotenv file without touching the
/// process environment.
pub fn load_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let parse_err = |source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let mut map = BTreeMap::new();
    for item in dotenvy::from_path_iter(path).map_err(parse_err)? {
        let (key, value) = item.map_err(parse_err)?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Override `map` with any known keys found in `vars`.
pub fn overlay_env<I>(map: &mut BTreeMap<String, String>, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        if KNOWN_KEYS.contains(&key.as_str()) && !value.trim().is_empty() {
            map.insert(key, value);
        }
    }
}

fn searched_paths() -> String {
    let mut paths = vec![format!("${CONFIG_PATH_ENV}")];
    paths.extend(SEARCH_PATHS.iter().map(|p| (*p).to_string()));
    paths.join(", ")
}

fn optional(map: &BTreeMap<String, String>, key: &str) -> Option<String> {
    map.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(map: &BTreeMap<String, String>, key: &str) -> Result<String> {
    optional(map, key).ok_or_else(|| ConfigError::Missing {
        key: key.to_string(),
    })
}

fn domain(map: &BTreeMap<String, String>, key: &str, default: &str) -> Result<String> {
    let value = optional(map, key).unwrap_or_else(|| default.to_string());
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: format!("`{value}` must start with http:// or https://"),
        });
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn parse_number(map: &BTreeMap<String, String>, key: &str, default: u64) -> Result<u64> {
    match optional(map, key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            reason: format!("`{raw}` is not a non-negative integer"),
        }),
        None => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// Config check report
// ---------------------------------------------------------------------------

/// Outcome of checking one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckItem {
    pub key: &'static str,
    pub description: &'static str,
    /// Masked value, or `None` when unset.
    pub display_value: Option<String>,
}

impl CheckItem {
    pub fn is_set(&self) -> bool {
        self.display_value.is_some()
    }
}

/// Report produced by [`check`].
#[derive(Debug, Clone, Serialize)]
pub struct ConfigCheck {
    pub required: Vec<CheckItem>,
    pub recommended: Vec<CheckItem>,
}

impl ConfigCheck {
    /// `true` when every required key is present.
    pub fn required_ok(&self) -> bool {
        self.required.iter().all(CheckItem::is_set)
    }
}

const REQUIRED_KEYS: &[(&str, &str)] = &[
    ("FEISHU_APP_ID", "App ID from the Feishu Open Platform"),
    ("FEISHU_APP_SECRET", "App secret from the Feishu Open Platform"),
    ("FEISHU_API_DOMAIN", "Open API domain"),
];

const RECOMMENDED_KEYS: &[(&str, &str)] = &[
    (
        "FEISHU_AUTO_COLLABORATOR_ID",
        "Collaborator granted access to every new document",
    ),
    (
        "FEISHU_DEFAULT_FOLDER",
        "Folder token new documents are created in",
    ),
];

/// Inspect raw config values and report which keys are set.
///
/// Secrets, ids, and tokens are masked to their first 8 characters.
pub fn check(map: &BTreeMap<String, String>) -> ConfigCheck {
    let item = |&(key, description): &(&'static str, &'static str)| CheckItem {
        key,
        description,
        display_value: optional(map, key).map(|v| mask(key, &v)),
    };

    ConfigCheck {
        required: REQUIRED_KEYS.iter().map(item).collect(),
        recommended: RECOMMENDED_KEYS.iter().map(item).collect(),
    }
}

/// Mask sensitive values for display.
pub fn mask(key: &str, value: &str) -> String {
    let sensitive = key.contains("SECRET") || key.contains("ID") || key.contains("TOKEN");
    if !sensitive {
        return value.to_string();
    }
    if value.chars().count() > 8 {
        let prefix: String = value.chars().take(8).collect();
        format!("{prefix}...")
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_map() -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("FEISHU_APP_ID".to_string(), "cli_a1b2c3d4e5".to_string());
        map.insert("FEISHU_APP_SECRET".to_string(), "s3cr3t-value".to_string());
        map
    }

    #[test]
    fn from_map_applies_defaults() {
        let config = FeishuConfig::from_map(&base_map()).unwrap();
        assert_eq!(config.api_domain, DEFAULT_API_DOMAIN);
        assert_eq!(config.web_domain, DEFAULT_WEB_DOMAIN);
        assert_eq!(config.oauth_redirect_uri, DEFAULT_REDIRECT_URI);
        assert_eq!(config.request_delay, Duration::from_millis(50));
        assert_eq!(config.max_retries, 3);
        assert!(config.collaborator.is_none());
        assert!(config.default_folder.is_none());
    }

    #[test]
    fn from_map_requires_app_id() {
        let mut map = base_map();
        map.remove("FEISHU_APP_ID");
        let err = FeishuConfig::from_map(&map).unwrap_err();
        assert!(err.to_string().contains("FEISHU_APP_ID"));
    }

    #[test]
    fn from_map_treats_blank_as_missing() {
        let mut map = base_map();
        map.insert("FEISHU_APP_SECRET".to_string(), "   ".to_string());
        assert!(matches!(
            FeishuConfig::from_map(&map),
            Err(ConfigError::Missing { .. })
        ));
    }

    #[test]
    fn from_map_strips_trailing_slash() {
        let mut map = base_map();
        map.insert(
            "FEISHU_API_DOMAIN".to_string(),
            "https://open.larksuite.com/".to_string(),
        );
        let config = FeishuConfig::from_map(&map).unwrap();
        assert_eq!(config.api_domain, "https://open.larksuite.com");
        assert_eq!(
            config.api_url("/docx/v1/documents"),
            "https://open.larksuite.com/open-apis/docx/v1/documents"
        );
    }

    #[test]
    fn from_map_rejects_domain_without_scheme() {
        let mut map = base_map();
        map.insert("FEISHU_API_DOMAIN".to_string(), "open.feishu.cn".to_string());
        assert!(matches!(
            FeishuConfig::from_map(&map),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn from_map_builds_collaborator_with_defaults() {
        let mut map = base_map();
        map.insert(
            "FEISHU_AUTO_COLLABORATOR_ID".to_string(),
            "ou_123".to_string(),
        );
        let config = FeishuConfig::from_map(&map).unwrap();
        let collaborator = config.collaborator.unwrap();
        assert_eq!(collaborator.member_id, "ou_123");
        assert_eq!(collaborator.member_type, "openid");
        assert_eq!(collaborator.perm, "full_access");
    }

    #[test]
    fn from_map_rejects_bad_delay() {
        let mut map = base_map();
        map.insert("FEISHU_REQUEST_DELAY_MS".to_string(), "fast".to_string());
        let err = FeishuConfig::from_map(&map).unwrap_err();
        assert!(err.to_string().contains("FEISHU_REQUEST_DELAY_MS"));
    }

    #[test]
    fn document_url_uses_web_domain() {
        let config = FeishuConfig::from_map(&base_map()).unwrap();
        assert_eq!(
            config.document_url("doxcnABC"),
            "https://feishu.cn/docx/doxcnABC"
        );
    }

    #[test]
    fn redirect_port_parsing() {
        let mut config = FeishuConfig::from_map(&base_map()).unwrap();
        assert_eq!(config.redirect_port().unwrap(), 8080);

        config.oauth_redirect_uri = "http://127.0.0.1:9123".to_string();
        assert_eq!(config.redirect_port().unwrap(), 9123);

        config.oauth_redirect_uri = "http://localhost/callback".to_string();
        assert_eq!(config.redirect_port().unwrap(), 80);

        config.oauth_redirect_uri = "http://[::1]/cb".to_string();
        assert_eq!(config.redirect_port().unwrap(), 80);

        config.oauth_redirect_uri = "https://[::1]:9443/cb".to_string();
        assert_eq!(config.redirect_port().unwrap(), 9443);

        config.oauth_redirect_uri = "localhost:8080".to_string();
        assert!(config.redirect_port().is_err());
    }

    #[test]
    fn overlay_env_only_takes_known_keys() {
        let mut map = base_map();
        overlay_env(
            &mut map,
            vec![
                ("FEISHU_APP_ID".to_string(), "cli_from_env".to_string()),
                ("PATH".to_string(), "/usr/bin".to_string()),
                ("FEISHU_DEFAULT_FOLDER".to_string(), String::new()),
            ],
        );
        assert_eq!(map["FEISHU_APP_ID"], "cli_from_env");
        assert!(!map.contains_key("PATH"));
        assert!(!map.contains_key("FEISHU_DEFAULT_FOLDER"));
    }

    #[test]
    fn mask_hides_secrets() {
        assert_eq!(mask("FEISHU_APP_SECRET", "abcdefghijkl"), "abcdefgh...");
        assert_eq!(mask("FEISHU_APP_ID", "short"), "***");
        assert_eq!(
            mask("FEISHU_API_DOMAIN", "https://open.feishu.cn"),
            "https://open.feishu.cn"
        );
    }

    #[test]
    fn check_reports_missing_required() {
        let mut map = base_map();
        map.remove("FEISHU_APP_SECRET");
        let report = check(&map);
        assert!(!report.required_ok());
        let secret = report
            .required
            .iter()
            .find(|i| i.key == "FEISHU_APP_SECRET")
            .unwrap();
        assert!(!secret.is_set());
        assert!(report.recommended.iter().all(|i| !i.is_set()));
    }
}
