//! Minimal Chrome DevTools Protocol client.
//!
//! 1. Find or launch Chromium with `--remote-debugging-port` and wait for
//!    `GET /json/version` to answer.
//! 2. Open a page target with `PUT /json/new?<url>`.
//! 3. Each command opens a WebSocket to the page, sends one message, and
//!    reads until the reply with the same `id` arrives. Events in between
//!    are skipped.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use feishu_config::FeishuConfig;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::process::{Child, Command};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::{Result, VerifyError};

/// Timeout for CDP WebSocket operations in seconds.
pub const CDP_TIMEOUT_SECS: u64 = 30;

/// Timeout for requests to the DevTools HTTP endpoint in seconds.
const HTTP_TIMEOUT_SECS: u64 = 10;

/// How long to wait for a freshly launched browser to answer.
const STARTUP_TIMEOUT_SECS: u64 = 15;

/// Largest CDP reply accepted (full-page screenshots are big).
const MAX_CDP_RESPONSE_BYTES: usize = 32 * 1024 * 1024;

/// How to find and start the browser.
#[derive(Debug, Clone, Default)]
pub struct BrowserOptions {
    /// Chromium executable; searched on the usual paths when unset.
    pub executable: Option<String>,
    /// Profile directory, reused across runs to keep a Feishu login.
    pub profile_dir: Option<PathBuf>,
    /// Debug port; a free one is picked when unset.
    pub port: Option<u16>,
}

impl BrowserOptions {
    pub fn from_config(config: &FeishuConfig) -> Self {
        Self {
            executable: config.browser_path.clone(),
            profile_dir: config.browser_profile_dir.clone(),
            port: None,
        }
    }
}

/// A running (or already reachable) browser.
pub struct Browser {
    port: u16,
    client: reqwest::Client,
    /// Present only when this process launched the browser.
    child: Option<Child>,
}

impl Browser {
    /// Connect to a browser on `options.port`, launching one if nothing answers.
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        let port = match options.port {
            Some(port) => port,
            None => free_port()?,
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(concat!("feishu-docflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        let mut browser = Self {
            port,
            client,
            child: None,
        };

        if browser.is_reachable().await {
            info!(port, "reusing browser already listening on debug port");
            return Ok(browser);
        }

        let executable = find_executable(options.executable.as_deref())?;
        let profile_dir = options
            .profile_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(format!("feishu-verifier-{port}")));

        info!(executable = %executable, port, profile = %profile_dir.display(), "launching headless browser");

        let child = Command::new(&executable)
            .args(launch_args(port, &profile_dir))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| VerifyError::Launch {
                path: executable.clone(),
                source,
            })?;
        browser.child = Some(child);

        browser.wait_until_reachable().await?;
        Ok(browser)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    async fn is_reachable(&self) -> bool {
        let url = format!("{}/json/version", self.base_url());
        matches!(self.client.get(&url).send().await, Ok(r) if r.status().is_success())
    }

    async fn wait_until_reachable(&mut self) -> Result<()> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(STARTUP_TIMEOUT_SECS);
        loop {
            if self.is_reachable().await {
                debug!(port = self.port, "devtools endpoint is reachable");
                return Ok(());
            }
            if let Some(child) = self.child.as_mut()
                && let Ok(Some(status)) = child.try_wait()
            {
                return Err(VerifyError::Cdp(format!(
                    "browser exited during startup ({status})"
                )));
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(VerifyError::Timeout {
                    seconds: STARTUP_TIMEOUT_SECS,
                    reason: "browser did not start".into(),
                });
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    /// Open a new page target on `url`.
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        let endpoint = format!("{}/json/new?{url}", self.base_url());
        let response = self.client.put(&endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(VerifyError::Cdp(format!(
                "opening a page target failed with HTTP {status}"
            )));
        }

        let target: Value = response.json().await?;
        let field = |name: &str| {
            target
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| VerifyError::Cdp(format!("page target has no `{name}`")))
        };

        Ok(Page {
            id: field("id")?,
            ws_url: field("webSocketDebuggerUrl")?,
            next_message_id: AtomicU64::new(1),
        })
    }

    /// Close a page target. Failures are only logged.
    pub async fn close_page(&self, page: &Page) {
        let endpoint = format!("{}/json/close/{}", self.base_url(), page.id);
        if let Err(e) = self.client.get(&endpoint).send().await {
            debug!(error = %e, "closing page target failed");
        }
    }

    /// Stop the browser if this process started it.
    pub async fn shutdown(mut self) {
        if let Some(mut child) = self.child.take()
            && let Err(e) = child.kill().await
        {
            warn!(error = %e, "failed to stop browser");
        }
    }
}

/// One page target.
pub struct Page {
    id: String,
    ws_url: String,
    next_message_id: AtomicU64,
}

impl Page {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Send one CDP command and return its `result`.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        cdp_call(&self.ws_url, id, method, params).await
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        let result = self.call("Page.navigate", json!({ "url": url })).await?;
        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            return Err(VerifyError::Cdp(format!("navigation failed: {error}")));
        }
        debug!(url = %url, "navigation started");
        Ok(())
    }

    /// Evaluate a JavaScript expression and return its value as a string.
    pub async fn evaluate(&self, expression: &str) -> Result<String> {
        let result = self
            .call(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true }),
            )
            .await?;
        extract_runtime_value(&result)
    }

    /// Capture a PNG screenshot of the viewport into `path`.
    pub async fn screenshot(&self, path: &Path) -> Result<()> {
        let result = self
            .call("Page.captureScreenshot", json!({ "format": "png" }))
            .await?;
        let data = result
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| VerifyError::Cdp("screenshot reply has no `data`".into()))?;
        let bytes = STANDARD.decode(data)?;
        tokio::fs::write(path, &bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "screenshot saved");
        Ok(())
    }
}

/// Command-line flags for a headless debugging session.
pub fn launch_args(port: u16, profile_dir: &Path) -> Vec<String> {
    vec![
        "--headless=new".to_string(),
        format!("--remote-debugging-port={port}"),
        format!("--user-data-dir={}", profile_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-gpu".to_string(),
        "--window-size=1280,900".to_string(),
        "about:blank".to_string(),
    ]
}

/// Send `{id, method, params}` over a fresh WebSocket and wait for the reply
/// carrying the same `id`.
pub async fn cdp_call(ws_url: &str, id: u64, method: &str, params: Value) -> Result<Value> {
    let timeout = Duration::from_secs(CDP_TIMEOUT_SECS);
    debug!(method, id, "sending CDP command");

    let (ws, _response) = tokio::time::timeout(timeout, connect_async(ws_url))
        .await
        .map_err(|_| VerifyError::Timeout {
            seconds: CDP_TIMEOUT_SECS,
            reason: format!("connecting to `{ws_url}`"),
        })??;
    let (mut sink, mut stream) = ws.split();

    let message = json!({ "id": id, "method": method, "params": params });
    sink.send(Message::Text(serde_json::to_string(&message)?.into()))
        .await?;

    let reply = tokio::time::timeout(timeout, async {
        while let Some(frame) = stream.next().await {
            match frame.map_err(VerifyError::from)? {
                Message::Text(text) => {
                    if text.len() > MAX_CDP_RESPONSE_BYTES {
                        return Err(VerifyError::Cdp(format!(
                            "reply too large: {} bytes",
                            text.len()
                        )));
                    }
                    let value: Value = serde_json::from_str(&text).map_err(VerifyError::from)?;
                    if value.get("id").and_then(Value::as_u64) != Some(id) {
                        continue;
                    }
                    if let Some(error) = value.get("error") {
                        let msg = error
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown CDP error");
                        return Err(VerifyError::Cdp(format!("{method}: {msg}")));
                    }
                    return Ok(value.get("result").cloned().unwrap_or_else(|| json!({})));
                }
                Message::Close(_) => {
                    return Err(VerifyError::Cdp(format!(
                        "connection closed before the `{method}` reply"
                    )));
                }
                _ => {}
            }
        }
        Err(VerifyError::Cdp(format!(
            "stream ended before the `{method}` reply"
        )))
    })
    .await
    .map_err(|_| VerifyError::Timeout {
        seconds: CDP_TIMEOUT_SECS,
        reason: format!("waiting for `{method}`"),
    })?;

    let _ = sink.send(Message::Close(None)).await;
    reply
}

/// Pull the value out of a `Runtime.evaluate` result.
pub fn extract_runtime_value(result: &Value) -> Result<String> {
    if let Some(exception) = result.get("exceptionDetails") {
        let text = exception
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or("unknown exception");
        return Err(VerifyError::Cdp(format!("JavaScript exception: {text}")));
    }

    let object = result
        .get("result")
        .ok_or_else(|| VerifyError::Cdp("evaluate reply has no `result`".into()))?;
    Ok(match object.get("value") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}

/// Resolve the browser executable.
pub fn find_executable(explicit: Option<&str>) -> Result<String> {
    if let Some(path) = explicit {
        return Ok(path.to_string());
    }

    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ]
    } else {
        &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ]
    };

    candidates
        .iter()
        .find(|candidate| Path::new(candidate).exists() || on_path(candidate))
        .map(|candidate| (*candidate).to_string())
        .ok_or(VerifyError::BrowserNotFound)
}

fn on_path(name: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(name).is_file()))
        .unwrap_or(false)
}

/// Ask the OS for an unused loopback port.
pub fn free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}
