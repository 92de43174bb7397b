//! Document verification.
//!
//! Loads the document in headless Chromium, reads the page title and final
//! URL, and saves a screenshot. Every failure is recorded in
//! [`VerifyResult::errors`]; [`Verifier::verify`] itself never fails.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::browser::{Browser, BrowserOptions, Page};
use crate::error::Result;

/// Result file name inside the output directory.
pub const RESULT_FILE: &str = "verify_result.json";

/// Screenshot file name inside the output directory.
pub const SCREENSHOT_FILE: &str = "screenshot.png";

/// Default pause between navigation and reading the page.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(5);

/// The verify hand-off file (`verify_result.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResult {
    /// A non-empty title was read.
    pub success: bool,
    pub document_id: String,
    pub document_url: String,
    pub page_loaded: bool,
    pub page_title: String,
    #[serde(default)]
    pub final_url: String,
    /// Screenshot path, empty when none was taken.
    pub screenshot: String,
    #[serde(default)]
    pub errors: Vec<String>,
    pub verified_at: String,
}

impl VerifyResult {
    /// A result for a document that could not be checked at all.
    pub fn failed(document_id: &str, document_url: &str, error: impl Into<String>) -> Self {
        Self {
            document_id: document_id.to_string(),
            document_url: document_url.to_string(),
            errors: vec![error.into()],
            verified_at: chrono::Local::now().to_rfc3339(),
            ..Self::default()
        }
    }

    /// Write the result as pretty JSON into `out_dir`.
    pub fn write_to(&self, out_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(out_dir)?;
        let path = out_dir.join(RESULT_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

/// Remove zero-width and bidi control characters, then trim.
pub fn clean_title(raw: &str) -> String {
    raw.chars()
        .filter(|c| {
            !matches!(
                *c,
                '\u{200B}'..='\u{200D}'
                    | '\u{202A}'..='\u{202E}'
                    | '\u{2060}'..='\u{2064}'
                    | '\u{FEFF}'
                    | '\u{00AD}'
            )
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// What the page reported.
struct PageReport {
    title: String,
    final_url: String,
}

/// Headless-browser document checker.
pub struct Verifier {
    options: BrowserOptions,
    settle: Duration,
}

impl Verifier {
    pub fn new(options: BrowserOptions) -> Self {
        Self {
            options,
            settle: DEFAULT_SETTLE,
        }
    }

    /// Override the pause after navigation.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Load `document_url` and report what the browser saw.
    pub async fn verify(
        &self,
        document_id: &str,
        document_url: &str,
        out_dir: &Path,
    ) -> VerifyResult {
        let mut result = VerifyResult {
            document_id: document_id.to_string(),
            document_url: document_url.to_string(),
            ..VerifyResult::default()
        };

        if let Err(e) = std::fs::create_dir_all(out_dir) {
            result.errors.push(format!("cannot create {}: {e}", out_dir.display()));
        }

        match Browser::launch(&self.options).await {
            Ok(browser) => {
                self.inspect(&browser, document_url, out_dir, &mut result)
                    .await;
                browser.shutdown().await;
            }
            Err(e) => {
                warn!(error = %e, "browser unavailable");
                result.errors.push(format!("browser launch failed: {e}"));
            }
        }

        result.success = result.page_loaded && !result.page_title.is_empty();
        result.verified_at = chrono::Local::now().to_rfc3339();

        if result.success {
            info!(doc_id = %document_id, title = %result.page_title, "document verified");
        } else {
            warn!(doc_id = %document_id, errors = result.errors.len(), "document not verified");
        }
        result
    }

    async fn inspect(
        &self,
        browser: &Browser,
        document_url: &str,
        out_dir: &Path,
        result: &mut VerifyResult,
    ) {
        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                result.errors.push(format!("opening page failed: {e}"));
                return;
            }
        };

        match self.load(&page, document_url).await {
            Ok(report) => {
                result.page_loaded = true;
                result.page_title = report.title;
                result.final_url = report.final_url;
            }
            Err(e) => result.errors.push(format!("page load failed: {e}")),
        }

        let screenshot = out_dir.join(SCREENSHOT_FILE);
        match page.screenshot(&screenshot).await {
            Ok(()) => result.screenshot = screenshot.display().to_string(),
            Err(e) => result.errors.push(format!("screenshot failed: {e}")),
        }

        browser.close_page(&page).await;
    }

    async fn load(&self, page: &Page, url: &str) -> Result<PageReport> {
        page.navigate(url).await?;
        tokio::time::sleep(self.settle).await;

        let title = clean_title(&page.evaluate("document.title").await?);
        let final_url = page.evaluate("location.href").await?;
        Ok(PageReport { title, final_url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_title_strips_invisible_characters() {
        let raw = "\u{200B}\u{FEFF}Weekly\u{00AD} notes\u{202E}\u{2063} - Feishu Docs \u{200D}";
        assert_eq!(clean_title(raw), "Weekly notes - Feishu Docs");
    }

    #[test]
    fn clean_title_keeps_cjk_and_emoji() {
        assert_eq!(clean_title("  项目周报 🚀 "), "项目周报 🚀");
        assert_eq!(clean_title("\u{200C}\u{2060}"), "");
    }

    #[test]
    fn failed_result_carries_the_error() {
        let result = VerifyResult::failed("", "", "doc_info.json has no document id");
        assert!(!result.success);
        assert!(!result.page_loaded);
        assert_eq!(result.errors, ["doc_info.json has no document id"]);
        assert!(!result.verified_at.is_empty());
    }

    #[test]
    fn result_is_written_as_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let result = VerifyResult {
            success: true,
            document_id: "doxcn1".into(),
            page_title: "Notes".into(),
            ..VerifyResult::default()
        };
        let path = result.write_to(&dir.path().join("step4")).unwrap();
        assert!(path.ends_with("step4/verify_result.json"));

        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("\n  \"page_title\": \"Notes\""));
        let back: VerifyResult = serde_json::from_str(&text).unwrap();
        assert_eq!(back, result);
    }
}
