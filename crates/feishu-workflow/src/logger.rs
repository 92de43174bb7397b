//! Run log.
//!
//! Every finished run appends one [`LogEntry`] to two files in the log
//! directory: `created_docs.json` (a JSON array, oldest first) and
//! `CREATED_DOCS.md` (Markdown sections, newest first).

use std::path::{Path, PathBuf};

use feishu_docx::AddResult;
use feishu_verifier::VerifyResult;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifacts::{DocInfo, WorkflowLayout, read_json_or_default, write_json};
use crate::error::{Result, WorkflowError};

pub const JSON_LOG_FILE: &str = "created_docs.json";
pub const MARKDOWN_LOG_FILE: &str = "CREATED_DOCS.md";

const MARKDOWN_TITLE: &str = "# Feishu Document Log";
const DOCUMENTS_HEADING: &str = "## Documents";
const UNTITLED: &str = "Untitled document";

/// One created document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub title: String,
    pub time: String,
    pub document_id: String,
    pub url: String,
    pub source_file: String,
    pub collaborator_added: bool,
    pub owner_transferred: bool,
    pub user_has_full_control: bool,
    pub document_verified: bool,
    pub tables_created: usize,
    pub blocks_created: usize,
}

impl LogEntry {
    /// Markdown section for this entry, starting with a blank line.
    pub fn to_markdown(&self) -> String {
        format!(
            "\n### {title}\n\n\
             - **Time**: {time}\n\
             - **Document ID**: `{id}`\n\
             - **URL**: [{url}]({url})\n\
             - **Source**: {source}\n\
             - **collaborator_added**: {collaborator}\n\
             - **owner_transferred**: {owner}\n\
             - **user_has_full_control**: {control}\n\
             - **document_verified**: {verified}\n\
             - **tables_created**: {tables}\n\
             - **blocks_created**: {blocks}\n",
            title = self.title,
            time = self.time,
            id = self.document_id,
            url = self.url,
            source = if self.source_file.is_empty() {
                "-"
            } else {
                self.source_file.as_str()
            },
            collaborator = self.collaborator_added,
            owner = self.owner_transferred,
            control = self.user_has_full_control,
            verified = self.document_verified,
            tables = self.tables_created,
            blocks = self.blocks_created,
        )
    }
}

/// Where [`append`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFiles {
    pub json: PathBuf,
    pub markdown: PathBuf,
}

/// Summarize a workflow directory.
///
/// Missing step files count as empty, and so do results recorded for a
/// different document than the create step's.
pub fn collect(workflow_dir: &Path, source_file: Option<&str>) -> Result<LogEntry> {
    let layout = WorkflowLayout::new(workflow_dir);
    let doc: DocInfo = read_json_or_default(&layout.doc_info_file())?;
    let mut added: AddResult = read_json_or_default(&layout.add_result_file())?;
    let mut verified: VerifyResult = read_json_or_default(&layout.verify_result_file())?;

    if added.document_id != doc.document_id {
        if !added.document_id.is_empty() {
            warn!(found = %added.document_id, expected = %doc.document_id, "ignoring add result of another document");
        }
        added = AddResult::default();
    }
    if verified.document_id != doc.document_id {
        if !verified.document_id.is_empty() {
            warn!(found = %verified.document_id, expected = %doc.document_id, "ignoring verify result of another document");
        }
        verified = VerifyResult::default();
    }

    if !doc.is_created() {
        warn!(dir = %workflow_dir.display(), "no created document in workflow directory");
    }

    Ok(LogEntry {
        title: if doc.title.is_empty() {
            UNTITLED.to_string()
        } else {
            doc.title
        },
        time: if doc.created_at.is_empty() {
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
        } else {
            doc.created_at
        },
        document_id: doc.document_id,
        url: doc.document_url,
        source_file: source_file.unwrap_or_default().to_string(),
        collaborator_added: doc.permission.collaborator_added,
        owner_transferred: doc.permission.owner_transferred,
        user_has_full_control: doc.permission.user_has_full_control,
        document_verified: verified.success,
        tables_created: added.tables_created,
        blocks_created: added.blocks_created(),
    })
}

/// Append `entry` to both log files in `log_dir`.
pub fn append(entry: &LogEntry, log_dir: &Path) -> Result<LogFiles> {
    std::fs::create_dir_all(log_dir).map_err(|source| WorkflowError::File {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let json = log_dir.join(JSON_LOG_FILE);
    let mut entries: Vec<LogEntry> = read_json_or_default(&json)?;
    entries.push(entry.clone());
    write_json(&json, &entries)?;

    let markdown = log_dir.join(MARKDOWN_LOG_FILE);
    let existing = match std::fs::read_to_string(&markdown) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(source) => {
            return Err(WorkflowError::File {
                path: markdown,
                source,
            });
        }
    };
    let updated = insert_section(existing.as_deref(), &entry.to_markdown());
    std::fs::write(&markdown, updated).map_err(|source| WorkflowError::File {
        path: markdown.clone(),
        source,
    })?;

    info!(title = %entry.title, entries = entries.len(), "log updated");
    Ok(LogFiles { json, markdown })
}

/// Put `section` right below the documents heading.
///
/// Without a heading, a fresh header is written and any previous text is
/// kept below the new section.
fn insert_section(existing: Option<&str>, section: &str) -> String {
    match existing {
        Some(text) => match text.find(DOCUMENTS_HEADING) {
            Some(at) => {
                let split = at + DOCUMENTS_HEADING.len();
                format!("{}{section}{}", &text[..split], &text[split..])
            }
            None if text.trim().is_empty() => fresh_log(section),
            None => format!("{}\n{}", fresh_log(section), text),
        },
        None => fresh_log(section),
    }
}

fn fresh_log(section: &str) -> String {
    format!("{MARKDOWN_TITLE}\n\n{DOCUMENTS_HEADING}\n{section}")
}
