//! Hand-off files between workflow steps.
//!
//! Each step reads the previous step's JSON file and writes its own into a
//! fixed sub-directory of the workflow directory.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};

pub const PARSE_DIR: &str = "step1_parse";
pub const CREATE_DIR: &str = "step2_create_with_permission";
pub const ADD_DIR: &str = "step3_add_blocks";
pub const VERIFY_DIR: &str = "step4_verify";

pub const BLOCKS_FILE: &str = "blocks.json";
pub const DOC_INFO_FILE: &str = "doc_with_permission.json";
pub const ADD_RESULT_FILE: &str = "add_result.json";
pub const VERIFY_RESULT_FILE: &str = feishu_verifier::verifier::RESULT_FILE;

/// Paths of every step directory and hand-off file under one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowLayout {
    root: PathBuf,
}

impl WorkflowLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn parse_dir(&self) -> PathBuf {
        self.root.join(PARSE_DIR)
    }

    pub fn create_dir(&self) -> PathBuf {
        self.root.join(CREATE_DIR)
    }

    pub fn add_dir(&self) -> PathBuf {
        self.root.join(ADD_DIR)
    }

    pub fn verify_dir(&self) -> PathBuf {
        self.root.join(VERIFY_DIR)
    }

    pub fn blocks_file(&self) -> PathBuf {
        self.parse_dir().join(BLOCKS_FILE)
    }

    pub fn doc_info_file(&self) -> PathBuf {
        self.create_dir().join(DOC_INFO_FILE)
    }

    pub fn add_result_file(&self) -> PathBuf {
        self.add_dir().join(ADD_RESULT_FILE)
    }

    pub fn verify_result_file(&self) -> PathBuf {
        self.verify_dir().join(VERIFY_RESULT_FILE)
    }

    /// The four hand-off files, in step order.
    pub fn files(&self) -> [PathBuf; 4] {
        [
            self.blocks_file(),
            self.doc_info_file(),
            self.add_result_file(),
            self.verify_result_file(),
        ]
    }

    /// Create every step directory.
    pub fn create_all(&self) -> Result<()> {
        for dir in [
            self.parse_dir(),
            self.create_dir(),
            self.add_dir(),
            self.verify_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|source| WorkflowError::File {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Remove hand-off files left by an earlier run in the same root.
    pub fn clear_outputs(&self) -> Result<()> {
        for file in self.files() {
            match std::fs::remove_file(&file) {
                Ok(()) => tracing::debug!(path = %file.display(), "removed stale hand-off file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(WorkflowError::File { path: file, source }),
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Create step output
// ---------------------------------------------------------------------------

/// Permission outcome of the create step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionStatus {
    pub collaborator_added: bool,
    pub owner_transferred: bool,
    /// Same as `owner_transferred`: only the owner can delete the document.
    pub user_has_full_control: bool,
    pub collaborator_id: Option<String>,
}

/// The create step hand-off file (`doc_with_permission.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocInfo {
    pub title: String,
    pub created_at: String,
    /// Empty when creation failed.
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub document_url: String,
    #[serde(default)]
    pub permission: PermissionStatus,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl DocInfo {
    pub fn is_created(&self) -> bool {
        !self.document_id.is_empty()
    }
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

/// Read and deserialize a hand-off file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|source| WorkflowError::File {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| WorkflowError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`read_json`], but a missing file yields `T::default()`.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    read_json(path)
}

/// Serialize `value` as pretty JSON to `path`, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| WorkflowError::File {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|source| WorkflowError::File {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = WorkflowLayout::new("wf");
        assert_eq!(
            layout.blocks_file(),
            Path::new("wf/step1_parse/blocks.json")
        );
        assert_eq!(
            layout.doc_info_file(),
            Path::new("wf/step2_create_with_permission/doc_with_permission.json")
        );
        assert_eq!(
            layout.add_result_file(),
            Path::new("wf/step3_add_blocks/add_result.json")
        );
        assert_eq!(
            layout.verify_result_file(),
            Path::new("wf/step4_verify/verify_result.json")
        );
    }

    #[test]
    fn doc_info_tolerates_failed_create_file() {
        let json = r#"{
            "title": "Notes",
            "created_at": "2026-01-05T10:00:00+08:00",
            "permission": { "collaborator_id": null },
            "errors": ["create failed"]
        }"#;
        let info: DocInfo = serde_json::from_str(json).unwrap();
        assert!(!info.is_created());
        assert!(!info.permission.collaborator_added);
        assert_eq!(info.errors.len(), 1);
    }

    #[test]
    fn write_then_read_keeps_unicode_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/doc.json");
        let info = DocInfo {
            title: "项目周报".into(),
            document_id: "doxcn1".into(),
            ..DocInfo::default()
        };
        write_json(&path, &info).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("项目周报"));
        assert_eq!(read_json::<DocInfo>(&path).unwrap(), info);
    }

    #[test]
    fn missing_file_reads_as_default_but_garbage_does_not() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert_eq!(
            read_json_or_default::<DocInfo>(&missing).unwrap(),
            DocInfo::default()
        );

        let garbage = dir.path().join("bad.json");
        std::fs::write(&garbage, "{not json").unwrap();
        assert!(matches!(
            read_json_or_default::<DocInfo>(&garbage),
            Err(WorkflowError::Malformed { .. })
        ));
    }
}
