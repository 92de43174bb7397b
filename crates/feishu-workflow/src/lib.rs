//! Markdown-to-Feishu workflow.
//!
//! - [`artifacts`]: hand-off file layout and types shared by the steps.
//! - [`creator`]: document creation plus collaborator and owner handover.
//! - [`logger`]: the run log (`created_docs.json`, `CREATED_DOCS.md`).
//! - [`orchestrator`]: runs every step as a child process.

pub mod artifacts;
pub mod creator;
pub mod error;
pub mod logger;
pub mod orchestrator;

pub use artifacts::{DocInfo, PermissionStatus, WorkflowLayout, read_json, write_json};
pub use creator::create_with_permission;
pub use error::{Result, WorkflowError};
pub use logger::{LogEntry, LogFiles};
pub use orchestrator::{Orchestrator, RunOptions, RunSummary};
