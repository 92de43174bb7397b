//! Step orchestration.
//!
//! Runs the workflow as separate processes of the same binary, one per
//! step, connected only through the hand-off files of [`WorkflowLayout`].
//! Parse and create are required; the later steps may fail without
//! stopping the run.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::artifacts::{DocInfo, PermissionStatus, WorkflowLayout, read_json};
use crate::error::{Result, WorkflowError};
use crate::logger::{JSON_LOG_FILE, MARKDOWN_LOG_FILE};

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub markdown: PathBuf,
    /// Document title; the Markdown file stem when unset.
    pub title: Option<String>,
    pub workflow_dir: PathBuf,
    pub log_dir: PathBuf,
    pub skip_verify: bool,
}

impl RunOptions {
    pub fn resolved_title(&self) -> String {
        self.title.clone().unwrap_or_else(|| default_title(&self.markdown))
    }
}

/// Title derived from a Markdown path.
pub fn default_title(markdown: &Path) -> String {
    markdown
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled document".to_string())
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub title: String,
    pub document_id: String,
    pub document_url: String,
    pub permission: PermissionStatus,
    pub duration: Duration,
    pub layout: WorkflowLayout,
    pub log_files: [PathBuf; 2],
    /// Optional steps that failed.
    pub warnings: Vec<String>,
}

/// Spawns each step as a child process of `program`.
pub struct Orchestrator {
    program: PathBuf,
    /// Arguments placed before the step subcommand (e.g. `--config`).
    leading_args: Vec<OsString>,
}

impl Orchestrator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Orchestrate the currently running executable.
    pub fn current_exe() -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run parse, create, add-blocks, verify, and log in order.
    pub async fn run(&self, options: &RunOptions) -> Result<RunSummary> {
        if !options.markdown.is_file() {
            return Err(WorkflowError::InputMissing {
                path: options.markdown.clone(),
            });
        }

        let started = Instant::now();
        let title = options.resolved_title();
        let layout = WorkflowLayout::new(&options.workflow_dir);
        layout.create_all()?;
        layout.clear_outputs()?;
        let mut warnings = Vec::new();

        info!(
            markdown = %options.markdown.display(),
            title = %title,
            workflow_dir = %layout.root().display(),
            "starting workflow"
        );

        // Step 1: parse (required).
        let blocks_file = layout.blocks_file();
        self.required(
            "parse",
            &[
                "parse".into(),
                options.markdown.clone().into(),
                layout.parse_dir().into(),
            ],
            &blocks_file,
        )
        .await?;

        // Step 2: create with permission (required).
        let doc_info_file = layout.doc_info_file();
        self.required(
            "create",
            &["create".into(), title.clone().into(), layout.create_dir().into()],
            &doc_info_file,
        )
        .await?;
        let doc: DocInfo = read_json(&doc_info_file)?;
        if !doc.is_created() {
            return Err(WorkflowError::StepFailed {
                step: "create",
                reason: "no document id in the create result".to_string(),
            });
        }
        println!(
            "[INFO] collaborator_added={} owner_transferred={} user_has_full_control={}",
            doc.permission.collaborator_added,
            doc.permission.owner_transferred,
            doc.permission.user_has_full_control
        );

        // Step 3: add blocks.
        self.optional(
            "add-blocks",
            &[
                "add-blocks".into(),
                blocks_file.clone().into(),
                doc_info_file.clone().into(),
                layout.add_dir().into(),
            ],
            &mut warnings,
        )
        .await?;

        // Step 4: verify.
        if options.skip_verify {
            println!("[SKIP] verify");
        } else {
            self.optional(
                "verify",
                &[
                    "verify".into(),
                    doc_info_file.clone().into(),
                    layout.verify_dir().into(),
                ],
                &mut warnings,
            )
            .await?;
        }

        // Step 5: log.
        self.optional(
            "log",
            &[
                "log".into(),
                layout.root().as_os_str().to_owned(),
                options.log_dir.clone().into(),
                "--source".into(),
                options.markdown.clone().into(),
            ],
            &mut warnings,
        )
        .await?;

        Ok(RunSummary {
            title,
            document_id: doc.document_id,
            document_url: doc.document_url,
            permission: doc.permission,
            duration: started.elapsed(),
            log_files: [
                options.log_dir.join(MARKDOWN_LOG_FILE),
                options.log_dir.join(JSON_LOG_FILE),
            ],
            layout,
            warnings,
        })
    }

    /// Run a step that must succeed and leave `output` behind.
    async fn required(&self, step: &'static str, args: &[OsString], output: &Path) -> Result<()> {
        if let Err(reason) = self.run_step(step, args).await? {
            return Err(WorkflowError::StepFailed { step, reason });
        }
        if !output.is_file() {
            return Err(WorkflowError::MissingOutput {
                step,
                path: output.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Run a step whose failure is only a warning.
    async fn optional(
        &self,
        step: &'static str,
        args: &[OsString],
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        if let Err(reason) = self.run_step(step, args).await? {
            warn!(step, reason = %reason, "optional step failed; continuing");
            println!("[WARN] {step} failed ({reason}); continuing");
            warnings.push(format!("{step}: {reason}"));
        }
        Ok(())
    }

    /// Spawn one step with inherited stdio.
    ///
    /// The outer `Result` is a failure to start; the inner one is the step's
    /// own exit status.
    async fn run_step(
        &self,
        step: &'static str,
        args: &[OsString],
    ) -> Result<std::result::Result<(), String>> {
        println!("\n{}\n[STEP] {step}\n{}", "=".repeat(70), "=".repeat(70));
        debug!(program = %self.program.display(), ?args, "spawning step");

        let status = tokio::process::Command::new(&self.program)
            .args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| WorkflowError::Spawn { step, source })?;

        if status.success() {
            println!("[OK] {step}");
            Ok(Ok(()))
        } else {
            println!("[FAIL] {step}: {status}");
            Ok(Err(status.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_defaults_to_file_stem() {
        let options = RunOptions {
            markdown: PathBuf::from("docs/release-notes.md"),
            title: None,
            workflow_dir: PathBuf::from("wf"),
            log_dir: PathBuf::from("logs"),
            skip_verify: false,
        };
        assert_eq!(options.resolved_title(), "release-notes");

        let titled = RunOptions {
            title: Some("Release 2.0".into()),
            ..options
        };
        assert_eq!(titled.resolved_title(), "Release 2.0");
    }

    #[tokio::test]
    async fn missing_markdown_is_rejected_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions {
            markdown: dir.path().join("absent.md"),
            title: None,
            workflow_dir: dir.path().join("wf"),
            log_dir: dir.path().join("logs"),
            skip_verify: true,
        };
        let err = Orchestrator::new("/nonexistent/feishu-doc")
            .run(&options)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InputMissing { .. }));
        assert!(!dir.path().join("wf").exists());
    }
}
