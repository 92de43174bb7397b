#![cfg(unix)]

use std::path::Path;

use feishu_docx::AddResult;
use feishu_verifier::VerifyResult;
use feishu_workflow::{Orchestrator, RunOptions, WorkflowError, WorkflowLayout, logger, write_json};

/// Shell stand-in for the binary that writes each step's hand-off file.
/// `add-blocks` always fails; `create` fails when `fail_create` is set.
fn fake_binary(dir: &Path, fail_create: bool) -> std::path::PathBuf {
    let script = format!(
        r#"
cmd="$1"; shift
echo "$cmd $*" >> "{calls}"
case "$cmd" in
  parse)
    mkdir -p "$2"
    echo '{{"blocks":[],"metadata":{{}}}}' > "$2/blocks.json"
    ;;
  create)
    [ "{fail_create}" = "true" ] && exit 1
    mkdir -p "$2"
    cat > "$2/doc_with_permission.json" <<'EOF'
{{
  "title": "notes",
  "created_at": "2026-01-05T10:00:00+08:00",
  "document_id": "doxcnFAKE",
  "document_url": "https://feishu.cn/docx/doxcnFAKE",
  "permission": {{
    "collaborator_added": true,
    "owner_transferred": false,
    "user_has_full_control": false,
    "collaborator_id": "ou_1"
  }},
  "errors": []
}}
EOF
    ;;
  add-blocks)
    exit 3
    ;;
  verify|log)
    ;;
esac
"#,
        calls = dir.join("calls.txt").display(),
    );
    let path = dir.join("fake-feishu-doc.sh");
    std::fs::write(&path, script).unwrap();
    path
}

fn options(dir: &Path, skip_verify: bool) -> RunOptions {
    let markdown = dir.join("notes.md");
    std::fs::write(&markdown, "# Notes\n\nhello\n").unwrap();
    RunOptions {
        markdown,
        title: None,
        workflow_dir: dir.join("wf"),
        log_dir: dir.join("logs"),
        skip_verify,
    }
}

fn calls(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("calls.txt"))
        .unwrap()
        .lines()
        .map(|line| line.split(' ').next().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn optional_failures_do_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_binary(dir.path(), false);
    let options = options(dir.path(), false);

    let summary = Orchestrator::new("/bin/sh")
        .with_leading_args([script])
        .run(&options)
        .await
        .unwrap();

    assert_eq!(summary.title, "notes");
    assert_eq!(summary.document_id, "doxcnFAKE");
    assert!(summary.permission.collaborator_added);
    assert_eq!(summary.warnings.len(), 1);
    assert!(summary.warnings[0].starts_with("add-blocks"));
    assert_eq!(
        calls(dir.path()),
        ["parse", "create", "add-blocks", "verify", "log"]
    );
}

#[tokio::test]
async fn skip_verify_leaves_out_the_verify_step() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_binary(dir.path(), false);
    let options = options(dir.path(), true);

    Orchestrator::new("/bin/sh")
        .with_leading_args([script])
        .run(&options)
        .await
        .unwrap();

    assert_eq!(calls(dir.path()), ["parse", "create", "add-blocks", "log"]);
}

#[tokio::test]
async fn create_failure_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_binary(dir.path(), true);
    let options = options(dir.path(), false);

    let err = Orchestrator::new("/bin/sh")
        .with_leading_args([script])
        .run(&options)
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::StepFailed { step: "create", .. }));
    assert_eq!(calls(dir.path()), ["parse", "create"]);
}

#[tokio::test]
async fn results_of_an_earlier_run_are_not_reused() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_binary(dir.path(), false);
    let options = options(dir.path(), true);

    let layout = WorkflowLayout::new(&options.workflow_dir);
    write_json(
        &layout.verify_result_file(),
        &VerifyResult {
            success: true,
            document_id: "doxcnOLD".into(),
            ..VerifyResult::default()
        },
    )
    .unwrap();
    write_json(
        &layout.add_result_file(),
        &AddResult {
            success: true,
            document_id: "doxcnOLD".into(),
            tables_created: 3,
            ..AddResult::default()
        },
    )
    .unwrap();

    let summary = Orchestrator::new("/bin/sh")
        .with_leading_args([script])
        .run(&options)
        .await
        .unwrap();

    assert_eq!(summary.document_id, "doxcnFAKE");
    assert!(!layout.verify_result_file().exists());
    assert!(!layout.add_result_file().exists());

    let entry = logger::collect(&options.workflow_dir, None).unwrap();
    assert_eq!(entry.document_id, "doxcnFAKE");
    assert!(!entry.document_verified);
    assert_eq!(entry.tables_created, 0);
}
