//! The `run` subcommand: the whole workflow, one process per step.

use std::ffi::OsString;
use std::path::Path;

use anyhow::{Context, Result};
use feishu_workflow::{Orchestrator, RunOptions, RunSummary};

use crate::helpers::ok_or_fail;

pub async fn cmd_run(config_path: Option<&Path>, verbose: u8, options: RunOptions) -> Result<()> {
    println!("{}", "=".repeat(70));
    println!("feishu-doc run");
    println!("{}", "=".repeat(70));
    println!("Input:        {}", options.markdown.display());
    println!("Title:        {}", options.resolved_title());
    println!("Workflow dir: {}", options.workflow_dir.display());
    println!("Log dir:      {}", options.log_dir.display());

    let orchestrator = Orchestrator::current_exe()
        .context("cannot locate the feishu-doc executable")?
        .with_leading_args(leading_args(config_path, verbose));

    let summary = orchestrator
        .run(&options)
        .await
        .context("workflow aborted")?;
    print_summary(&summary);
    Ok(())
}

/// Global flags repeated for every step process.
fn leading_args(config_path: Option<&Path>, verbose: u8) -> Vec<OsString> {
    let mut args = Vec::new();
    if let Some(path) = config_path {
        args.push(OsString::from("--config"));
        args.push(path.as_os_str().to_owned());
    }
    args.extend((0..verbose).map(|_| OsString::from("-v")));
    args
}

fn print_summary(summary: &RunSummary) {
    let permission = &summary.permission;

    println!("\n{}", "=".repeat(70));
    println!("Document created");
    println!("{}", "=".repeat(70));
    println!("Title:    {}", summary.title);
    println!("URL:      {}", summary.document_url);
    println!("Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();
    println!("Permissions:");
    println!(
        "  {} collaborator added",
        ok_or_fail(permission.collaborator_added)
    );
    println!(
        "  {} ownership transferred",
        ok_or_fail(permission.owner_transferred)
    );
    println!(
        "  {} full control",
        ok_or_fail(permission.user_has_full_control)
    );
    if !summary.warnings.is_empty() {
        println!();
        for warning in &summary.warnings {
            println!("[WARN] {warning}");
        }
    }
    println!();
    println!("Log files:");
    for path in &summary.log_files {
        println!("  - {}", path.display());
    }
    println!("Workflow files:");
    for path in summary.layout.files() {
        println!("  - {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_args_forward_config_and_verbosity() {
        let args = leading_args(Some(Path::new("conf/feishu.env")), 2);
        assert_eq!(args, ["--config", "conf/feishu.env", "-v", "-v"]);
        assert!(leading_args(None, 0).is_empty());
    }
}
