//! Single-step subcommands: parse, create, add-blocks, verify, log.
//!
//! Each one reads its inputs from files, writes one output file, and ends
//! with an `[OUTPUT] <path>` line.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use feishu_auth::TokenProvider;
use feishu_docx::{BlockAdder, DocxClient};
use feishu_md_parser::{ParsedDocument, parse_file};
use feishu_verifier::{BrowserOptions, Verifier, VerifyResult};
use feishu_workflow::artifacts::{ADD_RESULT_FILE, BLOCKS_FILE, DOC_INFO_FILE};
use feishu_workflow::{DocInfo, create_with_permission, logger, read_json, write_json};
use tracing::{info, warn};

use crate::helpers::{load_config, ok_or_fail, print_output};

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

pub fn cmd_parse(markdown: &Path, out_dir: &Path, keep_title: bool) -> Result<()> {
    let document = parse_file(markdown, keep_title)
        .with_context(|| format!("failed to parse {}", markdown.display()))?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let output = out_dir.join(BLOCKS_FILE);
    std::fs::write(&output, document.to_json_pretty()?)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let meta = &document.metadata;
    println!("[OK] parsed {} blocks", meta.total_blocks);
    println!(
        "     headings={} tables={} lists={} code={} callouts={} todos={} images={}",
        meta.heading_count,
        meta.table_count,
        meta.list_count,
        meta.code_count,
        meta.callout_count,
        meta.todo_count,
        meta.image_count
    );
    print_output(&output);
    Ok(())
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

pub async fn cmd_create(config_path: Option<&Path>, title: &str, out_dir: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let client = DocxClient::new(TokenProvider::new(config.clone()));

    println!("[INFO] creating document \"{title}\"");
    let info = create_with_permission(&client, &config, title).await;

    let output = out_dir.join(DOC_INFO_FILE);
    write_json(&output, &info)?;

    if !info.is_created() {
        for error in &info.errors {
            println!("[FAIL] {error}");
        }
        print_output(&output);
        bail!("document creation failed");
    }

    let permission = &info.permission;
    println!("[OK] document {}", info.document_id);
    println!("     {}", info.document_url);
    println!(
        "{} collaborator added",
        ok_or_fail(permission.collaborator_added)
    );
    println!(
        "{} ownership transferred",
        ok_or_fail(permission.owner_transferred)
    );
    for error in &info.errors {
        println!("[WARN] {error}");
    }
    print_output(&output);
    Ok(())
}

// ---------------------------------------------------------------------------
// add-blocks
// ---------------------------------------------------------------------------

pub async fn cmd_add_blocks(
    config_path: Option<&Path>,
    blocks: &Path,
    doc_info: &Path,
    out_dir: &Path,
) -> Result<()> {
    let text = std::fs::read_to_string(blocks)
        .with_context(|| format!("failed to read {}", blocks.display()))?;
    let document = ParsedDocument::from_json(&text)
        .with_context(|| format!("malformed {}", blocks.display()))?;
    let doc: DocInfo = read_json(doc_info)?;
    if !doc.is_created() {
        bail!("{} has no document id", doc_info.display());
    }

    let config = load_config(config_path)?;
    let request_delay = config.request_delay;
    let adder = BlockAdder::new(DocxClient::new(TokenProvider::new(config)), request_delay);

    println!(
        "[INFO] adding {} blocks to {}",
        document.blocks.len(),
        doc.document_id
    );
    let result = adder.add_all(&doc.document_id, &document.blocks).await;

    let output = out_dir.join(ADD_RESULT_FILE);
    write_json(&output, &result)?;

    println!(
        "{} {} of {} blocks added in {:.2}s",
        ok_or_fail(result.success),
        result.blocks_created(),
        result.total_blocks,
        result.duration_seconds
    );
    println!(
        "     tables={} callouts={} images={} regular={}",
        result.tables_created, result.callouts_created, result.images_uploaded, result.regular_blocks
    );
    for failure in &result.failures {
        println!(
            "[WARN] block {} ({}): {}",
            failure.index, failure.kind, failure.error
        );
    }
    for warning in &result.warnings {
        println!("[WARN] {warning}");
    }
    print_output(&output);
    Ok(())
}

// ---------------------------------------------------------------------------
// verify
// ---------------------------------------------------------------------------

pub async fn cmd_verify(
    config_path: Option<&Path>,
    doc_info: &Path,
    out_dir: &Path,
    wait_secs: u64,
) -> Result<()> {
    let doc = match read_json::<DocInfo>(doc_info) {
        Ok(doc) if doc.is_created() => doc,
        Ok(doc) => {
            let error = format!("{} has no document id", doc_info.display());
            let result = VerifyResult::failed("", &doc.document_url, error);
            return report_verify(&result, out_dir);
        }
        Err(e) => {
            let result = VerifyResult::failed("", "", e.to_string());
            return report_verify(&result, out_dir);
        }
    };

    // Browser settings are optional; credentials are not needed here.
    let options = match load_config(config_path) {
        Ok(config) => BrowserOptions::from_config(&config),
        Err(e) => {
            warn!(error = %e, "no usable configuration, using default browser settings");
            BrowserOptions::default()
        }
    };

    println!("[INFO] verifying {}", doc.document_url);
    let result = Verifier::new(options)
        .with_settle(Duration::from_secs(wait_secs))
        .verify(&doc.document_id, &doc.document_url, out_dir)
        .await;
    report_verify(&result, out_dir)
}

fn report_verify(result: &VerifyResult, out_dir: &Path) -> Result<()> {
    let output = result.write_to(out_dir)?;

    if result.success {
        println!("[OK] page loaded, title: {}", result.page_title);
    } else {
        println!("[WARN] document could not be verified");
    }
    for error in &result.errors {
        println!("[WARN] {error}");
    }
    print_output(&output);
    Ok(())
}

// ---------------------------------------------------------------------------
// log
// ---------------------------------------------------------------------------

pub fn cmd_log(workflow_dir: &Path, log_dir: &Path, source: Option<&str>) -> Result<()> {
    let entry = logger::collect(workflow_dir, source)?;
    let files = logger::append(&entry, log_dir)?;
    info!(title = %entry.title, "run logged");

    println!("[OK] logged \"{}\"", entry.title);
    println!("     {}", entry.url);
    println!(
        "     collaborator={} owner={} verified={} tables={} blocks={}",
        entry.collaborator_added,
        entry.owner_transferred,
        entry.document_verified,
        entry.tables_created,
        entry.blocks_created
    );
    println!("     {}", files.json.display());
    print_output(&files.markdown);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_writes_blocks_file() {
        let dir = tempfile::tempdir().unwrap();
        let markdown = dir.path().join("notes.md");
        std::fs::write(&markdown, "# Notes\n\n## Intro\n\nHello **world**\n").unwrap();

        let out_dir = dir.path().join("step1");
        cmd_parse(&markdown, &out_dir, false).unwrap();

        let text = std::fs::read_to_string(out_dir.join("blocks.json")).unwrap();
        let document = ParsedDocument::from_json(&text).unwrap();
        assert_eq!(document.metadata.total_blocks, 2);
        assert_eq!(document.metadata.heading_count, 1);
    }

    #[tokio::test]
    async fn verify_without_document_still_writes_result() {
        let dir = tempfile::tempdir().unwrap();
        let doc_info = dir.path().join("doc_with_permission.json");
        std::fs::write(&doc_info, r#"{"title":"notes","created_at":"","errors":["create failed"]}"#)
            .unwrap();
        let out_dir = dir.path().join("step4");

        cmd_verify(None, &doc_info, &out_dir, 0).await.unwrap();

        let text = std::fs::read_to_string(out_dir.join("verify_result.json")).unwrap();
        let result: VerifyResult = serde_json::from_str(&text).unwrap();
        assert!(!result.success);
        assert!(result.errors[0].contains("has no document id"));
    }

    #[tokio::test]
    async fn verify_with_missing_doc_info_still_writes_result() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("step4");

        cmd_verify(None, &dir.path().join("absent.json"), &out_dir, 0)
            .await
            .unwrap();
        assert!(out_dir.join("verify_result.json").is_file());
    }

    #[test]
    fn log_works_on_a_partial_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = dir.path().join("wf");
        std::fs::create_dir_all(&workflow).unwrap();

        cmd_log(&workflow, &dir.path().join("logs"), Some("notes.md")).unwrap();
        assert!(dir.path().join("logs/created_docs.json").is_file());
        assert!(dir.path().join("logs/CREATED_DOCS.md").is_file());
    }
}
