//! Sequential block adder.
//!
//! Blocks are appended one at a time at the end of the document, so the
//! document order always equals the parse order. Tables, callouts, and
//! images need several calls each; everything else is a single children
//! call. A failing block is recorded and skipped, never fatal.

use std::path::Path;
use std::time::{Duration, Instant};

use feishu_md_parser::block::BLOCK_TYPE_TEXT;
use feishu_md_parser::inline::parse_inline;
use feishu_md_parser::{Block, TextRun};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::api::DocumentApi;
use crate::error::{DocxError, Result};
use crate::table::build_table;

/// One block that could not be added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFailure {
    /// Position in the block list (0-based).
    pub index: usize,
    pub kind: String,
    pub error: String,
}

/// The add-blocks hand-off file (`add_result.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddResult {
    /// `true` when no block failed.
    pub success: bool,
    pub document_id: String,
    pub total_blocks: usize,
    pub tables_created: usize,
    pub callouts_created: usize,
    pub images_uploaded: usize,
    pub regular_blocks: usize,
    #[serde(default)]
    pub failures: Vec<BlockFailure>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub mode: String,
    pub duration_seconds: f64,
    pub completed_at: String,
}

impl AddResult {
    /// Blocks that made it into the document.
    pub fn blocks_created(&self) -> usize {
        self.tables_created + self.callouts_created + self.regular_blocks
    }
}

/// What a successful dispatch produced.
#[derive(Debug, PartialEq, Eq)]
enum Added {
    Table,
    Callout,
    Image { uploaded: bool },
    Regular,
}

/// Walks a block list and writes it into a document.
pub struct BlockAdder<A> {
    api: A,
    request_delay: Duration,
}

impl<A: DocumentApi> BlockAdder<A> {
    pub fn new(api: A, request_delay: Duration) -> Self {
        Self { api, request_delay }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Append every block to the end of `document_id`, in order.
    pub async fn add_all(&self, document_id: &str, blocks: &[Block]) -> AddResult {
        let started = Instant::now();
        let total = blocks.len();
        let mut result = AddResult {
            document_id: document_id.to_string(),
            total_blocks: total,
            mode: "sequential".to_string(),
            ..AddResult::default()
        };

        info!(doc_id = %document_id, total, "adding blocks sequentially");

        for (index, block) in blocks.iter().enumerate() {
            match self.add_one(document_id, block, &mut result.warnings).await {
                Ok(added) => {
                    debug!(index, kind = block.kind_name(), "block added");
                    match added {
                        Added::Table => result.tables_created += 1,
                        Added::Callout => result.callouts_created += 1,
                        Added::Image { uploaded } => {
                            result.regular_blocks += 1;
                            if uploaded {
                                result.images_uploaded += 1;
                            }
                        }
                        Added::Regular => result.regular_blocks += 1,
                    }
                }
                Err(e) => {
                    warn!(index, kind = block.kind_name(), error = %e, "block failed");
                    result.failures.push(BlockFailure {
                        index,
                        kind: block.kind_name().to_string(),
                        error: e.to_string(),
                    });
                }
            }

            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        result.success = result.failures.is_empty();
        result.duration_seconds = (started.elapsed().as_secs_f64() * 100.0).round() / 100.0;
        result.completed_at = chrono::Local::now().to_rfc3339();

        info!(
            doc_id = %document_id,
            tables = result.tables_created,
            callouts = result.callouts_created,
            images = result.images_uploaded,
            regular = result.regular_blocks,
            failures = result.failures.len(),
            "blocks added"
        );
        result
    }

    async fn add_one(
        &self,
        document_id: &str,
        block: &Block,
        warnings: &mut Vec<String>,
    ) -> Result<Added> {
        match block {
            Block::Table { rows } => {
                let tree = build_table(rows);
                self.api
                    .add_descendants(
                        document_id,
                        document_id,
                        std::slice::from_ref(&tree.table_id),
                        &tree.descendants,
                    )
                    .await?;
                Ok(Added::Table)
            }
            Block::Callout { content, .. } => {
                let callout_id = self.append(document_id, document_id, block.payload()).await?;
                let lines = callout_lines(content);
                if !lines.is_empty() {
                    self.api.add_children(document_id, &callout_id, &lines).await?;
                }
                Ok(Added::Callout)
            }
            Block::Image { url, local_path, .. } => {
                let image_id = self.append(document_id, document_id, block.payload()).await?;
                let Some((file_name, bytes)) = self.image_source(url, local_path.as_deref()).await?
                else {
                    let note = format!("image `{url}` has no local file or http(s) URL; left empty");
                    warn!(url = %url, "image block left empty");
                    warnings.push(note);
                    return Ok(Added::Image { uploaded: false });
                };

                let file_token = self.api.upload_image(&image_id, &file_name, bytes).await?;
                self.api
                    .replace_image(document_id, &image_id, &file_token)
                    .await?;
                Ok(Added::Image { uploaded: true })
            }
            _ => {
                self.append(document_id, document_id, block.payload()).await?;
                Ok(Added::Regular)
            }
        }
    }

    /// Append a single child and return its block id.
    async fn append(&self, document_id: &str, parent_id: &str, payload: Value) -> Result<String> {
        let ids = self
            .api
            .add_children(document_id, parent_id, std::slice::from_ref(&payload))
            .await?;
        ids.into_iter().next().ok_or(DocxError::InvalidResponse {
            op: "add_children",
            reason: "no block id returned".to_string(),
        })
    }

    /// Image bytes from the local file, else from an http(s) URL.
    async fn image_source(
        &self,
        url: &str,
        local_path: Option<&Path>,
    ) -> Result<Option<(String, Vec<u8>)>> {
        if let Some(path) = local_path {
            let bytes = tokio::fs::read(path).await?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image.png".to_string());
            return Ok(Some((name, bytes)));
        }

        if url.starts_with("http://") || url.starts_with("https://") {
            let bytes = self.api.fetch_bytes(url).await?;
            if bytes.is_empty() {
                return Err(DocxError::ImageSource(format!("`{url}` returned no data")));
            }
            return Ok(Some((remote_file_name(url), bytes)));
        }

        Ok(None)
    }
}

/// Text children for a callout body: one text block per non-empty line.
fn callout_lines(content: &str) -> Vec<Value> {
    content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let runs = parse_inline(line);
            let elements: Vec<Value> = if runs.is_empty() {
                vec![TextRun::plain(line).to_element()]
            } else {
                runs.iter().map(TextRun::to_element).collect()
            };
            json!({
                "block_type": BLOCK_TYPE_TEXT,
                "text": { "elements": elements, "style": {} },
            })
        })
        .collect()
}

/// Last path segment of a URL, without the query string.
fn remote_file_name(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "image.png".to_string())
}
