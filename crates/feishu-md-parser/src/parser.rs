//! Line-oriented Markdown state machine.
//!
//! Each right-trimmed line is tested against a fixed list of rules in order.
//! Callouts and code fences switch the machine into a collecting mode until
//! their closing marker; tables consume every consecutive line containing a
//! pipe.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block::{Block, CalloutStyle, TextRun};
use crate::error::{ParseError, Result};
use crate::inline::{clean_cell, parse_inline};
use crate::language::code_language_id;

/// Options controlling a parse.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Emit the first H1 as a heading instead of treating it as the title.
    pub include_first_title: bool,
    /// Directory relative image paths are resolved against.
    pub base_dir: Option<PathBuf>,
}

/// Per-kind counts of the emitted blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub heading_count: usize,
    pub table_count: usize,
    pub list_count: usize,
    pub code_count: usize,
    pub callout_count: usize,
    pub todo_count: usize,
    pub image_count: usize,
    pub total_blocks: usize,
}

impl Metadata {
    fn record(&mut self, block: &Block) {
        match block {
            Block::Heading { .. } => self.heading_count += 1,
            Block::Table { .. } => self.table_count += 1,
            Block::Bullet { .. } | Block::Ordered { .. } => self.list_count += 1,
            Block::Code { .. } => self.code_count += 1,
            Block::Callout { .. } => self.callout_count += 1,
            Block::Todo { .. } => self.todo_count += 1,
            Block::Image { .. } => self.image_count += 1,
            Block::Text { .. } | Block::Quote { .. } | Block::Divider => {}
        }
        self.total_blocks += 1;
    }
}

/// The parse result, written to disk as `blocks.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub blocks: Vec<Block>,
    pub metadata: Metadata,
}

impl ParsedDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Compiled line patterns plus parse options.
pub struct MarkdownParser {
    options: ParseOptions,
    heading: Regex,
    todo: Regex,
    ordered: Regex,
    image: Regex,
    separator: Regex,
}

impl MarkdownParser {
    pub fn new(options: ParseOptions) -> Result<Self> {
        Ok(Self {
            options,
            heading: Regex::new(r"^(#{1,9})\s")?,
            todo: Regex::new(r"^-\s+\[([ xX])\]\s*(.*)$")?,
            ordered: Regex::new(r"^\d+\.\s")?,
            image: Regex::new(r"^!\[([^\]]*)\]\(([^)]+)\)$")?,
            separator: Regex::new(r"^\|?\s*:?-+:?\s*\|")?,
        })
    }

    /// Parse Markdown text into blocks.
    pub fn parse(&self, text: &str) -> ParsedDocument {
        let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
        let mut state = State::new(!self.options.include_first_title);
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            i += 1;

            // Rule 1: callouts own every line until their closing marker.
            if let Some(name) = line.strip_prefix(":::") {
                match state.callout.take() {
                    Some(open) => state.push(open.finish()),
                    None => state.callout = Some(CalloutBuilder::new(name)),
                }
                continue;
            }
            if let Some(open) = state.callout.as_mut() {
                open.lines.push(line.to_string());
                continue;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(caps) = self.heading.captures(line) {
                let level = caps[1].len();
                if level == 1 && state.title_pending {
                    state.title_pending = false;
                    debug!(title = %line.trim_start_matches('#').trim(), "first H1 used as title");
                    continue;
                }
                state.push(Block::Heading {
                    level: level as u8,
                    runs: parse_inline(line.trim_start_matches('#').trim()),
                });
                continue;
            }

            if trimmed == "---" {
                state.push(Block::Divider);
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('>') {
                state.push(Block::Quote {
                    runs: parse_inline(rest.trim()),
                });
                continue;
            }

            if let Some(caps) = self.todo.captures(trimmed) {
                state.push(Block::Todo {
                    done: caps[1].eq_ignore_ascii_case("x"),
                    runs: parse_inline(caps[2].trim()),
                });
                continue;
            }

            if trimmed.starts_with("- **") {
                let content = trimmed[2..].replace("**", "");
                state.push(Block::Bullet {
                    runs: vec![TextRun::new(content.trim(), true)],
                });
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("- ") {
                state.push(Block::Bullet {
                    runs: parse_inline(rest),
                });
                continue;
            }

            if let Some(found) = self.ordered.find(trimmed) {
                state.push(Block::Ordered {
                    runs: parse_inline(&trimmed[found.end()..]),
                });
                continue;
            }

            if let Some(caps) = self.image.captures(trimmed) {
                let url = caps[2].trim().to_string();
                state.push(Block::Image {
                    alt: caps[1].to_string(),
                    local_path: self.resolve_local_image(&url),
                    url,
                });
                continue;
            }

            if line.contains('|') {
                let start = i - 1;
                while i < lines.len() && lines[i].contains('|') {
                    i += 1;
                }
                if let Some(table) = self.table(&lines[start..i]) {
                    state.push(table);
                } else {
                    debug!(line = start + 1, "table with fewer than two rows skipped");
                }
                continue;
            }

            if let Some(info) = trimmed.strip_prefix("```") {
                let mut body = Vec::new();
                while i < lines.len() && !lines[i].trim().starts_with("```") {
                    body.push(lines[i]);
                    i += 1;
                }
                // Step past the closing fence when there is one.
                i += 1;
                state.push(Block::Code {
                    language: code_language_id(info),
                    content: body.join("\n"),
                });
                continue;
            }

            state.push(Block::Text {
                runs: parse_inline(line),
            });
        }

        state.finish()
    }

    fn table(&self, lines: &[&str]) -> Option<Block> {
        let mut rows: Vec<Vec<String>> = Vec::new();
        for line in lines {
            if line.contains("|---") || self.separator.is_match(line.trim()) {
                continue;
            }
            let mut cells: Vec<&str> = line.split('|').collect();
            if cells.first().is_some_and(|c| c.trim().is_empty()) {
                cells.remove(0);
            }
            if cells.last().is_some_and(|c| c.trim().is_empty()) {
                cells.pop();
            }
            if cells.is_empty() {
                continue;
            }
            rows.push(cells.into_iter().map(clean_cell).collect());
        }

        if rows.len() < 2 {
            return None;
        }

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, String::new());
        }
        Some(Block::Table { rows })
    }

    fn resolve_local_image(&self, url: &str) -> Option<PathBuf> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return None;
        }
        let path = Path::new(url);
        let candidate = match &self.options.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
        candidate.exists().then_some(candidate)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct State {
    blocks: Vec<Block>,
    metadata: Metadata,
    title_pending: bool,
    callout: Option<CalloutBuilder>,
}

impl State {
    fn new(title_pending: bool) -> Self {
        Self {
            blocks: Vec::new(),
            metadata: Metadata::default(),
            title_pending,
            callout: None,
        }
    }

    fn push(&mut self, block: Block) {
        self.metadata.record(&block);
        self.blocks.push(block);
    }

    fn finish(mut self) -> ParsedDocument {
        if let Some(open) = self.callout.take() {
            debug!("unterminated callout flushed at end of input");
            self.push(open.finish());
        }
        ParsedDocument {
            blocks: self.blocks,
            metadata: self.metadata,
        }
    }
}

struct CalloutBuilder {
    style: CalloutStyle,
    lines: Vec<String>,
}

impl CalloutBuilder {
    fn new(name: &str) -> Self {
        Self {
            style: CalloutStyle::from_name(name),
            lines: Vec::new(),
        }
    }

    fn finish(self) -> Block {
        Block::Callout {
            style: self.style,
            content: self.lines.join("\n").trim().to_string(),
        }
    }
}

/// Parse Markdown text with the given options.
pub fn parse_markdown(text: &str, options: &ParseOptions) -> Result<ParsedDocument> {
    Ok(MarkdownParser::new(options.clone())?.parse(text))
}

/// Read and parse a Markdown file. Relative image paths resolve against the
/// file's directory.
pub fn parse_file(path: &Path, include_first_title: bool) -> Result<ParsedDocument> {
    let text = std::fs::read_to_string(path).map_err(|source| ParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let options = ParseOptions {
        include_first_title,
        base_dir: path.parent().map(Path::to_path_buf),
    };
    let document = parse_markdown(&text, &options)?;
    debug!(
        path = %path.display(),
        blocks = document.metadata.total_blocks,
        "markdown parsed"
    );
    Ok(document)
}
