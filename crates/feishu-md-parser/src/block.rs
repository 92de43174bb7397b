//! Typed block records and their Feishu docx wire representation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::inline::strip_zero_width;

// ---------------------------------------------------------------------------
// Block type ids used by the docx API
// ---------------------------------------------------------------------------

pub const BLOCK_TYPE_TEXT: u32 = 2;
pub const BLOCK_TYPE_HEADING1: u32 = 3;
pub const BLOCK_TYPE_BULLET: u32 = 12;
pub const BLOCK_TYPE_ORDERED: u32 = 13;
pub const BLOCK_TYPE_CODE: u32 = 14;
pub const BLOCK_TYPE_QUOTE: u32 = 15;
pub const BLOCK_TYPE_TODO: u32 = 17;
pub const BLOCK_TYPE_CALLOUT: u32 = 19;
pub const BLOCK_TYPE_DIVIDER: u32 = 22;
pub const BLOCK_TYPE_IMAGE: u32 = 27;
pub const BLOCK_TYPE_TABLE: u32 = 31;
pub const BLOCK_TYPE_TABLE_CELL: u32 = 32;

// ---------------------------------------------------------------------------
// Inline runs
// ---------------------------------------------------------------------------

/// A run of inline text, optionally bold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub content: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
}

impl TextRun {
    /// Create a run. Zero-width characters are removed from `content`.
    pub fn new(content: impl AsRef<str>, bold: bool) -> Self {
        Self {
            content: strip_zero_width(content.as_ref()),
            bold,
        }
    }

    pub fn plain(content: impl AsRef<str>) -> Self {
        Self::new(content, false)
    }

    /// The `text_run` element used inside block `elements`.
    pub fn to_element(&self) -> Value {
        let mut run = json!({ "content": self.content });
        if self.bold {
            run["text_element_style"] = json!({ "bold": true });
        }
        json!({ "text_run": run })
    }
}

fn elements(runs: &[TextRun]) -> Value {
    if runs.is_empty() {
        return json!([TextRun::plain("").to_element()]);
    }
    Value::Array(runs.iter().map(TextRun::to_element).collect())
}

// ---------------------------------------------------------------------------
// Callout styles
// ---------------------------------------------------------------------------

/// Visual style of a `:::name` callout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalloutStyle {
    #[default]
    Info,
    Tip,
    Warning,
    Success,
    Note,
    Important,
}

impl CalloutStyle {
    /// Resolve a callout name; unknown names fall back to [`CalloutStyle::Info`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "tip" => Self::Tip,
            "warning" => Self::Warning,
            "success" => Self::Success,
            "note" => Self::Note,
            "important" => Self::Important,
            _ => Self::Info,
        }
    }

    pub fn emoji_id(self) -> &'static str {
        match self {
            Self::Info => "information_source",
            Self::Tip => "bulb",
            Self::Warning => "warning",
            Self::Success => "white_check_mark",
            Self::Note => "pushpin",
            Self::Important => "fire",
        }
    }

    pub fn background_color(self) -> u8 {
        match self {
            Self::Info => 5,
            Self::Tip => 3,
            Self::Warning => 1,
            Self::Success => 4,
            Self::Note => 7,
            Self::Important => 8,
        }
    }

    pub fn border_color(self) -> u8 {
        match self {
            Self::Info => 5,
            Self::Tip => 3,
            Self::Warning | Self::Important => 1,
            Self::Success => 4,
            Self::Note => 7,
        }
    }

    pub fn text_color(self) -> Option<u8> {
        match self {
            Self::Info | Self::Note => None,
            Self::Tip => Some(3),
            Self::Warning | Self::Important => Some(1),
            Self::Success => Some(4),
        }
    }

    /// The style fields, flat. The docx API ignores colours nested under
    /// a `style` key, so these sit directly inside `callout`.
    fn fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("emoji_id".into(), json!(self.emoji_id()));
        fields.insert("background_color".into(), json!(self.background_color()));
        fields.insert("border_color".into(), json!(self.border_color()));
        if let Some(color) = self.text_color() {
            fields.insert("text_color".into(), json!(color));
        }
        fields
    }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// One block of the parsed document, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Text {
        runs: Vec<TextRun>,
    },
    Heading {
        level: u8,
        runs: Vec<TextRun>,
    },
    Bullet {
        runs: Vec<TextRun>,
    },
    Ordered {
        runs: Vec<TextRun>,
    },
    Todo {
        done: bool,
        runs: Vec<TextRun>,
    },
    Code {
        /// Feishu code language id, see [`crate::code_language_id`].
        language: u32,
        content: String,
    },
    Quote {
        runs: Vec<TextRun>,
    },
    Callout {
        style: CalloutStyle,
        content: String,
    },
    Divider,
    Image {
        alt: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        local_path: Option<PathBuf>,
    },
    Table {
        rows: Vec<Vec<String>>,
    },
}

impl Block {
    /// Short name used in logs and failure records.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Heading { .. } => "heading",
            Self::Bullet { .. } => "bullet",
            Self::Ordered { .. } => "ordered",
            Self::Todo { .. } => "todo",
            Self::Code { .. } => "code",
            Self::Quote { .. } => "quote",
            Self::Callout { .. } => "callout",
            Self::Divider => "divider",
            Self::Image { .. } => "image",
            Self::Table { .. } => "table",
        }
    }

    /// Docx `block_type` id.
    pub fn block_type(&self) -> u32 {
        match self {
            Self::Text { .. } => BLOCK_TYPE_TEXT,
            Self::Heading { level, .. } => {
                BLOCK_TYPE_HEADING1 + u32::from(*level).saturating_sub(1)
            }
            Self::Bullet { .. } => BLOCK_TYPE_BULLET,
            Self::Ordered { .. } => BLOCK_TYPE_ORDERED,
            Self::Todo { .. } => BLOCK_TYPE_TODO,
            Self::Code { .. } => BLOCK_TYPE_CODE,
            Self::Quote { .. } => BLOCK_TYPE_QUOTE,
            Self::Callout { .. } => BLOCK_TYPE_CALLOUT,
            Self::Divider => BLOCK_TYPE_DIVIDER,
            Self::Image { .. } => BLOCK_TYPE_IMAGE,
            Self::Table { .. } => BLOCK_TYPE_TABLE,
        }
    }

    /// JSON body for the "create children" endpoint.
    ///
    /// Callouts carry only their style; the content lines are inserted as
    /// child text blocks. Images are created empty and filled in after the
    /// upload. Tables are emitted without cells since they go through the
    /// descendant endpoint.
    pub fn payload(&self) -> Value {
        let block_type = self.block_type();
        match self {
            Self::Text { runs } => text_like(block_type, "text", runs),
            Self::Heading { level, runs } => {
                text_like(block_type, &format!("heading{level}"), runs)
            }
            Self::Bullet { runs } => text_like(block_type, "bullet", runs),
            Self::Ordered { runs } => text_like(block_type, "ordered", runs),
            Self::Quote { runs } => text_like(block_type, "quote", runs),
            Self::Todo { done, runs } => json!({
                "block_type": block_type,
                "todo": {
                    "elements": elements(runs),
                    "style": { "done": done },
                },
            }),
            Self::Code { language, content } => json!({
                "block_type": block_type,
                "code": {
                    "elements": [TextRun::plain(content).to_element()],
                    "style": { "language": language, "wrap": false },
                },
            }),
            Self::Callout { style, .. } => json!({
                "block_type": block_type,
                "callout": Value::Object(style.fields()),
            }),
            Self::Divider => json!({ "block_type": block_type, "divider": {} }),
            Self::Image { .. } => json!({ "block_type": block_type, "image": {} }),
            Self::Table { rows } => {
                let (row_size, column_size) = table_dimensions(rows);
                json!({
                    "block_type": block_type,
                    "table": {
                        "property": {
                            "row_size": row_size,
                            "column_size": column_size,
                            "header_row": true,
                        },
                    },
                })
            }
        }
    }
}

fn text_like(block_type: u32, key: &str, runs: &[TextRun]) -> Value {
    let mut body = Map::new();
    body.insert("block_type".into(), json!(block_type));
    body.insert(
        key.to_string(),
        json!({ "elements": elements(runs), "style": {} }),
    );
    Value::Object(body)
}

/// `(rows, columns)` of a table grid.
pub fn table_dimensions(rows: &[Vec<String>]) -> (usize, usize) {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    (rows.len(), columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_payload_uses_level_key() {
        let block = Block::Heading {
            level: 2,
            runs: vec![TextRun::plain("Setup")],
        };
        let payload = block.payload();
        assert_eq!(payload["block_type"], 4);
        assert_eq!(
            payload["heading2"]["elements"][0]["text_run"]["content"],
            "Setup"
        );
    }

    #[test]
    fn heading_nine_is_type_eleven() {
        let block = Block::Heading {
            level: 9,
            runs: vec![],
        };
        assert_eq!(block.block_type(), 11);
    }

    #[test]
    fn bold_run_has_element_style() {
        let element = TextRun::new("x", true).to_element();
        assert_eq!(element["text_run"]["text_element_style"]["bold"], true);
        let plain = TextRun::plain("x").to_element();
        assert!(plain["text_run"].get("text_element_style").is_none());
    }

    #[test]
    fn empty_runs_produce_one_empty_element() {
        let payload = Block::Text { runs: vec![] }.payload();
        assert_eq!(payload["text"]["elements"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn todo_done_lives_in_style() {
        let payload = Block::Todo {
            done: true,
            runs: vec![TextRun::plain("ship")],
        }
        .payload();
        assert_eq!(payload["block_type"], 17);
        assert_eq!(payload["todo"]["style"]["done"], true);
        assert!(payload.get("done").is_none());
    }

    #[test]
    fn callout_fields_are_flat() {
        let payload = Block::Callout {
            style: CalloutStyle::Important,
            content: "careful".into(),
        }
        .payload();
        let callout = &payload["callout"];
        assert_eq!(callout["emoji_id"], "fire");
        assert_eq!(callout["background_color"], 8);
        assert_eq!(callout["border_color"], 1);
        assert_eq!(callout["text_color"], 1);
        assert!(callout.get("style").is_none());
    }

    #[test]
    fn info_callout_has_no_text_color() {
        let payload = Block::Callout {
            style: CalloutStyle::Info,
            content: String::new(),
        }
        .payload();
        assert!(payload["callout"].get("text_color").is_none());
    }

    #[test]
    fn unknown_callout_name_is_info() {
        assert_eq!(CalloutStyle::from_name("danger"), CalloutStyle::Info);
        assert_eq!(CalloutStyle::from_name(" TIP "), CalloutStyle::Tip);
    }

    #[test]
    fn code_payload_carries_language() {
        let payload = Block::Code {
            language: 53,
            content: "fn main() {}".into(),
        }
        .payload();
        assert_eq!(payload["code"]["style"]["language"], 53);
        assert_eq!(
            payload["code"]["elements"][0]["text_run"]["content"],
            "fn main() {}"
        );
    }

    #[test]
    fn divider_and_image_bodies_are_empty() {
        assert_eq!(
            Block::Divider.payload(),
            json!({ "block_type": 22, "divider": {} })
        );
        let image = Block::Image {
            alt: "logo".into(),
            url: "logo.png".into(),
            local_path: None,
        };
        assert_eq!(image.payload(), json!({ "block_type": 27, "image": {} }));
    }

    #[test]
    fn block_json_is_tagged_by_kind() {
        let json = serde_json::to_value(Block::Todo {
            done: false,
            runs: vec![TextRun::plain("a")],
        })
        .unwrap();
        assert_eq!(json["kind"], "todo");
        assert_eq!(json["done"], false);

        let back: Block = serde_json::from_value(json!({ "kind": "divider" })).unwrap();
        assert_eq!(back, Block::Divider);
    }
}
