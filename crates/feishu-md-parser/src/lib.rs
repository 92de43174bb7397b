//! Markdown to Feishu docx block conversion.
//!
//! The parser is deliberately small: it understands the subset of Markdown
//! that maps onto docx blocks (headings, lists, todos, quotes, code fences,
//! `:::name` callouts, pipe tables, images, dividers, and `**bold**` runs)
//! and treats everything else as a text paragraph.
//!
//! ```
//! use feishu_md_parser::{ParseOptions, parse_markdown};
//!
//! let doc = parse_markdown("# Title\n\n- item\n", &ParseOptions::default()).unwrap();
//! assert_eq!(doc.metadata.list_count, 1);
//! ```

pub mod block;
pub mod error;
pub mod inline;
pub mod language;
pub mod parser;

pub use block::{Block, CalloutStyle, TextRun, table_dimensions};
pub use error::{ParseError, Result};
pub use language::code_language_id;
pub use parser::{MarkdownParser, Metadata, ParseOptions, ParsedDocument, parse_file, parse_markdown};
