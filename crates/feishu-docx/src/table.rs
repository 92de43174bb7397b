//! Table descendant trees.
//!
//! A table cannot be created through the plain children endpoint with its
//! content in place. The descendant endpoint takes the whole tree at once:
//! the table block lists its cells, each cell lists one text block, and
//! every node gets a temporary id that Feishu replaces on insert.

use feishu_md_parser::block::{BLOCK_TYPE_TABLE, BLOCK_TYPE_TABLE_CELL, BLOCK_TYPE_TEXT};
use feishu_md_parser::{TextRun, table_dimensions};
use serde_json::{Value, json};

/// A table ready for the descendant endpoint.
#[derive(Debug, Clone)]
pub struct TableTree {
    /// Temporary id of the table block, the only entry of `children_id`.
    pub table_id: String,
    /// Table block, then each cell followed by its text block, row-major.
    pub descendants: Vec<Value>,
}

fn temp_id(prefix: &str) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &hex[..16])
}

/// Build the descendant tree for a grid of cell texts.
///
/// Rows shorter than the widest row are padded with empty cells.
pub fn build_table(rows: &[Vec<String>]) -> TableTree {
    let (row_size, column_size) = table_dimensions(rows);
    let table_id = temp_id("table");

    let slots = row_size * column_size;
    let cell_ids: Vec<String> = (0..slots).map(|_| temp_id("cell")).collect();

    let mut descendants = Vec::with_capacity(1 + slots * 2);
    descendants.push(json!({
        "block_id": table_id,
        "block_type": BLOCK_TYPE_TABLE,
        "table": {
            "property": {
                "row_size": row_size,
                "column_size": column_size,
                "header_row": true,
            },
        },
        "children": cell_ids,
    }));

    for (slot, cell_id) in cell_ids.iter().enumerate() {
        let (row, col) = (slot / column_size, slot % column_size);
        let text = rows[row].get(col).map(String::as_str).unwrap_or_default();
        let content_id = temp_id("cellcontent");

        descendants.push(json!({
            "block_id": cell_id,
            "block_type": BLOCK_TYPE_TABLE_CELL,
            "table_cell": {},
            "children": [content_id],
        }));
        descendants.push(json!({
            "block_id": content_id,
            "block_type": BLOCK_TYPE_TEXT,
            "text": {
                "elements": [TextRun::plain(text).to_element()],
                "style": {},
            },
            "children": [],
        }));
    }

    TableTree {
        table_id,
        descendants,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn tree_shape_for_two_by_two() {
        let tree = build_table(&grid(&[&["Name", "Role"], &["Ann", "Dev"]]));
        assert_eq!(tree.descendants.len(), 1 + 4 * 2);

        let table = &tree.descendants[0];
        assert_eq!(table["block_id"], tree.table_id.as_str());
        assert_eq!(table["block_type"], 31);
        assert_eq!(table["table"]["property"]["row_size"], 2);
        assert_eq!(table["table"]["property"]["column_size"], 2);
        assert_eq!(table["table"]["property"]["header_row"], true);

        let cells = table["children"].as_array().unwrap();
        assert_eq!(cells.len(), 4);
        assert_eq!(tree.descendants[1]["block_id"], cells[0]);
        assert_eq!(tree.descendants[1]["block_type"], 32);

        let content_id = &tree.descendants[1]["children"][0];
        assert_eq!(&tree.descendants[2]["block_id"], content_id);
        assert_eq!(
            tree.descendants[2]["text"]["elements"][0]["text_run"]["content"],
            "Name"
        );
        assert_eq!(
            tree.descendants[8]["text"]["elements"][0]["text_run"]["content"],
            "Dev"
        );
    }

    #[test]
    fn ids_have_prefix_and_sixteen_hex() {
        let tree = build_table(&grid(&[&["a"], &["b"]]));
        let id = tree.table_id.strip_prefix("table_").unwrap();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));

        let cell = tree.descendants[1]["block_id"].as_str().unwrap();
        assert!(cell.starts_with("cell_"));
        let content = tree.descendants[2]["block_id"].as_str().unwrap();
        assert!(content.starts_with("cellcontent_"));
    }

    #[test]
    fn ragged_rows_are_padded() {
        let tree = build_table(&grid(&[&["a", "b", "c"], &["d"]]));
        assert_eq!(tree.descendants[0]["table"]["property"]["column_size"], 3);
        // Row 2, column 3 is the last text block.
        let last = tree.descendants.last().unwrap();
        assert_eq!(last["text"]["elements"][0]["text_run"]["content"], "");
    }
}
