use feishu_md_parser::{Block, CalloutStyle, ParseError, ParsedDocument, parse_file};

#[test]
fn relative_image_resolves_against_markdown_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("img")).unwrap();
    std::fs::write(dir.path().join("img/diagram.png"), b"\x89PNG").unwrap();

    let md = dir.path().join("guide.md");
    std::fs::write(
        &md,
        "# Guide\n\n![diagram](img/diagram.png)\n![missing](img/nope.png)\n",
    )
    .unwrap();

    let doc = parse_file(&md, false).unwrap();
    assert_eq!(doc.blocks.len(), 2);

    match &doc.blocks[0] {
        Block::Image { local_path, .. } => {
            assert_eq!(local_path.as_deref(), Some(dir.path().join("img/diagram.png").as_path()));
        }
        other => panic!("expected image, got {other:?}"),
    }
    assert!(matches!(
        &doc.blocks[1],
        Block::Image {
            local_path: None,
            ..
        }
    ));
}

#[test]
fn parsed_document_survives_the_hand_off_file() {
    let dir = tempfile::tempdir().unwrap();
    let md = dir.path().join("notes.md");
    std::fs::write(
        &md,
        "# Notes\n\n:::success\nShipped\n:::\n\n| a | b |\n|---|---|\n| 1 | 2 |\n",
    )
    .unwrap();

    let doc = parse_file(&md, false).unwrap();
    let json = doc.to_json_pretty().unwrap();
    let back = ParsedDocument::from_json(&json).unwrap();
    assert_eq!(back, doc);
    assert!(matches!(
        back.blocks[0],
        Block::Callout {
            style: CalloutStyle::Success,
            ..
        }
    ));
    assert_eq!(back.metadata.table_count, 1);
}

#[test]
fn missing_file_reports_path() {
    let err = parse_file(std::path::Path::new("/definitely/not/here.md"), false).unwrap_err();
    assert!(matches!(err, ParseError::Read { .. }));
    assert!(err.to_string().contains("/definitely/not/here.md"));
}
