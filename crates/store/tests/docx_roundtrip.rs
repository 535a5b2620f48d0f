//! Import/export round-trip tests against in-memory DOCX fixtures

mod common;

use common::*;
use doc_model::{Block, NodeId, ObjectType, Run, WrapMode};
use edit_engine::{EditAction, Editor};
use store::docx::{ClassifierConfig, LayoutConfig};
use store::{DocxExporter, DocxImporter, IntegrityChecker, WarningKind};

fn import(docx: &[u8]) -> store::ImportResult {
    DocxImporter::default()
        .import(docx, "p1", Some("handbuch.docx"))
        .unwrap()
}

fn text_runs(block: &Block) -> Vec<String> {
    match block {
        Block::Paragraph(p) => p.runs.iter().map(|r| r.text().to_string()).collect(),
        Block::Table(_) => panic!("expected paragraph"),
    }
}

fn three_run_document() -> Vec<u8> {
    DocxBuilder::new()
        .body(paragraph(&[run("Hallo"), bold_run("Welt!"), run("0123456789")]))
        .body(paragraph(&[run("Zweiter Absatz")]))
        .build()
}

#[test]
fn test_unchanged_export_is_byte_identical() {
    let docx = three_run_document();
    let imported = import(&docx);

    let exported = DocxExporter::new().export(&imported.model, &docx, &[]).unwrap();
    assert!(exported.report.is_unchanged());
    assert_eq!(exported.bytes, docx);
}

#[test]
fn test_edit_keeps_run_cardinality_and_formatting() {
    let docx = three_run_document();
    let imported = import(&docx);
    let first = imported.model.blocks[0].id();

    let mut editor = Editor::new(imported.model);
    editor
        .dispatch(EditAction::EditText {
            block_id: first,
            text: "abcdefghijkl".into(),
        })
        .unwrap();

    let exported = DocxExporter::new().export(editor.model(), &docx, &[]).unwrap();
    assert_eq!(exported.report.patched_paragraphs, 1);

    let reimported = import(&exported.bytes);
    assert_eq!(text_runs(&reimported.model.blocks[0]), vec!["abc", "def", "ghijkl"]);
    assert_eq!(text_runs(&reimported.model.blocks[1]), vec!["Zweiter Absatz"]);

    let xml = read_part(&exported.bytes, "word/document.xml");
    assert_eq!(xml.matches("<w:r>").count() + xml.matches("<w:r ").count(), 4);
    assert!(xml.contains("<w:b/>"));
    assert!(xml.contains(SECTION));
}

#[test]
fn test_run_cardinality_holds_for_any_run_count() {
    for count in 1..=7 {
        let runs: Vec<String> = (0..count)
            .map(|i| {
                let text = format!("Teil{}", i);
                if i % 2 == 0 {
                    run(&text)
                } else {
                    bold_run(&text)
                }
            })
            .collect();
        let docx = DocxBuilder::new().body(paragraph(&runs)).build();
        let imported = import(&docx);
        let block_id = imported.model.blocks[0].id();

        let text = "xyz".repeat(count);
        let mut editor = Editor::new(imported.model);
        editor
            .dispatch(EditAction::EditText {
                block_id,
                text: text.clone(),
            })
            .unwrap();
        let exported = DocxExporter::new().export(editor.model(), &docx, &[]).unwrap();

        let reimported = import(&exported.bytes);
        let segments = text_runs(&reimported.model.blocks[0]);
        assert_eq!(segments.len(), count, "{count} runs");
        assert!(segments.iter().all(|s| s == "xyz"), "{count} runs: {segments:?}");
        let xml = read_part(&exported.bytes, "word/document.xml");
        assert_eq!(xml.matches("<w:b/>").count(), count / 2, "{count} runs");
    }
}

#[test]
fn test_part_with_byte_order_mark_imports_and_exports() {
    let docx = DocxBuilder::new()
        .with_bom()
        .body(paragraph(&[run("Hallo "), bold_run("Welt")]))
        .build();
    let imported = import(&docx);
    assert_eq!(imported.model.blocks[0].text(), "Hallo Welt");

    let unchanged = DocxExporter::new().export(&imported.model, &docx, &[]).unwrap();
    assert_eq!(unchanged.bytes, docx);

    let block_id = imported.model.blocks[0].id();
    let mut editor = Editor::new(imported.model);
    editor
        .dispatch(EditAction::EditText {
            block_id,
            text: "Guten Tag".into(),
        })
        .unwrap();
    let exported = DocxExporter::new().export(editor.model(), &docx, &[]).unwrap();
    assert_eq!(exported.report.patched_paragraphs, 1);

    let xml = read_part(&exported.bytes, "word/document.xml");
    assert!(xml.starts_with('\u{feff}'));
    assert!(xml.contains("<w:b/>"));
    assert_eq!(import(&exported.bytes).model.blocks[0].text(), "Guten Tag");
}

#[test]
fn test_untouched_parts_survive_edits() {
    let docx = DocxBuilder::new()
        .body(paragraph(&[run("Text")]))
        .header(paragraph(&[run("Kopfzeile")]))
        .footer(paragraph(&[run("Seite")]))
        .build();
    let imported = import(&docx);
    let body = imported.model.blocks[0].id();

    let mut editor = Editor::new(imported.model);
    editor
        .dispatch(EditAction::EditText {
            block_id: body,
            text: "Neuer Text".into(),
        })
        .unwrap();
    let exported = DocxExporter::new().export(editor.model(), &docx, &[]).unwrap();

    for part in ["word/header1.xml", "word/footer1.xml", "[Content_Types].xml"] {
        assert_eq!(read_part(&exported.bytes, part), read_part(&docx, part), "{part}");
    }
}

#[test]
fn test_escaped_text_round_trips() {
    let docx = three_run_document();
    let imported = import(&docx);
    let first = imported.model.blocks[0].id();

    let mut editor = Editor::new(imported.model);
    editor
        .dispatch(EditAction::EditText {
            block_id: first,
            text: "Müller & Söhne <GmbH>".into(),
        })
        .unwrap();
    let exported = DocxExporter::new().export(editor.model(), &docx, &[]).unwrap();

    let reimported = import(&exported.bytes);
    assert_eq!(reimported.model.blocks[0].text(), "Müller & Söhne <GmbH>");
}

#[test]
fn test_parts_tables_and_node_indices() {
    let docx = DocxBuilder::new()
        .body(paragraph(&[run("Einleitung")]))
        .body(table(&[&["A1", "B1"], &["A2", "B2"]]))
        .body(paragraph(&[run("Schluss")]))
        .header(paragraph(&[run("Kopf")]))
        .footer(paragraph(&[run("Fuss")]))
        .build();
    let model = import(&docx).model;

    let addresses: Vec<(&str, usize)> = model
        .blocks
        .iter()
        .map(|b| (b.xml_path(), b.node_index()))
        .collect();
    assert_eq!(
        addresses,
        vec![
            ("word/document.xml", 0),
            ("word/document.xml", 0),
            ("word/document.xml", 1),
            ("word/header1.xml", 0),
            ("word/footer1.xml", 0),
        ]
    );

    let Block::Table(table) = &model.blocks[1] else {
        panic!("expected table");
    };
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.column_count(), 2);
    assert_eq!(table.rows[1].cells[1].paragraphs[0].text(), "B2");

    assert!(model.metadata.has_headers);
    assert!(model.metadata.has_footers);
    assert_eq!(model.metadata.page_count, 1);
    assert_eq!(model.metadata.source_filename.as_deref(), Some("handbuch.docx"));

    let report = IntegrityChecker::new().check(&model, &[]);
    assert!(report.is_valid, "{:?}", report.issues);
}

#[test]
fn test_table_cell_edit() {
    let docx = DocxBuilder::new()
        .body(table(&[&["Prozess", "Verantwortlich"]]))
        .build();
    let imported = import(&docx);
    let Block::Table(table) = &imported.model.blocks[0] else {
        panic!("expected table");
    };
    let cell: NodeId = table.rows[0].cells[1].paragraphs[0].id;

    let mut editor = Editor::new(imported.model);
    editor
        .dispatch(EditAction::EditText {
            block_id: cell,
            text: "Geschäftsführung".into(),
        })
        .unwrap();
    let exported = DocxExporter::new().export(editor.model(), &docx, &[]).unwrap();

    let Block::Table(table) = &import(&exported.bytes).model.blocks[0] else {
        panic!("expected table");
    };
    assert_eq!(table.rows[0].cells[0].paragraphs[0].text(), "Prozess");
    assert_eq!(table.rows[0].cells[1].paragraphs[0].text(), "Geschäftsführung");
}

#[test]
fn test_placeholders_and_styles() {
    let docx = DocxBuilder::new()
        .styles(HEADING_STYLES)
        .body(heading("Qualitätspolitik"))
        .body(paragraph(&[run("Die {{FIRMA_NAME}} GmbH in {{ORT}}")]))
        .build();
    let model = import(&docx).model;

    assert_eq!(model.metadata.placeholders, vec!["FIRMA_NAME", "ORT"]);
    let Block::Paragraph(heading) = &model.blocks[0] else {
        panic!("expected paragraph");
    };
    assert!(heading.style.is_heading());
    assert_eq!(heading.style.font_size_pt(), Some(16.0));
    assert_eq!(model.styles.len(), 2);
}

#[test]
fn test_floating_signature_is_classified_and_movable() {
    // 50 x 15 mm, lower half of an A4 page
    let docx = DocxBuilder::new()
        .image_rel("rId5", "media/image1.png")
        .media("image1.png", PNG)
        .body(paragraph(&[run("Geschäftsführer")]))
        .body(paragraph(&[anchored_picture("rId5", "Unterschrift", 914_400, 7_620_000, 1_800_000, 540_000)]))
        .build();
    let imported = import(&docx);
    assert!(imported.warnings.is_empty(), "{:?}", imported.warnings);
    assert_eq!(imported.assets.len(), 1);

    let object = &imported.model.document_objects[0];
    assert_eq!(object.object_type, ObjectType::Signature);
    assert_eq!(object.x_px, 96.0);
    assert_eq!(object.y_px, 800.0);
    assert_eq!(object.wrap, WrapMode::InFrontOfText);
    assert!(imported.model.metadata.has_signatures);
    let id = object.id;

    let mut editor = Editor::new(imported.model);
    editor
        .dispatch(EditAction::MoveObject {
            object_id: id,
            x_px: 192.0,
            y_px: 700.0,
        })
        .unwrap();
    editor
        .dispatch(EditAction::ResizeObject {
            object_id: id,
            width_px: 200.0,
            height_px: 60.0,
        })
        .unwrap();
    let exported = DocxExporter::new()
        .export(editor.model(), &docx, &imported.assets)
        .unwrap();
    assert_eq!(exported.report.patched_objects, 1);
    assert!(exported.report.added_media.is_empty());

    let moved = &import(&exported.bytes).model.document_objects[0];
    assert_eq!(moved.x_px, 192.0);
    assert_eq!(moved.y_px, 700.0);
    assert_eq!(moved.width_px, 200.0);
    assert_eq!(moved.height_px, 60.0);
}

#[test]
fn test_deleted_object_drops_its_drawing() {
    let docx = DocxBuilder::new()
        .image_rel("rId5", "media/image1.png")
        .media("image1.png", PNG)
        .body(paragraph(&[run("Stempel: "), anchored_picture("rId5", "Stempel", 0, 0, 1_260_000, 1_260_000)]))
        .build();
    let imported = import(&docx);
    let id = imported.model.document_objects[0].id;

    let mut editor = Editor::new(imported.model);
    editor.dispatch(EditAction::DeleteObject { object_id: id }).unwrap();
    let exported = DocxExporter::new().export(editor.model(), &docx, &[]).unwrap();
    assert_eq!(exported.report.removed_drawings, 1);

    let reimported = import(&exported.bytes).model;
    assert!(reimported.document_objects.is_empty());
    assert_eq!(reimported.blocks[0].text(), "Stempel: ");
}

#[test]
fn test_inline_image_becomes_image_run() {
    let docx = DocxBuilder::new()
        .image_rel("rId5", "media/image1.png")
        .media("image1.png", PNG)
        .body(paragraph(&[run("Logo: "), inline_picture("rId5", 952_500, 476_250)]))
        .build();
    let imported = import(&docx);

    let Block::Paragraph(p) = &imported.model.blocks[0] else {
        panic!("expected paragraph");
    };
    let Run::Image(image) = &p.runs[1] else {
        panic!("expected image run");
    };
    assert_eq!(image.asset_id, imported.assets[0].id);
    assert_eq!((image.width_emu, image.height_emu), (952_500, 476_250));
    assert!(imported.model.metadata.has_images);
    assert!(imported.model.document_objects.is_empty());
}

#[test]
fn test_missing_media_is_a_warning() {
    let docx = DocxBuilder::new()
        .image_rel("rId5", "media/missing.png")
        .body(paragraph(&[run("a"), inline_picture("rId5", 100, 100)]))
        .body(paragraph(&[run("b"), inline_picture("rId404", 100, 100)]))
        .build();
    let imported = import(&docx);

    let kinds: Vec<WarningKind> = imported.warnings.iter().map(|w| w.kind).collect();
    assert_eq!(kinds, vec![WarningKind::MissingImage, WarningKind::UnresolvedRelationship]);
    assert!(imported.assets.is_empty());
    assert_eq!(imported.model.blocks.len(), 2);
}

#[test]
fn test_not_a_docx() {
    assert!(DocxImporter::default().import(b"plain text", "p1", None).is_err());
}

#[test]
fn test_classification_is_deterministic() {
    let docx = DocxBuilder::new()
        .image_rel("rId5", "media/image1.png")
        .media("image1.png", PNG)
        .body(paragraph(&[anchored_picture("rId5", "Firmenlogo", 4_500_000, 300_000, 1_440_000, 720_000)]))
        .build();
    let importer = DocxImporter::new(ClassifierConfig::default(), LayoutConfig::default());

    let first = importer.import(&docx, "p1", None).unwrap().model.document_objects;
    let second = importer.import(&docx, "p1", None).unwrap().model.document_objects;
    assert_eq!(first[0].object_type, second[0].object_type);
    assert_eq!(first[0].classification_confidence, second[0].classification_confidence);
    assert_eq!(first[0].classification_reasons, second[0].classification_reasons);
}
