//! Loading a data directory that mixes PDFs with text files.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};
use pajak_rag::{DocumentLoader, FileKind, TypeLoad};

/// Write a PDF with one line of text per page.
fn write_pdf(path: &Path, pages: &[&str]) {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

#[test]
fn pdf_pages_become_zero_based_documents() {
    let temp = tempfile::tempdir().unwrap();
    write_pdf(&temp.path().join("uu-kup.pdf"), &["Pasal 1 Ketentuan Umum", "Pasal 2 NPWP"]);
    std::fs::write(temp.path().join("ringkasan.md"), "# Ringkasan").unwrap();

    let loaded = DocumentLoader::new(temp.path()).load();
    assert_eq!(
        loaded.reports,
        vec![
            TypeLoad::Loaded { kind: FileKind::Pdf, count: 2 },
            TypeLoad::Loaded { kind: FileKind::Markdown, count: 1 },
            TypeLoad::NotFound { kind: FileKind::Text },
        ]
    );

    let pages: Vec<Option<u32>> = loaded.documents.iter().map(|d| d.metadata.page).collect();
    assert_eq!(pages, vec![Some(0), Some(1), None]);
    assert!(loaded.documents[0].text.contains("Pasal 1 Ketentuan Umum"));
    assert!(loaded.documents[1].text.contains("Pasal 2 NPWP"));
    assert_ne!(loaded.documents[0].id, loaded.documents[1].id);
    assert!(loaded.documents[0].metadata.source.ends_with("uu-kup.pdf"));
}

#[test]
fn load_kind_surfaces_the_error() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join("rusak.pdf"), b"%PDF-1.5 truncated").unwrap();

    let loader = DocumentLoader::new(temp.path());
    assert!(loader.load_kind(FileKind::Pdf).is_err());
    assert!(loader.load_kind(FileKind::Text).unwrap().is_empty());
}
