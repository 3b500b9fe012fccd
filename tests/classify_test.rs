//! Integration tests for document-kind classification.

mod common;

use common::{build_pdf, filler_lines, PageSpec, ScanImage};
use scrubpdf::{classify, DocumentKind, SourceDocument};

fn scan_page() -> PageSpec {
    PageSpec::scanned(ScanImage::blank(612, 792))
}

#[test]
fn all_text_document_is_text_native() {
    let pdf = build_pdf(
        &[
            PageSpec::text(&filler_lines()),
            PageSpec::text(&filler_lines()),
        ],
        None,
    );
    let source = SourceDocument::from_bytes(&pdf).unwrap();
    assert_eq!(classify(&source).unwrap(), DocumentKind::TextNative);
}

#[test]
fn all_image_document_is_scanned() {
    let pdf = build_pdf(&[scan_page(), scan_page(), scan_page()], None);
    let source = SourceDocument::from_bytes(&pdf).unwrap();
    assert_eq!(classify(&source).unwrap(), DocumentKind::Scanned);
}

#[test]
fn scenario_d_majority_image_pages() {
    // 4 of 5 pages image-only, one fully text: majority rules.
    let pdf = build_pdf(
        &[
            scan_page(),
            scan_page(),
            PageSpec::text(&filler_lines()),
            scan_page(),
            scan_page(),
        ],
        None,
    );
    let source = SourceDocument::from_bytes(&pdf).unwrap();
    assert_eq!(classify(&source).unwrap(), DocumentKind::Scanned);
}

#[test]
fn hybrid_with_text_majority_is_text_native() {
    let pdf = build_pdf(
        &[
            PageSpec::text(&filler_lines()),
            scan_page(),
            PageSpec::text(&filler_lines()),
            PageSpec::text(&filler_lines()),
            scan_page(),
        ],
        None,
    );
    let source = SourceDocument::from_bytes(&pdf).unwrap();
    assert_eq!(classify(&source).unwrap(), DocumentKind::TextNative);
}

#[test]
fn image_with_substantial_text_is_text_native() {
    // A page carrying both an image and a real text layer is not a scan.
    let pdf = build_pdf(
        &[
            PageSpec::text(&filler_lines()).with_header_image(),
            PageSpec::text(&filler_lines()).with_header_image(),
        ],
        None,
    );
    let source = SourceDocument::from_bytes(&pdf).unwrap();
    assert_eq!(classify(&source).unwrap(), DocumentKind::TextNative);
}

#[test]
fn image_page_with_sparse_caption_is_scanned() {
    // A couple of words under a full-page image still reads as a scan.
    let mut page = PageSpec::scanned(ScanImage::blank(612, 792));
    page.lines = vec!["Fig 1".to_string()];
    let pdf = build_pdf(&[page.clone(), page], None);
    let source = SourceDocument::from_bytes(&pdf).unwrap();
    assert_eq!(classify(&source).unwrap(), DocumentKind::Scanned);
}
