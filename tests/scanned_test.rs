//! Integration tests for the scanned-document pipeline, driven by a
//! deterministic mock localizer.

mod common;

use std::sync::Arc;

use common::{build_pdf, PageSpec, ScanImage};
use scrubpdf::{
    redact_bytes, ActionKind, RedactOptions, Region, Result, SourceDocument, TextLocalizer,
    TextRegion,
};

/// Localizer that reports fixed regions on every page.
struct FixedLocalizer {
    regions: Vec<(String, Region)>,
}

impl FixedLocalizer {
    fn reading(text: &str, region: Region) -> Arc<Self> {
        Arc::new(Self {
            regions: vec![(text.to_string(), region)],
        })
    }
}

impl TextLocalizer for FixedLocalizer {
    fn name(&self) -> &str {
        "fixed"
    }

    fn localize(&self, _bitmap: &image::RgbImage) -> Result<Vec<TextRegion>> {
        Ok(self
            .regions
            .iter()
            .map(|(text, region)| TextRegion::new(text.clone(), *region))
            .collect())
    }
}

/// Localizer that always fails.
struct BrokenLocalizer;

impl TextLocalizer for BrokenLocalizer {
    fn name(&self) -> &str {
        "broken"
    }

    fn localize(&self, _bitmap: &image::RgbImage) -> Result<Vec<TextRegion>> {
        Err(scrubpdf::Error::Localization("engine crashed".to_string()))
    }
}

fn scan_pages(count: usize) -> Vec<PageSpec> {
    (0..count)
        .map(|_| PageSpec::scanned(ScanImage::blank(612, 792)))
        .collect()
}

#[test]
fn scenario_c_localized_phrase_is_masked() {
    let pdf = build_pdf(&scan_pages(2), None);
    let localizer = FixedLocalizer::reading(
        "TOP CONFIDENTIAL MEMO",
        Region::new(150.0, 100.0, 450.0, 140.0),
    );

    let options = RedactOptions::new().with_localizer(localizer).sequential();
    let outcome = redact_bytes(&pdf, ["confidential"], &options).unwrap();

    assert_eq!(
        outcome.audit.count(ActionKind::PageRasterizedAndRedacted),
        2
    );
    let pages: Vec<u32> = outcome.audit.entries.iter().map(|e| e.page).collect();
    assert_eq!(pages, vec![1, 2]);

    // The matched region is painted opaque in the output bitmap.
    let output_doc = SourceDocument::from_bytes(&outcome.output).unwrap();
    let page_id = *output_doc.pages().get(&1).unwrap();
    let bitmap = scrubpdf::raster::page_bitmap(output_doc.doc(), page_id, 612.0).unwrap();
    assert_eq!(bitmap.get_pixel(300, 120).0, [0, 0, 0]);
    // Pixels far from the match stay untouched paper.
    assert_eq!(bitmap.get_pixel(300, 600).0, [255, 255, 255]);
}

#[test]
fn no_match_leaves_pages_untouched() {
    let pdf = build_pdf(&scan_pages(2), None);
    let localizer = FixedLocalizer::reading(
        "ordinary page content",
        Region::new(100.0, 200.0, 400.0, 230.0),
    );

    let options = RedactOptions::new().with_localizer(localizer).sequential();
    let outcome = redact_bytes(&pdf, ["confidential"], &options).unwrap();

    assert!(outcome.audit.is_empty());
}

#[test]
fn missing_localizer_reports_every_page() {
    let pdf = build_pdf(&scan_pages(3), None);
    let outcome = redact_bytes(&pdf, ["confidential"], &RedactOptions::new().sequential()).unwrap();

    // One failure entry per page; pages left unredacted, call still succeeds.
    assert_eq!(
        outcome.audit.count(ActionKind::PageRasterizedAndRedacted),
        3
    );
    for entry in &outcome.audit.entries {
        assert!(entry.detail.contains("unredacted"), "{}", entry.detail);
    }
}

#[test]
fn failing_localizer_is_absorbed_per_page() {
    let pdf = build_pdf(&scan_pages(2), None);
    let options = RedactOptions::new()
        .with_localizer(Arc::new(BrokenLocalizer))
        .sequential();
    let outcome = redact_bytes(&pdf, ["confidential"], &options).unwrap();

    assert_eq!(
        outcome.audit.count(ActionKind::PageRasterizedAndRedacted),
        2
    );
    assert!(outcome.audit.entries[0].detail.contains("broken"));
}

#[test]
fn determinism_with_fixed_localizer() {
    let pdf = build_pdf(&scan_pages(2), None);
    let make_options = || {
        RedactOptions::new()
            .with_localizer(FixedLocalizer::reading(
                "CONFIDENTIAL",
                Region::new(150.0, 100.0, 450.0, 140.0),
            ))
            .sequential()
    };

    let first = redact_bytes(&pdf, ["confidential"], &make_options()).unwrap();
    let second = redact_bytes(&pdf, ["confidential"], &make_options()).unwrap();
    assert!(first.audit.same_shape(&second.audit));
}

#[test]
fn phrase_split_across_word_boxes_matches() {
    let pdf = build_pdf(&scan_pages(1), None);
    let localizer = Arc::new(FixedLocalizer {
        regions: vec![
            ("Jane".to_string(), Region::new(100.0, 100.0, 160.0, 124.0)),
            ("Doe".to_string(), Region::new(166.0, 100.0, 210.0, 124.0)),
        ],
    });

    let options = RedactOptions::new().with_localizer(localizer).sequential();
    let outcome = redact_bytes(&pdf, ["Jane Doe"], &options).unwrap();

    assert_eq!(
        outcome.audit.count(ActionKind::PageRasterizedAndRedacted),
        1
    );
}

#[test]
fn recurring_header_band_is_masked_as_logo() {
    // Every page carries the same dark letterhead band.
    let pages: Vec<PageSpec> = (0..3)
        .map(|_| PageSpec::scanned(ScanImage::blank(612, 792).with_header_band(0x20)))
        .collect();
    let pdf = build_pdf(&pages, None);

    let options = RedactOptions::new()
        .with_logos(true)
        .with_placeholders(true)
        .sequential();
    let outcome = redact_bytes(&pdf, ["no such phrase"], &options).unwrap();

    assert_eq!(outcome.audit.count(ActionKind::LogoRemoved), 3);
    assert_eq!(outcome.audit.count(ActionKind::PlaceholderInserted), 3);

    // Band pixels are no longer the original dark shade.
    let output_doc = SourceDocument::from_bytes(&outcome.output).unwrap();
    let page_id = *output_doc.pages().get(&1).unwrap();
    let bitmap = scrubpdf::raster::page_bitmap(output_doc.doc(), page_id, 612.0).unwrap();
    let top = bitmap.get_pixel(306, 10).0;
    assert_ne!(top, [0x20, 0x20, 0x20]);
}

#[test]
fn blank_pages_produce_no_phantom_logos() {
    let pdf = build_pdf(&scan_pages(3), None);
    let options = RedactOptions::new().with_logos(true).sequential();
    let outcome = redact_bytes(&pdf, ["no such phrase"], &options).unwrap();

    assert_eq!(outcome.audit.count(ActionKind::LogoRemoved), 0);
}
