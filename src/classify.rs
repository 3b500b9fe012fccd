//! Document-kind classification.
//!
//! Decides whether a document has a usable extractable text layer
//! (text-native) or is effectively a stack of page scans, which routes it to
//! the right redaction pipeline.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::extract::{self, DocumentImages};
use crate::source::SourceDocument;

/// The two document kinds the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Pages carry an extractable, positioned text layer.
    TextNative,
    /// Pages are full-page raster images with no reliable text layer.
    Scanned,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::TextNative => write!(f, "text-native"),
            DocumentKind::Scanned => write!(f, "scanned"),
        }
    }
}

/// Pages examined from the front of the document.
const LEAD_SAMPLE: u32 = 5;
/// Hard cap on sampled pages, so huge documents classify in bounded time.
const MAX_SAMPLE: usize = 12;
/// A page with fewer tokens than this (and an image) reads as scanned.
const MIN_TOKENS: usize = 10;
/// A page with fewer extracted characters than this (and an image) reads as
/// scanned.
const MIN_CHARS: usize = 50;
/// Mean token length below this suggests OCR shrapnel, not a text layer.
const MIN_AVG_TOKEN_LEN: f32 = 2.5;

/// Classify a document as text-native or scanned.
///
/// A representative sample of pages is examined (the first few plus evenly
/// strided interior pages) and the majority verdict wins. Hybrid documents
/// therefore classify by their dominant kind. Always returns a verdict for
/// a parseable document; a parse failure happens at load, never here.
pub fn classify(source: &SourceDocument) -> Result<DocumentKind> {
    let images = DocumentImages::collect(source.doc())?;
    classify_with_images(source, &images)
}

/// Classification with a pre-collected image index, so the dispatcher does
/// not enumerate images twice.
pub fn classify_with_images(
    source: &SourceDocument,
    images: &DocumentImages,
) -> Result<DocumentKind> {
    let page_count = source.page_count();
    if page_count == 0 {
        // Nothing to scan, nothing to rasterize; the text pipeline handles
        // an empty document trivially.
        return Ok(DocumentKind::TextNative);
    }

    let sample = sample_pages(page_count);
    let mut scanned_like = 0usize;

    for &page in &sample {
        if page_reads_as_scanned(source, images, page) {
            scanned_like += 1;
        }
    }

    log::debug!(
        "classify: {scanned_like}/{} sampled pages scanned-like (document has {page_count})",
        sample.len()
    );

    if scanned_like * 2 > sample.len() {
        Ok(DocumentKind::Scanned)
    } else {
        Ok(DocumentKind::TextNative)
    }
}

/// Pick the pages to examine: the first [`LEAD_SAMPLE`], then an even stride
/// across the interior, capped at [`MAX_SAMPLE`] total.
fn sample_pages(page_count: u32) -> Vec<u32> {
    let mut pages: Vec<u32> = (1..=page_count.min(LEAD_SAMPLE)).collect();

    if page_count > LEAD_SAMPLE {
        let remaining = (MAX_SAMPLE - pages.len()) as u32;
        let span = page_count - LEAD_SAMPLE;
        let stride = (span / (remaining + 1)).max(1);
        let mut page = LEAD_SAMPLE + stride;
        while page <= page_count && pages.len() < MAX_SAMPLE {
            pages.push(page);
            page += stride;
        }
    }

    pages
}

/// Per-page heuristic: an image-bearing page with almost no text (or with
/// text shattered into OCR-artifact fragments) reads as a scan.
fn page_reads_as_scanned(source: &SourceDocument, images: &DocumentImages, page: u32) -> bool {
    if !images.page_has_images(page) {
        return false;
    }

    let Ok(text) = extract::extract_page_text(source.doc(), page) else {
        // An image-bearing page whose content stream defeats the text walker
        // has no usable layer either.
        return true;
    };

    if text.tokens.len() < MIN_TOKENS || text.char_count() < MIN_CHARS {
        return true;
    }

    text.avg_token_len() < MIN_AVG_TOKEN_LEN
}
