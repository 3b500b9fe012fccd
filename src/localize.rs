//! Text localization over page bitmaps.
//!
//! The scanned pipeline has no content-stream text to strip; it needs some
//! engine to point at pixels and say "this box reads CONFIDENTIAL". That
//! engine lives behind [`TextLocalizer`] so the pipeline stays testable and
//! the OCR dependency stays optional.
//!
//! Localization is best-effort by contract: an empty result means "nothing
//! found", never "nothing there". Downstream matching must treat a miss as
//! a residual risk, not a guarantee.

use image::RgbImage;

use crate::error::Result;
use crate::model::Region;

/// A candidate text region: decoded string plus pixel bounding box.
#[derive(Debug, Clone)]
pub struct TextRegion {
    /// Decoded text (confidence-free; hallucinations are acceptable)
    pub text: String,
    /// Bounding box in bitmap pixel coordinates (origin top-left)
    pub region: Region,
}

impl TextRegion {
    pub fn new(text: impl Into<String>, region: Region) -> Self {
        Self {
            text: text.into(),
            region,
        }
    }
}

/// A pluggable text-localization engine.
pub trait TextLocalizer: Send + Sync {
    /// Engine name for logs and audit failure details.
    fn name(&self) -> &str;

    /// Whether the engine can run in this process/environment.
    fn is_available(&self) -> bool {
        true
    }

    /// Locate candidate text regions on a page bitmap.
    ///
    /// Errors are per-page: the scanned pipeline records them in the audit
    /// log and leaves the page unredacted rather than aborting the call.
    fn localize(&self, bitmap: &RgbImage) -> Result<Vec<TextRegion>>;
}

/// Merge regions that sit on one baseline into phrases.
///
/// Localizers tend to emit word-level boxes; a multi-word target split
/// across adjacent boxes would never match without stitching them back
/// together. Two regions merge when their vertical overlap is substantial
/// and the horizontal gap is under `max_gap` pixels.
pub fn merge_adjacent(mut regions: Vec<TextRegion>, max_gap: f32) -> Vec<TextRegion> {
    if regions.len() < 2 {
        return regions;
    }

    // Row-major order: top to bottom, then left to right.
    regions.sort_by(|a, b| {
        let ay = a.region.y0;
        let by = b.region.y0;
        ay.partial_cmp(&by)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.region
                    .x0
                    .partial_cmp(&b.region.x0)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    let mut merged: Vec<TextRegion> = Vec::with_capacity(regions.len());
    for region in regions {
        match merged.last_mut() {
            Some(last) if same_baseline(&last.region, &region.region, max_gap) => {
                last.text.push(' ');
                last.text.push_str(&region.text);
                last.region = last.region.union(&region.region);
            }
            _ => merged.push(region),
        }
    }
    merged
}

fn same_baseline(a: &Region, b: &Region, max_gap: f32) -> bool {
    let overlap = a.y1.min(b.y1) - a.y0.max(b.y0);
    let min_height = a.height().min(b.height());
    if min_height <= 0.0 || overlap < min_height * 0.5 {
        return false;
    }
    let gap = b.x0 - a.x1;
    (-max_gap..=max_gap).contains(&gap)
}

/// Tesseract-backed localizer.
#[cfg(feature = "ocr-tesseract")]
pub mod tesseract_localizer {
    use super::*;
    use crate::error::Error;

    /// Localizer backed by the system Tesseract installation.
    pub struct TesseractLocalizer {
        language: String,
    }

    impl TesseractLocalizer {
        pub fn new(language: impl Into<String>) -> Self {
            Self {
                language: language.into(),
            }
        }
    }

    impl Default for TesseractLocalizer {
        fn default() -> Self {
            Self::new("eng")
        }
    }

    impl TextLocalizer for TesseractLocalizer {
        fn name(&self) -> &str {
            "tesseract"
        }

        fn localize(&self, bitmap: &RgbImage) -> Result<Vec<TextRegion>> {
            let mut png = Vec::new();
            image::DynamicImage::ImageRgb8(bitmap.clone())
                .write_to(
                    &mut std::io::Cursor::new(&mut png),
                    image::ImageFormat::Png,
                )
                .map_err(|e| Error::Localization(e.to_string()))?;

            let mut api = tesseract::Tesseract::new(None, Some(&self.language))
                .map_err(|e| Error::Localization(e.to_string()))?
                .set_image_from_mem(&png)
                .map_err(|e| Error::Localization(e.to_string()))?;

            let tsv = api
                .get_tsv_text(0)
                .map_err(|e| Error::Localization(e.to_string()))?;

            Ok(parse_tsv(&tsv))
        }
    }

    /// Parse Tesseract TSV output into word-level regions.
    fn parse_tsv(tsv: &str) -> Vec<TextRegion> {
        let mut regions = Vec::new();
        for line in tsv.lines() {
            let cols: Vec<&str> = line.split('\t').collect();
            // level page block par line word left top width height conf text
            if cols.len() < 12 || cols[0] != "5" {
                continue;
            }
            let text = cols[11].trim();
            if text.is_empty() {
                continue;
            }
            let (Ok(left), Ok(top), Ok(width), Ok(height)) = (
                cols[6].parse::<f32>(),
                cols[7].parse::<f32>(),
                cols[8].parse::<f32>(),
                cols[9].parse::<f32>(),
            ) else {
                continue;
            };
            regions.push(TextRegion::new(
                text,
                Region::new(left, top, left + width, top + height),
            ));
        }
        regions
    }
}

#[cfg(feature = "ocr-tesseract")]
pub use tesseract_localizer::TesseractLocalizer;
