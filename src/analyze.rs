//! Document quality analysis.
//!
//! Scores an input before redaction so an operator knows what to expect:
//! a low text score usually means the document will route to the scanned
//! pipeline, and low image resolution degrades localization accuracy there.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::extract::DocumentImages;
use crate::source::SourceDocument;

/// Pages sampled for text and structure signals.
const SAMPLE_PAGES: u32 = 10;
/// A page with more extracted characters than this counts as searchable.
const SEARCHABLE_CHARS: usize = 50;
/// An image with a dimension beyond this counts as high-resolution.
const HIGH_RES_PX: u32 = 1000;

/// Quality scores on a 0–5 scale, plus an overall weighted score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Text extraction quality
    pub text_quality: u8,
    /// Embedded image resolution quality
    pub image_quality: u8,
    /// Document structure quality (outline, metadata, page consistency)
    pub structure_quality: u8,
    /// Weighted overall score
    pub overall: u8,
    /// Human-readable notes on low axes
    pub notes: Vec<String>,
}

/// Analyze a document's quality over a bounded page sample.
pub fn analyze(source: &SourceDocument) -> Result<QualityReport> {
    let mut notes = Vec::new();
    let page_count = source.page_count();
    let sampled = page_count.min(SAMPLE_PAGES);

    // Text: fraction of sampled pages with meaningful extractable text.
    let mut searchable = 0u32;
    for page in 1..=sampled {
        if let Ok(text) = source.page_text(page) {
            if text.trim().chars().count() > SEARCHABLE_CHARS {
                searchable += 1;
            }
        }
    }
    let text_quality = if sampled == 0 {
        0
    } else {
        bucket(searchable as f32 / sampled as f32)
    };
    if text_quality <= 2 {
        notes.push(
            "Low text extraction quality; the document may be scanned or carry text as images"
                .to_string(),
        );
    }

    // Images: fraction of distinct assets at high resolution.
    let images = DocumentImages::collect(source.doc())?;
    let image_quality = if images.is_empty() {
        // No images to judge: neutral midpoint.
        3
    } else {
        let high_res = images
            .assets()
            .iter()
            .filter(|a| a.px_width > HIGH_RES_PX || a.px_height > HIGH_RES_PX)
            .count();
        let quality = bucket(high_res as f32 / images.assets().len() as f32);
        if quality <= 2 {
            notes.push("Low image resolution; scans may localize text poorly".to_string());
        }
        quality
    };

    // Structure: outline, metadata, consistent page geometry.
    let mut structure: i8 = 0;
    if source.has_outline() {
        structure += 2;
    }
    if source.has_info_metadata() {
        structure += 1;
    }
    let mut sizes: Vec<(u32, u32)> = Vec::new();
    for page in 1..=sampled {
        if let Ok((w, h)) = source.page_dimensions(page) {
            let key = (w.round() as u32, h.round() as u32);
            if !sizes.contains(&key) {
                sizes.push(key);
            }
        }
    }
    if sizes.len() <= 1 {
        structure += 2;
    } else {
        structure = (structure - 1).max(0);
    }
    let structure_quality = structure.clamp(0, 5) as u8;
    if structure_quality <= 2 {
        notes.push(
            "Low structure quality; the document lacks bookmarks, metadata, or consistent page sizes"
                .to_string(),
        );
    }

    let overall = (text_quality as f32 * 0.5
        + image_quality as f32 * 0.3
        + structure_quality as f32 * 0.2)
        .round() as u8;

    Ok(QualityReport {
        text_quality,
        image_quality,
        structure_quality,
        overall,
        notes,
    })
}

/// Map a 0..1 ratio to the 0–5 score buckets.
fn bucket(ratio: f32) -> u8 {
    if ratio > 0.9 {
        5
    } else if ratio > 0.7 {
        4
    } else if ratio > 0.5 {
        3
    } else if ratio > 0.3 {
        2
    } else if ratio > 0.1 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(bucket(1.0), 5);
        assert_eq!(bucket(0.91), 5);
        assert_eq!(bucket(0.8), 4);
        assert_eq!(bucket(0.6), 3);
        assert_eq!(bucket(0.4), 2);
        assert_eq!(bucket(0.2), 1);
        assert_eq!(bucket(0.05), 0);
        assert_eq!(bucket(0.0), 0);
    }
}
