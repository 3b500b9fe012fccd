//! Logo detection heuristics.
//!
//! Flags embedded images as organizational branding rather than document
//! content. Tuned for precision over recall: erasing a chart or a photo is
//! worse than letting a logo slip through, so a verdict needs either the
//! strong recurrence signal or both of the weaker positional ones.

use std::collections::HashMap;

use crate::extract::{ImageAsset, PayloadDigest};
use crate::model::Region;

/// Thresholds for the logo heuristics.
#[derive(Debug, Clone)]
pub struct LogoConfig {
    /// Fraction of pages an image must recur on to count as branding by
    /// repetition alone.
    pub recurrence_ratio: f32,
    /// Header band: top fraction of the page height.
    pub header_band: f32,
    /// Footer band: bottom fraction of the page height.
    pub footer_band: f32,
    /// Pixel dimension envelope for logo-sized artwork.
    pub min_px: u32,
    pub max_px: u32,
    /// Maximum placement area as a fraction of the page area; full-page
    /// scans and photographs sit well above this.
    pub max_area_ratio: f32,
}

impl LogoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recurrence_ratio(mut self, ratio: f32) -> Self {
        self.recurrence_ratio = ratio;
        self
    }

    pub fn with_header_band(mut self, fraction: f32) -> Self {
        self.header_band = fraction;
        self
    }

    pub fn with_footer_band(mut self, fraction: f32) -> Self {
        self.footer_band = fraction;
        self
    }

    pub fn with_px_envelope(mut self, min_px: u32, max_px: u32) -> Self {
        self.min_px = min_px;
        self.max_px = max_px;
        self
    }

    pub fn with_max_area_ratio(mut self, ratio: f32) -> Self {
        self.max_area_ratio = ratio;
        self
    }
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            recurrence_ratio: 0.5,
            header_band: 0.18,
            footer_band: 0.12,
            min_px: 16,
            max_px: 600,
            max_area_ratio: 0.2,
        }
    }
}

/// Page geometry the banding signal needs.
#[derive(Debug, Clone, Copy)]
pub struct PageContext {
    pub width: f32,
    pub height: f32,
}

/// Heuristic logo detector with a per-call verdict cache.
///
/// One instance is created per `redact` call and owns its cache; verdicts
/// are computed once per distinct payload digest no matter how many pages
/// reuse the asset. Never shared across calls.
pub struct LogoDetector {
    config: LogoConfig,
    page_count: u32,
    verdicts: HashMap<PayloadDigest, bool>,
}

impl LogoDetector {
    pub fn new(config: LogoConfig, page_count: u32) -> Self {
        Self {
            config,
            page_count,
            verdicts: HashMap::new(),
        }
    }

    /// Is this asset logo-like? Cached by payload digest.
    pub fn is_logo(&mut self, asset: &ImageAsset, page: &PageContext) -> bool {
        if let Some(&verdict) = self.verdicts.get(&asset.digest) {
            return verdict;
        }
        let verdict = self.evaluate(asset, page);
        self.verdicts.insert(asset.digest, verdict);
        verdict
    }

    fn evaluate(&self, asset: &ImageAsset, page: &PageContext) -> bool {
        // Recurrence across the document is the strongest discriminator:
        // letterheads and footers repeat, content imagery does not.
        if asset.recurrence(self.page_count) >= self.config.recurrence_ratio
            && asset.referencing_pages.len() > 1
        {
            return true;
        }

        if asset.placements.is_empty() {
            return false;
        }

        let banded = asset
            .placements
            .iter()
            .all(|p| self.in_band(&p.region, page));
        let in_envelope = self.size_in_envelope(asset, page);

        banded && in_envelope
    }

    /// Whether a placement sits in the header or footer band.
    fn in_band(&self, region: &Region, page: &PageContext) -> bool {
        // PDF Y grows upward: the header band is the top of the page.
        let header_floor = page.height * (1.0 - self.config.header_band);
        let footer_ceiling = page.height * self.config.footer_band;
        region.y0 >= header_floor || region.y1 <= footer_ceiling
    }

    fn size_in_envelope(&self, asset: &ImageAsset, page: &PageContext) -> bool {
        let dims_ok = asset.px_width >= self.config.min_px
            && asset.px_height >= self.config.min_px
            && asset.px_width <= self.config.max_px
            && asset.px_height <= self.config.max_px;
        if !dims_ok {
            return false;
        }

        let page_area = page.width * page.height;
        if page_area <= 0.0 {
            return false;
        }
        asset
            .placements
            .iter()
            .all(|p| p.region.area() / page_area <= self.config.max_area_ratio)
    }

    /// How many distinct assets have been evaluated so far.
    pub fn evaluated(&self) -> usize {
        self.verdicts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Placement;

    const PAGE: PageContext = PageContext {
        width: 612.0,
        height: 792.0,
    };

    fn asset(
        digest_byte: u8,
        px: (u32, u32),
        placements: Vec<(u32, Region)>,
        referencing_pages: Vec<u32>,
    ) -> ImageAsset {
        ImageAsset {
            digest: [digest_byte; 16],
            object_id: (9, 0),
            px_width: px.0,
            px_height: px.1,
            placements: placements
                .into_iter()
                .map(|(page, region)| Placement {
                    page,
                    name: b"Im1".to_vec(),
                    region,
                })
                .collect(),
            referencing_pages,
        }
    }

    fn header_region() -> Region {
        // 120x40 image near the top-left corner
        Region::new(36.0, 740.0, 156.0, 780.0)
    }

    #[test]
    fn test_recurring_image_is_logo() {
        // Center-page placement, but repeated on 3 of 5 pages
        let center = Region::new(200.0, 300.0, 320.0, 400.0);
        let a = asset(1, (200, 160), vec![(1, center)], vec![1, 2, 3]);
        let mut detector = LogoDetector::new(LogoConfig::default(), 5);
        assert!(detector.is_logo(&a, &PAGE));
    }

    #[test]
    fn test_single_header_image_is_logo() {
        let a = asset(2, (120, 40), vec![(1, header_region())], vec![1]);
        let mut detector = LogoDetector::new(LogoConfig::default(), 5);
        assert!(detector.is_logo(&a, &PAGE));
    }

    #[test]
    fn test_single_body_image_is_not_logo() {
        let body = Region::new(100.0, 300.0, 500.0, 600.0);
        let a = asset(3, (800, 600), vec![(1, body)], vec![1]);
        let mut detector = LogoDetector::new(LogoConfig::default(), 5);
        assert!(!detector.is_logo(&a, &PAGE));
    }

    #[test]
    fn test_full_page_scan_is_not_logo() {
        // A single full-page scan: no recurrence, fails banding and the
        // envelope.
        let full = Region::new(0.0, 0.0, 612.0, 792.0);
        let a = asset(4, (2550, 3300), vec![(1, full)], vec![1]);
        let mut detector = LogoDetector::new(LogoConfig::default(), 1);
        assert!(!detector.is_logo(&a, &PAGE));
    }

    #[test]
    fn test_verdict_cached_per_digest() {
        let a = asset(5, (120, 40), vec![(1, header_region())], vec![1]);
        let mut detector = LogoDetector::new(LogoConfig::default(), 5);
        assert!(detector.is_logo(&a, &PAGE));
        assert!(detector.is_logo(&a, &PAGE));
        assert_eq!(detector.evaluated(), 1);
    }

    #[test]
    fn test_config_builder() {
        let config = LogoConfig::new()
            .with_recurrence_ratio(0.8)
            .with_px_envelope(32, 256);
        assert_eq!(config.recurrence_ratio, 0.8);
        assert_eq!(config.min_px, 32);
        assert_eq!(config.max_px, 256);
    }
}
