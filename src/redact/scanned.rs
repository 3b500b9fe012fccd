//! The scanned-document redaction pipeline.
//!
//! A scanned page is pixel data; there is no text operator to strip. The
//! page bitmap is decoded, a text localizer proposes candidate regions,
//! matches are painted over directly, and the masked bitmap replaces the
//! page's imagery. A page whose rasterization or localization fails is left
//! unredacted and flagged in the audit log; partial protection beats
//! aborting the whole document.

use image::RgbImage;
use lopdf::{dictionary, Object, ObjectId};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::localize::TextRegion;
use crate::model::{tokenize_phrase, ActionKind, AuditLog, RedactionOutcome, Region, TargetSet};
use crate::raster::{
    self, band_region, Band, MASK_BLACK, MASK_PLACEHOLDER, MASK_WHITE,
};
use crate::redact::matcher::find_merged_matches;
use crate::redact::RedactOptions;
use crate::source::SourceDocument;

/// Mean fingerprint distance below which two bands count as the same
/// artwork. JPEG noise stays well under this; different content goes well
/// over.
const BAND_SIMILARITY: f32 = 12.0;

/// Maximum horizontal gap (pixels) when stitching word boxes into phrases,
/// as a fraction of page width.
const STITCH_GAP_FRACTION: f32 = 0.02;

/// Redact a scanned document.
pub fn redact_scanned(
    source: &SourceDocument,
    targets: &TargetSet,
    options: &RedactOptions,
) -> Result<RedactionOutcome> {
    let mut doc = source.clone_document();
    let mut audit = AuditLog::new();

    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
    let page_count = pages.len();

    // Stage 1: rasterize and localize. Read-only over the source, so pages
    // can fan out across workers; everything that mutates the document stays
    // on this thread.
    let prepared: Vec<PreparedPage> = if options.parallel {
        pages
            .par_iter()
            .map(|&(page, page_id)| prepare_page(source, options, page, page_id))
            .collect()
    } else {
        pages
            .iter()
            .map(|&(page, page_id)| prepare_page(source, options, page, page_id))
            .collect()
    };

    // Stage 1.5: find bands that recur across pages (letterhead artwork).
    let (header_pages, footer_pages) = if options.remove_logos {
        (
            recurring_band_pages(&prepared, Band::Header, options),
            recurring_band_pages(&prepared, Band::Footer, options),
        )
    } else {
        (Vec::new(), Vec::new())
    };

    // Stage 2: single-writer: mask and re-encode, in page order.
    for prepared_page in prepared {
        let page = prepared_page.page;
        let page_id = prepared_page.page_id;

        let mut raster = match prepared_page.raster {
            PageRaster::Unavailable(detail) => {
                audit.record(
                    page,
                    ActionKind::PageRasterizedAndRedacted,
                    format!("page left unredacted: {detail}"),
                );
                continue;
            }
            PageRaster::Ready(ready) => ready,
        };

        let mut masked = false;

        match raster.localize_failure.take() {
            Some(detail) => {
                audit.record(
                    page,
                    ActionKind::PageRasterizedAndRedacted,
                    format!("page left unredacted: {detail}"),
                );
            }
            None => {
                let stitch_gap = raster.bitmap.width() as f32 * STITCH_GAP_FRACTION;
                let tokens = pixel_tokens(&raster.regions, stitch_gap);
                let folded: Vec<&str> = tokens.iter().map(|(t, _)| t.as_str()).collect();

                for m in find_merged_matches(&folded, targets) {
                    let mut region = tokens[m.start].1;
                    for (_, r) in &tokens[m.start + 1..m.end] {
                        region = region.union(r);
                    }
                    raster::paint_region(&mut raster.bitmap, &region.expand(2.0), MASK_BLACK);
                    audit.record(page, ActionKind::PageRasterizedAndRedacted, m.detail());
                    masked = true;
                }
            }
        }

        for (band, recurring) in [(Band::Header, &header_pages), (Band::Footer, &footer_pages)] {
            if !recurring.contains(&page) {
                continue;
            }
            let region = band_region(&raster.bitmap, band, band_fraction(band, options));
            let color = if options.add_placeholders {
                MASK_PLACEHOLDER
            } else {
                MASK_WHITE
            };
            raster::paint_region(&mut raster.bitmap, &region, color);
            let name = match band {
                Band::Header => "header",
                Band::Footer => "footer",
            };
            audit.record(
                page,
                ActionKind::LogoRemoved,
                format!("recurring {name} band masked"),
            );
            if options.add_placeholders {
                audit.record(
                    page,
                    ActionKind::PlaceholderInserted,
                    format!("{name} band"),
                );
            }
            masked = true;
        }

        if masked {
            let dims = source.page_dimensions(page)?;
            replace_page_with_bitmap(&mut doc, page_id, dims, &raster.bitmap)?;
        }
        log::info!("processed scanned page {page}/{page_count}");
    }

    // Replaced pages leave their original scans unreferenced; drop them so
    // the masked content is not recoverable from orphan objects.
    doc.prune_objects();

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| Error::Serialize(e.to_string()))?;

    Ok(RedactionOutcome::new(output, audit))
}

/// Stage-1 result for one page.
struct PreparedPage {
    page: u32,
    page_id: ObjectId,
    raster: PageRaster,
}

enum PageRaster {
    /// No decodable page image; the page passes through untouched.
    Unavailable(String),
    Ready(ReadyPage),
}

struct ReadyPage {
    bitmap: RgbImage,
    regions: Vec<TextRegion>,
    localize_failure: Option<String>,
    header_fp: Vec<u8>,
    footer_fp: Vec<u8>,
}

fn prepare_page(
    source: &SourceDocument,
    options: &RedactOptions,
    page: u32,
    page_id: ObjectId,
) -> PreparedPage {
    let page_width = source
        .page_dimensions(page)
        .map(|(w, _)| w)
        .unwrap_or(612.0);

    let bitmap = match raster::page_bitmap(source.doc(), page_id, page_width) {
        Ok(bitmap) => bitmap,
        Err(e) => {
            return PreparedPage {
                page,
                page_id,
                raster: PageRaster::Unavailable(e.to_string()),
            }
        }
    };

    let (regions, localize_failure) = match &options.localizer {
        Some(localizer) if localizer.is_available() => match localizer.localize(&bitmap) {
            Ok(regions) => (regions, None),
            Err(e) => (Vec::new(), Some(format!("{} failed: {e}", localizer.name()))),
        },
        Some(localizer) => (
            Vec::new(),
            Some(format!("localizer {} unavailable", localizer.name())),
        ),
        None => (Vec::new(), Some("no text localizer configured".to_string())),
    };

    let header_fp = raster::band_fingerprint(&bitmap, Band::Header, band_fraction(Band::Header, options));
    let footer_fp = raster::band_fingerprint(&bitmap, Band::Footer, band_fraction(Band::Footer, options));

    PreparedPage {
        page,
        page_id,
        raster: PageRaster::Ready(ReadyPage {
            bitmap,
            regions,
            localize_failure,
            header_fp,
            footer_fp,
        }),
    }
}

fn band_fraction(band: Band, options: &RedactOptions) -> f32 {
    match band {
        Band::Header => options.logo_config.header_band,
        Band::Footer => options.logo_config.footer_band,
    }
}

/// Word boxes in reading order, tokenized for the matcher.
///
/// Each localized region contributes one token per word, all carrying the
/// region's box. Adjacent boxes on a baseline become adjacent tokens, which
/// is how a phrase split across word boxes still matches. `stitch_gap` is
/// accepted for parity with the merge utility but ordering alone suffices
/// here: the matcher sees one linear stream.
fn pixel_tokens(regions: &[TextRegion], stitch_gap: f32) -> Vec<(String, Region)> {
    let merged = crate::localize::merge_adjacent(regions.to_vec(), stitch_gap);

    let mut tokens = Vec::new();
    for region in &merged {
        for word in tokenize_phrase(&region.text) {
            tokens.push((word, region.region));
        }
    }
    tokens
}

/// Pages whose band fingerprint recurs on a majority of ready pages.
fn recurring_band_pages(
    prepared: &[PreparedPage],
    band: Band,
    options: &RedactOptions,
) -> Vec<u32> {
    let mut ready_count = 0usize;
    let fps: Vec<(u32, &Vec<u8>)> = prepared
        .iter()
        .filter_map(|p| match &p.raster {
            PageRaster::Ready(ready) => {
                ready_count += 1;
                let fp = match band {
                    Band::Header => &ready.header_fp,
                    Band::Footer => &ready.footer_fp,
                };
                // A near-blank band is paper, not artwork; masking it would
                // only pad the audit log with phantom logos.
                if fp.iter().all(|&cell| cell >= 240) {
                    None
                } else {
                    Some((p.page, fp))
                }
            }
            PageRaster::Unavailable(_) => None,
        })
        .collect();

    if fps.len() < 2 {
        return Vec::new();
    }

    // Anchor on the page with the most look-alikes, then take its cluster.
    let mut best_anchor = 0usize;
    let mut best_count = 0usize;
    for i in 0..fps.len() {
        let count = fps
            .iter()
            .filter(|(_, fp)| raster::fingerprint_distance(fps[i].1, fp) < BAND_SIMILARITY)
            .count();
        if count > best_count {
            best_count = count;
            best_anchor = i;
        }
    }

    let required = (ready_count as f32 * options.logo_config.recurrence_ratio).ceil() as usize;
    if best_count < required.max(2) {
        return Vec::new();
    }

    fps.iter()
        .filter(|(_, fp)| raster::fingerprint_distance(fps[best_anchor].1, fp) < BAND_SIMILARITY)
        .map(|(page, _)| *page)
        .collect()
}

/// Swap a page's content for a single full-page image XObject built from
/// the masked bitmap. Output pages stay image-only, consistent with the
/// input being a scan.
fn replace_page_with_bitmap(
    doc: &mut lopdf::Document,
    page_id: ObjectId,
    (page_width, page_height): (f32, f32),
    bitmap: &RgbImage,
) -> Result<()> {
    let encoded = raster::encode_rgb_flate(bitmap)?;

    let image_stream = lopdf::Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => bitmap.width() as i64,
            "Height" => bitmap.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        encoded,
    );
    let image_id = doc.add_object(Object::Stream(image_stream));

    {
        let page_dict = doc
            .get_object_mut(page_id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| Error::Serialize(e.to_string()))?;
        page_dict.set(
            "Resources",
            dictionary! {
                "XObject" => dictionary! { "Im0" => Object::Reference(image_id) },
            },
        );
    }

    let content = lopdf::content::Content {
        operations: vec![
            lopdf::content::Operation::new("q", vec![]),
            lopdf::content::Operation::new(
                "cm",
                vec![
                    Object::Real(page_width),
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(page_height),
                    Object::Real(0.0),
                    Object::Real(0.0),
                ],
            ),
            lopdf::content::Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            lopdf::content::Operation::new("Q", vec![]),
        ],
    };
    let encoded_content = content
        .encode()
        .map_err(|e| Error::Serialize(e.to_string()))?;
    crate::redact::text_native::set_page_content(doc, page_id, encoded_content)?;

    Ok(())
}
