//! Page bitmaps for the scanned pipeline.
//!
//! A scanned page is, in practice, one full-page image XObject. This module
//! decodes that image into an `RgbImage`, caps its resolution, paints mask
//! rectangles, fingerprints header/footer bands for recurring-logo
//! detection, and re-encodes redacted bitmaps as FlateDecode streams.

use image::{imageops, GrayImage, RgbImage};
use lopdf::{Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};
use crate::extract::images::page_image_xobjects;
use crate::model::Region;

/// Resolution cap: localization gains little past this, and time is linear
/// in pixel count.
const MAX_DPI: f32 = 300.0;

/// An opaque black mask.
pub const MASK_BLACK: [u8; 3] = [0, 0, 0];
/// White, for erasing a band without a placeholder.
pub const MASK_WHITE: [u8; 3] = [255, 255, 255];
/// Light lavender placeholder tint (the visual "something was here" marker).
pub const MASK_PLACEHOLDER: [u8; 3] = [237, 231, 246];

/// Decode the page's dominant embedded image into an RGB bitmap, downscaled
/// to at most [`MAX_DPI`] relative to the page's physical width.
///
/// Returns `Error::Localization` when the page has no decodable image; the
/// scanned pipeline treats that as a per-page failure, not a fatal error.
pub fn page_bitmap(
    doc: &LopdfDocument,
    page_id: ObjectId,
    page_width_pts: f32,
) -> Result<RgbImage> {
    let images = page_image_xobjects(doc, page_id)?;

    let largest = images
        .values()
        .max_by_key(|info| info.px_width as u64 * info.px_height as u64)
        .ok_or_else(|| Error::Localization("page has no embedded image".to_string()))?;

    let Ok(Object::Stream(stream)) = doc.get_object(largest.object_id) else {
        return Err(Error::Localization("image stream unavailable".to_string()));
    };

    let bitmap = decode_image_stream(stream)
        .ok_or_else(|| Error::Localization("unsupported image encoding".to_string()))?;

    Ok(cap_resolution(bitmap, page_width_pts))
}

/// Decode an image XObject stream into RGB pixels.
///
/// DCTDecode payloads are JPEG files as-is; FlateDecode (or unfiltered)
/// payloads are raw samples interpreted through ColorSpace and
/// BitsPerComponent. Anything else is out of scope and yields `None`.
fn decode_image_stream(stream: &lopdf::Stream) -> Option<RgbImage> {
    let filter = primary_filter(stream);

    if filter.as_deref() == Some(b"DCTDecode") {
        return image::load_from_memory(&stream.content)
            .ok()
            .map(|img| img.to_rgb8());
    }

    // FlateDecode or no filter: raw samples.
    let data = stream.decompressed_content().ok()?;
    let width = dict_u32(stream, b"Width")?;
    let height = dict_u32(stream, b"Height")?;
    let bits = dict_u32(stream, b"BitsPerComponent").unwrap_or(8);
    if bits != 8 {
        return None;
    }

    let colorspace = stream
        .dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| o.as_name().ok().map(|n| n.to_vec()));

    let pixel_count = (width as usize) * (height as usize);
    match colorspace.as_deref() {
        Some(b"DeviceRGB") if data.len() >= pixel_count * 3 => {
            RgbImage::from_raw(width, height, data[..pixel_count * 3].to_vec())
        }
        Some(b"DeviceGray") if data.len() >= pixel_count => {
            let gray = GrayImage::from_raw(width, height, data[..pixel_count].to_vec())?;
            Some(image::DynamicImage::ImageLuma8(gray).to_rgb8())
        }
        _ => None,
    }
}

fn primary_filter(stream: &lopdf::Stream) -> Option<Vec<u8>> {
    match stream.dict.get(b"Filter").ok()? {
        Object::Name(name) => Some(name.clone()),
        Object::Array(arr) => arr
            .first()
            .and_then(|o| o.as_name().ok().map(|n| n.to_vec())),
        _ => None,
    }
}

fn dict_u32(stream: &lopdf::Stream, key: &[u8]) -> Option<u32> {
    stream
        .dict
        .get(key)
        .ok()
        .and_then(|o| o.as_i64().ok())
        .map(|v| v as u32)
}

/// Downscale a bitmap whose effective resolution exceeds [`MAX_DPI`].
fn cap_resolution(bitmap: RgbImage, page_width_pts: f32) -> RgbImage {
    if page_width_pts <= 0.0 {
        return bitmap;
    }
    let dpi = bitmap.width() as f32 / (page_width_pts / 72.0);
    if dpi <= MAX_DPI {
        return bitmap;
    }
    let scale = MAX_DPI / dpi;
    let new_w = ((bitmap.width() as f32 * scale).round() as u32).max(1);
    let new_h = ((bitmap.height() as f32 * scale).round() as u32).max(1);
    imageops::resize(&bitmap, new_w, new_h, imageops::FilterType::Triangle)
}

/// Paint an opaque rectangle over a pixel region.
pub fn paint_region(bitmap: &mut RgbImage, region: &Region, color: [u8; 3]) {
    let clamped = region.clamp(bitmap.width() as f32, bitmap.height() as f32);
    if clamped.is_empty() {
        return;
    }
    let x0 = clamped.x0.floor() as u32;
    let y0 = clamped.y0.floor() as u32;
    let x1 = (clamped.x1.ceil() as u32).min(bitmap.width());
    let y1 = (clamped.y1.ceil() as u32).min(bitmap.height());

    for y in y0..y1 {
        for x in x0..x1 {
            bitmap.put_pixel(x, y, image::Rgb(color));
        }
    }
}

/// Which horizontal band of the page to fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Header,
    Footer,
}

/// Fingerprint grid resolution.
const FP_COLS: u32 = 16;
const FP_ROWS: u32 = 4;

/// Pixel region covered by a band.
pub fn band_region(bitmap: &RgbImage, band: Band, fraction: f32) -> Region {
    let h = bitmap.height() as f32;
    let w = bitmap.width() as f32;
    let depth = (h * fraction).max(1.0);
    match band {
        Band::Header => Region::new(0.0, 0.0, w, depth),
        Band::Footer => Region::new(0.0, h - depth, w, h),
    }
}

/// A coarse grayscale grid over a band: cheap to compare across pages, and
/// stable under JPEG noise.
pub fn band_fingerprint(bitmap: &RgbImage, band: Band, fraction: f32) -> Vec<u8> {
    let region = band_region(bitmap, band, fraction);
    let cell_w = region.width() / FP_COLS as f32;
    let cell_h = region.height() / FP_ROWS as f32;

    let mut cells = Vec::with_capacity((FP_COLS * FP_ROWS) as usize);
    for row in 0..FP_ROWS {
        for col in 0..FP_COLS {
            let x0 = (region.x0 + col as f32 * cell_w) as u32;
            let y0 = (region.y0 + row as f32 * cell_h) as u32;
            let x1 = ((region.x0 + (col + 1) as f32 * cell_w) as u32).min(bitmap.width());
            let y1 = ((region.y0 + (row + 1) as f32 * cell_h) as u32).min(bitmap.height());

            let mut sum = 0u64;
            let mut count = 0u64;
            for y in y0..y1 {
                for x in x0..x1 {
                    let p = bitmap.get_pixel(x, y).0;
                    sum += (p[0] as u64 + p[1] as u64 + p[2] as u64) / 3;
                    count += 1;
                }
            }
            cells.push(if count > 0 { (sum / count) as u8 } else { 255 });
        }
    }
    cells
}

/// Mean absolute difference between two fingerprints (0 = identical).
pub fn fingerprint_distance(a: &[u8], b: &[u8]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return f32::MAX;
    }
    let total: u32 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| (x as i32 - y as i32).unsigned_abs())
        .sum();
    total as f32 / a.len() as f32
}

/// Re-encode a bitmap as raw RGB behind FlateDecode, ready to become an
/// image XObject stream.
pub fn encode_rgb_flate(bitmap: &RgbImage) -> Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bitmap.as_raw())
        .map_err(|e| Error::Serialize(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| Error::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, image::Rgb(color))
    }

    #[test]
    fn test_paint_region_clamps() {
        let mut img = solid(100, 100, MASK_WHITE);
        paint_region(
            &mut img,
            &Region::new(-10.0, -10.0, 50.0, 50.0),
            MASK_BLACK,
        );
        assert_eq!(img.get_pixel(0, 0).0, MASK_BLACK);
        assert_eq!(img.get_pixel(49, 49).0, MASK_BLACK);
        assert_eq!(img.get_pixel(50, 50).0, MASK_WHITE);
    }

    #[test]
    fn test_band_region() {
        let img = solid(200, 100, MASK_WHITE);
        let header = band_region(&img, Band::Header, 0.2);
        assert_eq!(header, Region::new(0.0, 0.0, 200.0, 20.0));
        let footer = band_region(&img, Band::Footer, 0.1);
        assert_eq!(footer, Region::new(0.0, 90.0, 200.0, 100.0));
    }

    #[test]
    fn test_fingerprint_identical_bands() {
        let a = solid(160, 80, [200, 200, 200]);
        let b = solid(160, 80, [200, 200, 200]);
        let fa = band_fingerprint(&a, Band::Header, 0.2);
        let fb = band_fingerprint(&b, Band::Header, 0.2);
        assert_eq!(fingerprint_distance(&fa, &fb), 0.0);
    }

    #[test]
    fn test_fingerprint_detects_difference() {
        let a = solid(160, 80, MASK_WHITE);
        let mut b = solid(160, 80, MASK_WHITE);
        paint_region(&mut b, &Region::new(0.0, 0.0, 160.0, 16.0), MASK_BLACK);
        let fa = band_fingerprint(&a, Band::Header, 0.2);
        let fb = band_fingerprint(&b, Band::Header, 0.2);
        assert!(fingerprint_distance(&fa, &fb) > 50.0);
    }

    #[test]
    fn test_cap_resolution_downscales() {
        // 2550 px across an 8.5in page is 300 DPI; 5100 is 600 and must halve
        let img = solid(5100, 100, MASK_WHITE);
        let capped = cap_resolution(img, 612.0);
        assert_eq!(capped.width(), 2550);

        let img = solid(1275, 100, MASK_WHITE);
        let untouched = cap_resolution(img, 612.0);
        assert_eq!(untouched.width(), 1275);
    }

    #[test]
    fn test_encode_rgb_flate_roundtrip() {
        use flate2::read::ZlibDecoder;
        use std::io::Read;

        let img = solid(4, 4, [10, 20, 30]);
        let encoded = encode_rgb_flate(&img).unwrap();

        let mut decoder = ZlibDecoder::new(&encoded[..]);
        let mut raw = Vec::new();
        decoder.read_to_end(&mut raw).unwrap();
        assert_eq!(raw.len(), 4 * 4 * 3);
        assert_eq!(&raw[..3], &[10, 20, 30]);
    }
}
