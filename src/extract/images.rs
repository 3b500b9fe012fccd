//! Embedded image discovery.
//!
//! Enumerates image XObjects per page, identifies payloads by digest so the
//! same logo asset reused document-wide resolves to one identity, and tracks
//! the graphics CTM through the content stream to recover where each image
//! lands on the page.

use std::collections::BTreeMap;

use lopdf::{Document as LopdfDocument, Object, ObjectId};
use md5::{Digest as _, Md5};

use crate::error::{Error, Result};
use crate::extract::spans::get_number;
use crate::model::Region;

/// Payload identity: MD5 of the raw image stream bytes.
pub type PayloadDigest = [u8; 16];

/// Short hex form for audit details.
pub fn digest_hex(digest: &PayloadDigest) -> String {
    digest[..4].iter().map(|b| format!("{b:02x}")).collect()
}

/// One drawn occurrence of an image on a page.
#[derive(Debug, Clone)]
pub struct Placement {
    /// Page number (1-indexed)
    pub page: u32,
    /// XObject resource name used on that page
    pub name: Vec<u8>,
    /// Placement bounding region in page coordinates
    pub region: Region,
}

/// A distinct embedded image payload and everywhere it appears.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub digest: PayloadDigest,
    /// Object id of the image stream
    pub object_id: ObjectId,
    /// Pixel dimensions from the image dictionary
    pub px_width: u32,
    pub px_height: u32,
    /// Drawn occurrences, page order
    pub placements: Vec<Placement>,
    /// Pages whose resources reference the payload (drawn or not)
    pub referencing_pages: Vec<u32>,
}

impl ImageAsset {
    /// Fraction of the document's pages that reference this payload.
    pub fn recurrence(&self, page_count: u32) -> f32 {
        if page_count == 0 {
            return 0.0;
        }
        self.referencing_pages.len() as f32 / page_count as f32
    }
}

/// All distinct image assets in a document.
#[derive(Debug, Clone, Default)]
pub struct DocumentImages {
    assets: Vec<ImageAsset>,
}

impl DocumentImages {
    /// Discover every image asset in the document.
    ///
    /// Assets come back sorted by digest so downstream iteration (and the
    /// audit log built from it) is deterministic.
    pub fn collect(doc: &LopdfDocument) -> Result<Self> {
        let mut by_digest: BTreeMap<PayloadDigest, ImageAsset> = BTreeMap::new();

        for (page_num, page_id) in doc.get_pages() {
            let images = page_image_xobjects(doc, page_id)?;
            if images.is_empty() {
                continue;
            }

            for info in images.values() {
                let asset = by_digest.entry(info.digest).or_insert_with(|| ImageAsset {
                    digest: info.digest,
                    object_id: info.object_id,
                    px_width: info.px_width,
                    px_height: info.px_height,
                    placements: Vec::new(),
                    referencing_pages: Vec::new(),
                });
                if asset.referencing_pages.last() != Some(&page_num) {
                    asset.referencing_pages.push(page_num);
                }
            }

            for placement in drawn_placements(doc, page_id, page_num, &images)? {
                let digest = images
                    .get(&placement.name)
                    .map(|i| i.digest)
                    .expect("placement name resolved from the same map");
                if let Some(asset) = by_digest.get_mut(&digest) {
                    asset.placements.push(placement);
                }
            }
        }

        Ok(Self {
            assets: by_digest.into_values().collect(),
        })
    }

    pub fn assets(&self) -> &[ImageAsset] {
        &self.assets
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Whether a page references any image asset.
    pub fn page_has_images(&self, page: u32) -> bool {
        self.assets
            .iter()
            .any(|a| a.referencing_pages.contains(&page))
    }
}

/// Per-page image XObject info keyed by resource name.
#[derive(Debug, Clone, Copy)]
pub struct XObjectInfo {
    pub object_id: ObjectId,
    pub digest: PayloadDigest,
    pub px_width: u32,
    pub px_height: u32,
}

/// Resolve a page's image XObjects: resource name → stream info.
pub fn page_image_xobjects(
    doc: &LopdfDocument,
    page_id: ObjectId,
) -> Result<BTreeMap<Vec<u8>, XObjectInfo>> {
    let mut images = BTreeMap::new();

    let Some(xobjects) = xobject_dict(doc, page_id) else {
        return Ok(images);
    };

    for (name, value) in xobjects.iter() {
        let Ok(object_id) = value.as_reference() else {
            continue;
        };
        let Ok(Object::Stream(stream)) = doc.get_object(object_id) else {
            continue;
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| n == b"Image")
            .unwrap_or(false);
        if !is_image {
            continue;
        }

        let px_width = stream
            .dict
            .get(b"Width")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0) as u32;
        let px_height = stream
            .dict
            .get(b"Height")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0) as u32;

        let mut hasher = Md5::new();
        hasher.update(&stream.content);
        let digest: PayloadDigest = hasher.finalize().into();

        images.insert(
            name.clone(),
            XObjectInfo {
                object_id,
                digest,
                px_width,
                px_height,
            },
        );
    }

    Ok(images)
}

/// Find the page's XObject resource dictionary, following the Parent chain
/// for inherited resources.
fn xobject_dict(doc: &LopdfDocument, page_id: ObjectId) -> Option<lopdf::Dictionary> {
    let mut current = page_id;
    for _ in 0..8 {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(resources) = dict.get(b"Resources") {
            let resources = resolve_dict(doc, resources)?;
            if let Ok(xobjects) = resources.get(b"XObject") {
                return resolve_dict(doc, xobjects).cloned();
            }
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

fn resolve_dict<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a lopdf::Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d),
        Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_dict().ok()),
        _ => None,
    }
}

/// Walk the content stream tracking the CTM to find where named images are
/// drawn.
fn drawn_placements(
    doc: &LopdfDocument,
    page_id: ObjectId,
    page_num: u32,
    images: &BTreeMap<Vec<u8>, XObjectInfo>,
) -> Result<Vec<Placement>> {
    let content = crate::extract::spans::page_content_bytes(doc, page_id)?;
    let operations = lopdf::content::Content::decode(&content)
        .map_err(|e| Error::Parse(e.to_string()))?
        .operations;

    let mut placements = Vec::new();
    let mut ctm = Mat::identity();
    let mut stack: Vec<Mat> = Vec::new();

    for op in &operations {
        match op.operator.as_str() {
            "q" => stack.push(ctm),
            "Q" => {
                if let Some(m) = stack.pop() {
                    ctm = m;
                }
            }
            "cm" => {
                if op.operands.len() >= 6 {
                    let m = Mat {
                        a: get_number(&op.operands[0]).unwrap_or(1.0),
                        b: get_number(&op.operands[1]).unwrap_or(0.0),
                        c: get_number(&op.operands[2]).unwrap_or(0.0),
                        d: get_number(&op.operands[3]).unwrap_or(1.0),
                        e: get_number(&op.operands[4]).unwrap_or(0.0),
                        f: get_number(&op.operands[5]).unwrap_or(0.0),
                    };
                    ctm = m.then(&ctm);
                }
            }
            "Do" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    if images.contains_key(name.as_slice()) {
                        placements.push(Placement {
                            page: page_num,
                            name: name.clone(),
                            region: ctm.unit_square_bbox(),
                        });
                    }
                }
            }
            _ => {}
        }
    }

    Ok(placements)
}

/// A 2D affine transform (PDF matrix layout `[a b c d e f]`).
#[derive(Debug, Clone, Copy)]
struct Mat {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Mat {
    fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// `self` applied first, then `other` (PDF concatenation order).
    fn then(&self, other: &Mat) -> Mat {
        Mat {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Images are drawn into the unit square; its transformed bbox is the
    /// placement region.
    fn unit_square_bbox(&self) -> Region {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(1.0, 0.0),
            self.apply(0.0, 1.0),
            self.apply(1.0, 1.0),
        ];
        let mut x0 = f32::MAX;
        let mut y0 = f32::MAX;
        let mut x1 = f32::MIN;
        let mut y1 = f32::MIN;
        for (x, y) in corners {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        Region::new(x0, y0, x1, y1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_hex() {
        let digest: PayloadDigest = [
            0x1a, 0x2b, 0x3c, 0x4d, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        assert_eq!(digest_hex(&digest), "1a2b3c4d");
    }

    #[test]
    fn test_mat_translation_scale() {
        // 100x50 image placed at (30, 700)
        let m = Mat {
            a: 100.0,
            b: 0.0,
            c: 0.0,
            d: 50.0,
            e: 30.0,
            f: 700.0,
        };
        let bbox = m.unit_square_bbox();
        assert_eq!(bbox, Region::new(30.0, 700.0, 130.0, 750.0));
    }

    #[test]
    fn test_mat_concatenation() {
        let scale = Mat {
            a: 2.0,
            b: 0.0,
            c: 0.0,
            d: 2.0,
            e: 0.0,
            f: 0.0,
        };
        let translate = Mat {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 10.0,
            f: 20.0,
        };
        // Scale, then translate
        let m = scale.then(&translate);
        assert_eq!(m.apply(1.0, 1.0), (12.0, 22.0));
    }

    #[test]
    fn test_recurrence() {
        let asset = ImageAsset {
            digest: [0; 16],
            object_id: (1, 0),
            px_width: 120,
            px_height: 40,
            placements: vec![],
            referencing_pages: vec![1, 2, 3],
        };
        assert!((asset.recurrence(5) - 0.6).abs() < f32::EPSILON);
        assert_eq!(asset.recurrence(0), 0.0);
    }
}
