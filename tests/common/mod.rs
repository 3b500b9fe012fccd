//! Synthetic PDF fixtures for integration tests.
//!
//! Documents are built object-by-object with lopdf so every test controls
//! exactly what the content streams contain: Helvetica text lines, a shared
//! header image, or a full-page grayscale "scan".
#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use std::io::Write;

/// A full-page grayscale image standing in for a scanned page.
#[derive(Clone, Copy)]
pub struct ScanImage {
    pub width_px: u32,
    pub height_px: u32,
    /// Body gray level (0xFF = blank paper)
    pub body_shade: u8,
    /// Distinct shade for the top 10% of rows, for letterhead-band tests
    pub header_shade: Option<u8>,
}

impl ScanImage {
    pub fn blank(width_px: u32, height_px: u32) -> Self {
        Self {
            width_px,
            height_px,
            body_shade: 0xFF,
            header_shade: None,
        }
    }

    pub fn with_header_band(mut self, shade: u8) -> Self {
        self.header_shade = Some(shade);
        self
    }
}

/// One page of a fixture document.
#[derive(Clone, Default)]
pub struct PageSpec {
    /// Text lines, drawn top-down from y=720 in 12pt Helvetica
    pub lines: Vec<String>,
    /// Draw the shared 60x20 header image at the top of the page
    pub header_image: bool,
    /// Replace the page body with a full-page scan image
    pub scan: Option<ScanImage>,
}

impl PageSpec {
    pub fn text(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_header_image(mut self) -> Self {
        self.header_image = true;
        self
    }

    pub fn scanned(scan: ScanImage) -> Self {
        Self {
            scan: Some(scan),
            ..Default::default()
        }
    }
}

/// Enough text that a page never misclassifies as scanned.
pub fn filler_lines() -> Vec<&'static str> {
    vec![
        "This quarterly report covers operational results and staffing",
        "figures across every regional office during the second quarter",
        "including revenue, headcount, and facility utilization metrics",
    ]
}

/// Build a PDF from page specs, optionally with an Info dictionary title.
pub fn build_pdf(pages: &[PageSpec], info_title: Option<&str>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    // One shared payload: the same "logo" asset reused across pages.
    let header_image_id = if pages.iter().any(|p| p.header_image) {
        Some(doc.add_object(Object::Stream(gray_image_stream(60, 20, 0x40, None))))
    } else {
        None
    };

    let mut kids: Vec<Object> = Vec::new();
    for spec in pages {
        let mut ops: Vec<Operation> = Vec::new();
        let mut xobjects = lopdf::Dictionary::new();

        if let Some(scan) = &spec.scan {
            let image_id = doc.add_object(Object::Stream(gray_image_stream(
                scan.width_px,
                scan.height_px,
                scan.body_shade,
                scan.header_shade,
            )));
            xobjects.set("P0", Object::Reference(image_id));
            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new(
                "cm",
                vec![
                    612.into(),
                    0.into(),
                    0.into(),
                    792.into(),
                    0.into(),
                    0.into(),
                ],
            ));
            ops.push(Operation::new("Do", vec![Object::Name(b"P0".to_vec())]));
            ops.push(Operation::new("Q", vec![]));
        }

        if spec.header_image {
            let image_id = header_image_id.expect("header image payload exists");
            xobjects.set("Hdr", Object::Reference(image_id));
            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new(
                "cm",
                vec![
                    120.into(),
                    0.into(),
                    0.into(),
                    40.into(),
                    72.into(),
                    740.into(),
                ],
            ));
            ops.push(Operation::new("Do", vec![Object::Name(b"Hdr".to_vec())]));
            ops.push(Operation::new("Q", vec![]));
        }

        if !spec.lines.is_empty() {
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), 12.into()],
            ));
            let mut y = 720.0_f32;
            for line in &spec.lines {
                ops.push(Operation::new(
                    "Tm",
                    vec![
                        1.into(),
                        0.into(),
                        0.into(),
                        1.into(),
                        Object::Real(72.0),
                        Object::Real(y),
                    ],
                ));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(line.as_bytes().to_vec(), StringFormat::Literal)],
                ));
                y -= 20.0;
            }
            ops.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations: ops };
        let content_id = doc.add_object(Stream::new(
            lopdf::Dictionary::new(),
            content.encode().expect("encode fixture content"),
        ));

        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
        };
        if xobjects.iter().next().is_some() {
            resources.set("XObject", xobjects);
        }

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(title) = info_title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::String(title.as_bytes().to_vec(), StringFormat::Literal),
            "Producer" => Object::String(b"fixture".to_vec(), StringFormat::Literal),
        });
        doc.trailer.set("Info", info_id);
    }

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("serialize fixture");
    out
}

/// A DeviceGray FlateDecode image stream.
fn gray_image_stream(
    width_px: u32,
    height_px: u32,
    body_shade: u8,
    header_shade: Option<u8>,
) -> Stream {
    let header_rows = height_px / 10;
    let mut raw = Vec::with_capacity((width_px * height_px) as usize);
    for row in 0..height_px {
        let shade = match header_shade {
            Some(s) if row < header_rows => s,
            _ => body_shade,
        };
        raw.extend(std::iter::repeat(shade).take(width_px as usize));
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw).expect("deflate fixture image");
    let deflated = encoder.finish().expect("deflate fixture image");

    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width_px as i64,
            "Height" => height_px as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        deflated,
    )
}

/// Lowercased extracted text of every page of a serialized PDF.
pub fn extracted_text(pdf: &[u8]) -> String {
    let source = scrubpdf::SourceDocument::from_bytes(pdf).expect("parse output");
    let mut all = String::new();
    for page in 1..=source.page_count() {
        if let Ok(text) = source.page_text(page) {
            all.push_str(&text.to_lowercase());
            all.push('\n');
        }
    }
    all
}
