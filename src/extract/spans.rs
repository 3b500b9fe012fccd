//! Positioned text extraction from content streams.
//!
//! Walks a page's decoded operations tracking the text matrix, and produces
//! spans that remember which operator drew them and how decoded characters
//! map back to operand bytes. That back-reference is what lets the redactor
//! cut the matched glyphs out of the stream instead of drawing over them.

use std::collections::BTreeMap;

use lopdf::{Document as LopdfDocument, Object};

use crate::error::{Error, Result};
use crate::model::{fold_token, Region};

/// Where one decoded character came from inside its operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharSrc {
    /// `len` operand bytes starting at `offset` within string element `elem`
    /// of the operator (element 0 for Tj / ' / ").
    Bytes { elem: usize, offset: usize, len: usize },
    /// A word space synthesized from a TJ kerning adjustment; no bytes.
    Synthetic,
}

/// A contiguous run of decoded text produced by one text-showing operator.
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// Decoded text
    pub text: String,
    /// X position of the baseline origin
    pub x: f32,
    /// Y position of the baseline
    pub y: f32,
    /// Effective font size in points
    pub font_size: f32,
    /// Index of the producing operator in the page's operation list
    pub op_index: usize,
    /// Per-character byte provenance; empty when `mappable` is false
    pub chars: Vec<CharSrc>,
    /// Whether characters map cleanly back to operand bytes. When false the
    /// redactor can only drop the whole operator.
    pub mappable: bool,
}

impl TextSpan {
    /// Estimated advance per character. Glyph metrics are not decoded here;
    /// half an em tracks typical Latin text closely enough for match boxes.
    pub fn char_advance(&self) -> f32 {
        self.font_size * 0.5
    }

    /// Bounding region of a character range within this span.
    pub fn char_region(&self, start: usize, end: usize) -> Region {
        let adv = self.char_advance();
        Region::new(
            self.x + start as f32 * adv,
            self.y - self.font_size * 0.2,
            self.x + end as f32 * adv,
            self.y + self.font_size * 0.8,
        )
    }

    /// Bounding region of the whole span.
    pub fn region(&self) -> Region {
        self.char_region(0, self.text.chars().count())
    }
}

/// One matchable token: a contiguous alphanumeric run within a span.
#[derive(Debug, Clone)]
pub struct Token {
    /// Folded (NFKC, lowercased) text used for matching
    pub folded: String,
    /// Index into [`PageText::spans`]
    pub span: usize,
    /// Character range within the span's decoded text
    pub char_start: usize,
    pub char_end: usize,
    /// Bounding region in page coordinates
    pub region: Region,
}

/// Everything extracted from one page's text layer.
#[derive(Debug, Clone)]
pub struct PageText {
    /// Page number (1-indexed)
    pub page: u32,
    /// Spans in content-stream order
    pub spans: Vec<TextSpan>,
    /// Tokens in reading order (top to bottom, left to right)
    pub tokens: Vec<Token>,
}

impl PageText {
    /// Total decoded characters across all spans.
    pub fn char_count(&self) -> usize {
        self.spans.iter().map(|s| s.text.chars().count()).sum()
    }

    /// Mean token length in characters; 0.0 for an empty page.
    pub fn avg_token_len(&self) -> f32 {
        if self.tokens.is_empty() {
            return 0.0;
        }
        let total: usize = self.tokens.iter().map(|t| t.folded.chars().count()).sum();
        total as f32 / self.tokens.len() as f32
    }
}

/// Extract positioned spans and reading-order tokens from one page.
pub fn extract_page_text(doc: &LopdfDocument, page_num: u32) -> Result<PageText> {
    let pages = doc.get_pages();
    let page_id = pages
        .get(&page_num)
        .ok_or(Error::PageOutOfRange(page_num, pages.len() as u32))?;

    let content = page_content_bytes(doc, *page_id)?;
    let operations = lopdf::content::Content::decode(&content)
        .map_err(|e| Error::Parse(e.to_string()))?
        .operations;

    let fonts = doc.get_page_fonts(*page_id).unwrap_or_default();
    let spans = walk_operations(doc, &operations, &fonts);
    let tokens = tokenize_spans(&spans);

    Ok(PageText {
        page: page_num,
        spans,
        tokens,
    })
}

/// Concatenated, decompressed content-stream bytes of a page.
///
/// Contents may be a single stream reference or an array of them; either
/// way the decoded operation list downstream sees one stream.
pub fn page_content_bytes(doc: &LopdfDocument, page_id: lopdf::ObjectId) -> Result<Vec<u8>> {
    let page_dict = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::Parse(e.to_string()))?;

    let contents = match page_dict.get(b"Contents") {
        Ok(contents) => contents,
        Err(_) => return Ok(Vec::new()),
    };

    match contents {
        Object::Reference(r) => {
            if let Ok(Object::Stream(s)) = doc.get_object(*r) {
                return s
                    .decompressed_content()
                    .map_err(|e| Error::Parse(e.to_string()));
            }
            Err(Error::Parse("Invalid content stream".to_string()))
        }
        Object::Array(arr) => {
            let mut content = Vec::new();
            for obj in arr {
                if let Object::Reference(r) = obj {
                    if let Ok(Object::Stream(s)) = doc.get_object(*r) {
                        if let Ok(data) = s.decompressed_content() {
                            content.extend_from_slice(&data);
                            content.push(b' ');
                        }
                    }
                }
            }
            Ok(content)
        }
        _ => Err(Error::Parse("Invalid content stream".to_string())),
    }
}

/// Walk a page's operations and collect text spans.
fn walk_operations(
    doc: &LopdfDocument,
    operations: &[lopdf::content::Operation],
    fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    let mut current_font_name: Vec<u8> = Vec::new();
    let mut current_font_size: f32 = 12.0;
    let mut text_matrix = TextMatrix::default();
    let mut in_text_block = false;

    for (op_index, op) in operations.iter().enumerate() {
        match op.operator.as_str() {
            "BT" => {
                in_text_block = true;
                text_matrix = TextMatrix::default();
            }
            "ET" => {
                in_text_block = false;
            }
            "Tf" => {
                if op.operands.len() >= 2 {
                    if let Object::Name(font_name) = &op.operands[0] {
                        current_font_name = font_name.clone();
                    }
                    current_font_size = get_number(&op.operands[1]).unwrap_or(12.0);
                }
            }
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                    text_matrix.translate(tx, ty);
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    text_matrix.set(
                        get_number(&op.operands[0]).unwrap_or(1.0),
                        get_number(&op.operands[1]).unwrap_or(0.0),
                        get_number(&op.operands[2]).unwrap_or(0.0),
                        get_number(&op.operands[3]).unwrap_or(1.0),
                        get_number(&op.operands[4]).unwrap_or(0.0),
                        get_number(&op.operands[5]).unwrap_or(0.0),
                    );
                }
            }
            "T*" => {
                text_matrix.next_line();
            }
            "Tj" | "TJ" => {
                if in_text_block {
                    let decoded = decode_show_op(doc, fonts, &current_font_name, op);
                    push_span(
                        &mut spans,
                        decoded,
                        &text_matrix,
                        current_font_size,
                        op_index,
                    );
                }
            }
            "'" | "\"" => {
                text_matrix.next_line();
                if in_text_block {
                    let decoded = decode_show_op(doc, fonts, &current_font_name, op);
                    push_span(
                        &mut spans,
                        decoded,
                        &text_matrix,
                        current_font_size,
                        op_index,
                    );
                }
            }
            _ => {}
        }
    }

    spans
}

fn push_span(
    spans: &mut Vec<TextSpan>,
    decoded: DecodedText,
    matrix: &TextMatrix,
    font_size: f32,
    op_index: usize,
) {
    if decoded.text.trim().is_empty() {
        return;
    }
    let (x, y) = matrix.position();
    spans.push(TextSpan {
        text: decoded.text,
        x,
        y,
        font_size: font_size * matrix.scale(),
        op_index,
        chars: decoded.chars,
        mappable: decoded.mappable,
    });
}

/// Decoded operator text plus per-character byte provenance.
struct DecodedText {
    text: String,
    chars: Vec<CharSrc>,
    mappable: bool,
}

/// Kerning adjustments beyond this many 1/1000 units read as a word space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Decode a Tj / TJ / ' / " operator into text with byte provenance.
fn decode_show_op(
    doc: &LopdfDocument,
    fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    font_name: &[u8],
    op: &lopdf::content::Operation,
) -> DecodedText {
    let encoding = fonts
        .get(font_name)
        .and_then(|f| f.get_font_encoding(doc).ok());

    let mut text = String::new();
    let mut chars: Vec<CharSrc> = Vec::new();
    let mut mappable = true;

    // The " operator carries (aw, ac, string); everything else has the
    // string or array first.
    let text_operand = if op.operator == "\"" {
        op.operands.get(2)
    } else {
        op.operands.first()
    };

    let decode = |bytes: &[u8]| -> String {
        match &encoding {
            Some(enc) => LopdfDocument::decode_text(enc, bytes)
                .unwrap_or_else(|_| decode_text_simple(bytes)),
            None => decode_text_simple(bytes),
        }
    };

    match text_operand {
        Some(Object::String(bytes, _)) => {
            map_element(&decode(bytes), bytes, 0, &mut text, &mut chars, &mut mappable);
        }
        Some(Object::Array(arr)) => {
            for (elem, item) in arr.iter().enumerate() {
                match item {
                    Object::String(bytes, _) => {
                        map_element(
                            &decode(bytes),
                            bytes,
                            elem,
                            &mut text,
                            &mut chars,
                            &mut mappable,
                        );
                    }
                    Object::Integer(n) => {
                        maybe_push_space(-(*n as f32), &mut text, &mut chars);
                    }
                    Object::Real(n) => {
                        maybe_push_space(-n, &mut text, &mut chars);
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }

    DecodedText {
        text,
        chars,
        mappable,
    }
}

/// Record how one decoded string element's characters map to its bytes.
fn map_element(
    decoded: &str,
    bytes: &[u8],
    elem: usize,
    text: &mut String,
    chars: &mut Vec<CharSrc>,
    mappable: &mut bool,
) {
    let char_count = decoded.chars().count();
    // One byte per character covers the simple encodings; two covers the
    // UTF-16BE / CID case. Anything else loses the mapping for this span.
    let bytes_per_char = if char_count > 0 && bytes.len() == char_count {
        Some(1)
    } else if char_count > 0 && bytes.len() == char_count * 2 {
        Some(2)
    } else {
        None
    };

    match bytes_per_char {
        Some(n) => {
            for i in 0..char_count {
                chars.push(CharSrc::Bytes {
                    elem,
                    offset: i * n,
                    len: n,
                });
            }
        }
        None => {
            *mappable = false;
            for _ in 0..char_count {
                chars.push(CharSrc::Synthetic);
            }
        }
    }
    text.push_str(decoded);
}

/// Insert a synthetic word space for a large TJ advance, the same signal the
/// text extractor reads spaces from.
fn maybe_push_space(adjustment: f32, text: &mut String, chars: &mut Vec<CharSrc>) {
    if adjustment > TJ_SPACE_THRESHOLD && !text.is_empty() && !text.ends_with(' ') {
        text.push(' ');
        chars.push(CharSrc::Synthetic);
    }
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    if let Ok(s) = String::from_utf8(bytes.to_vec()) {
        return s;
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Break spans into reading-order tokens.
///
/// Spans are sorted top to bottom (PDF Y is bottom-up) and grouped into
/// baselines with a tolerance of 30% of the font size; within a baseline
/// they run left to right, and each span's text splits into alphanumeric
/// runs.
fn tokenize_spans(spans: &[TextSpan]) -> Vec<Token> {
    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by(|&a, &b| {
        let (sa, sb) = (&spans[a], &spans[b]);
        sb.y.partial_cmp(&sa.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(sa.x.partial_cmp(&sb.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    // Group into baselines, then order each line's spans by X.
    let mut lines: Vec<Vec<usize>> = Vec::new();
    let mut current_y: Option<f32> = None;
    for &idx in &order {
        let span = &spans[idx];
        let tolerance = span.font_size * 0.3;
        match current_y {
            Some(y) if (span.y - y).abs() <= tolerance => {
                lines.last_mut().expect("line started").push(idx);
            }
            _ => {
                current_y = Some(span.y);
                lines.push(vec![idx]);
            }
        }
    }
    for line in &mut lines {
        line.sort_by(|&a, &b| {
            spans[a]
                .x
                .partial_cmp(&spans[b].x)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    let mut tokens = Vec::new();
    for span_idx in lines.into_iter().flatten() {
        let span = &spans[span_idx];
        let mut start: Option<usize> = None;
        let mut run = String::new();

        for (i, c) in span.text.chars().enumerate() {
            if c.is_alphanumeric() {
                if start.is_none() {
                    start = Some(i);
                }
                run.push(c);
            } else if let Some(s) = start.take() {
                tokens.push(make_token(span, span_idx, s, i, &run));
                run.clear();
            }
        }
        if let Some(s) = start {
            let end = span.text.chars().count();
            tokens.push(make_token(span, span_idx, s, end, &run));
        }
    }
    tokens
}

fn make_token(span: &TextSpan, span_idx: usize, start: usize, end: usize, run: &str) -> Token {
    Token {
        folded: fold_token(run),
        span: span_idx,
        char_start: start,
        char_end: end,
        region: span.char_region(start, end),
    }
}

/// Text matrix for tracking position in a content stream.
#[derive(Debug, Clone)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }
}

impl TextMatrix {
    fn set(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.a = a;
        self.b = b;
        self.c = c;
        self.d = d;
        self.e = e;
        self.f = f;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    fn next_line(&mut self) {
        // Default leading; a TL-aware implementation would read the set value
        self.f -= 12.0 * self.d;
    }

    fn position(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    fn scale(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}

/// Helper to extract a number from a PDF object.
pub fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x: f32, y: f32) -> TextSpan {
        let chars = (0..text.chars().count())
            .map(|i| CharSrc::Bytes {
                elem: 0,
                offset: i,
                len: 1,
            })
            .collect();
        TextSpan {
            text: text.to_string(),
            x,
            y,
            font_size: 12.0,
            op_index: 0,
            chars,
            mappable: true,
        }
    }

    #[test]
    fn test_decode_text_simple_utf8() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
    }

    #[test]
    fn test_decode_text_simple_utf16be() {
        let bytes = vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_simple(&bytes), "Hi");
    }

    #[test]
    fn test_decode_text_simple_latin1() {
        let bytes = vec![0x48, 0x65, 0x6C, 0x6C, 0xE9];
        assert_eq!(decode_text_simple(&bytes), "Hellé");
    }

    #[test]
    fn test_tokenize_splits_on_punctuation() {
        let spans = vec![span("Patient: Jane Doe, MRN 12345", 72.0, 700.0)];
        let tokens = tokenize_spans(&spans);
        let folded: Vec<&str> = tokens.iter().map(|t| t.folded.as_str()).collect();
        assert_eq!(folded, vec!["patient", "jane", "doe", "mrn", "12345"]);
    }

    #[test]
    fn test_tokenize_reading_order() {
        // Lower Y (further down the page) must come later
        let spans = vec![span("second line", 72.0, 600.0), span("first line", 72.0, 700.0)];
        let tokens = tokenize_spans(&spans);
        assert_eq!(tokens[0].folded, "first");
        assert_eq!(tokens.last().unwrap().folded, "line");
        assert_eq!(tokens[0].span, 1);
    }

    #[test]
    fn test_token_char_ranges() {
        let spans = vec![span("Jane Doe", 0.0, 0.0)];
        let tokens = tokenize_spans(&spans);
        assert_eq!(tokens[0].char_start, 0);
        assert_eq!(tokens[0].char_end, 4);
        assert_eq!(tokens[1].char_start, 5);
        assert_eq!(tokens[1].char_end, 8);
    }

    #[test]
    fn test_char_region_grows_with_range() {
        let s = span("abcdef", 10.0, 100.0);
        let r1 = s.char_region(0, 3);
        let r2 = s.char_region(0, 6);
        assert!(r2.width() > r1.width());
        assert_eq!(r1.x0, 10.0);
    }
}
