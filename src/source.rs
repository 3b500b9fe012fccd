//! Source document loading.
//!
//! [`SourceDocument`] is a validated, read-only view over `lopdf::Document`.
//! Redactors clone the inner document before mutating anything, which is
//! what keeps the caller's input untouched and two calls on the same file
//! fully independent.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use lopdf::{Document as LopdfDocument, ObjectId};

use crate::detect;
use crate::error::{Error, Result};

/// A parsed, validated input document.
pub struct SourceDocument {
    doc: LopdfDocument,
    source_len: usize,
}

impl SourceDocument {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        detect::sniff_header_from_path(path)?;

        let source_len = std::fs::metadata(path)?.len() as usize;
        let doc = LopdfDocument::load(path).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Self::from_parsed(doc, source_len)
    }

    /// Load a PDF from an in-memory byte buffer.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        detect::sniff_header(data)?;

        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Self::from_parsed(doc, data.len())
    }

    /// Load a PDF from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    fn from_parsed(doc: LopdfDocument, source_len: usize) -> Result<Self> {
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        Ok(Self { doc, source_len })
    }

    /// The underlying object model, read-only.
    pub fn doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// A mutable copy for a redactor to rewrite. The original stays intact.
    pub fn clone_document(&self) -> LopdfDocument {
        self.doc.clone()
    }

    /// Byte length of the source artifact.
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// PDF version string (e.g., "1.7").
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    /// Page number → object id, ordered by page number.
    pub fn pages(&self) -> BTreeMap<u32, ObjectId> {
        self.doc.get_pages()
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Page dimensions in points, falling back to Letter when the MediaBox
    /// is absent or malformed.
    pub fn page_dimensions(&self, page_num: u32) -> Result<(f32, f32)> {
        let pages = self.pages();
        let page_id = pages
            .get(&page_num)
            .ok_or(Error::PageOutOfRange(page_num, pages.len() as u32))?;

        if let Ok(page_dict) = self.doc.get_dictionary(*page_id) {
            if let Ok(media_box) = page_dict.get(b"MediaBox") {
                if let Ok(array) = media_box.as_array() {
                    if array.len() >= 4 {
                        let width = array[2].as_float().unwrap_or(612.0);
                        let height = array[3].as_float().unwrap_or(792.0);
                        return Ok((width, height));
                    }
                }
            }
        }

        Ok((612.0, 792.0))
    }

    /// Raw extracted text of one page (lopdf's extractor). Used by the
    /// classifier's character-count signal and the quality analyzer; the
    /// redactor itself works on positioned tokens instead.
    pub fn page_text(&self, page_num: u32) -> Result<String> {
        self.doc
            .extract_text(&[page_num])
            .map_err(|e| Error::Parse(format!("page {page_num}: {e}")))
    }

    /// Whether the catalog carries an outline (bookmarks).
    pub fn has_outline(&self) -> bool {
        self.doc
            .catalog()
            .ok()
            .and_then(|catalog| catalog.get(b"Outlines").ok())
            .is_some()
    }

    /// Whether the trailer points at a non-empty Info dictionary.
    pub fn has_info_metadata(&self) -> bool {
        self.doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|info| info.as_reference().ok())
            .and_then(|id| self.doc.get_dictionary(id).ok())
            .map(|dict| dict.iter().next().is_some())
            .unwrap_or(false)
    }
}
