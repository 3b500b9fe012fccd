//! Content extraction: positioned text and embedded images.

pub mod images;
pub mod spans;

pub use images::{digest_hex, DocumentImages, ImageAsset, PayloadDigest, Placement};
pub use spans::{extract_page_text, CharSrc, PageText, TextSpan, Token};
