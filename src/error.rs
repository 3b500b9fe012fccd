//! Error types for the scrubpdf library.

use std::io;
use thiserror::Error;

/// Result type alias for scrubpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while redacting a document.
///
/// Fatal errors abort the call with no [`RedactionOutcome`](crate::RedactionOutcome);
/// per-page localization failures in the scanned pipeline are absorbed into
/// the audit log instead and never surface through this type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// The document's structure cannot be interpreted.
    #[error("PDF parsing error: {0}")]
    Parse(String),

    /// The document is encrypted; redaction requires readable content.
    #[error("Document is encrypted")]
    Encrypted,

    /// The caller supplied no redaction targets.
    #[error("No redaction targets were supplied")]
    EmptyTargets,

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// The mutated document could not be re-encoded to an output artifact.
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Text localization failed for a page of a scanned document.
    ///
    /// The scanned pipeline records this in the audit log and continues;
    /// it only escapes here when a localizer is invoked directly.
    #[error("Text localization failed: {0}")]
    Localization(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::Parse(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Localization(format!("image decode: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encrypted;
        assert_eq!(err.to_string(), "Document is encrypted");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );

        let err = Error::EmptyTargets;
        assert_eq!(err.to_string(), "No redaction targets were supplied");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
