//! # scrubpdf
//!
//! Irreversible PDF redaction for Rust.
//!
//! Given a document and a set of target phrases, scrubpdf destroys every
//! occurrence of those phrases (and, optionally, detected logo imagery)
//! in the document's actual content model, and returns sanitized bytes plus
//! an ordered audit log of everything it did. Text-native documents get
//! their content streams rewritten; scanned documents get their page
//! bitmaps masked. Drawing an opaque box alone is never enough: the output's
//! extractable text layer no longer contains the phrase.
//!
//! ## Quick Start
//!
//! ```no_run
//! use scrubpdf::{redact_file, RedactOptions};
//!
//! fn main() -> scrubpdf::Result<()> {
//!     let outcome = redact_file(
//!         "report.pdf",
//!         ["Jane Doe", "MRN 12345"],
//!         &RedactOptions::new().with_logos(true).with_placeholders(true),
//!     )?;
//!
//!     outcome.write_output("report.redacted.pdf")?;
//!     for entry in &outcome.audit.entries {
//!         println!("page {}: {} ({})", entry.page, entry.action, entry.detail);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees and limits
//!
//! - Target phrases are absent from the output's extractable text layer and
//!   Info metadata; matched regions are visually obscured.
//! - The input is never modified; every call is independent.
//! - Scanned-document matching is best-effort: a phrase the localizer cannot
//!   read is left in place and the page is flagged in the audit log. Absence
//!   of a match is not proof of absence of the phrase.

pub mod analyze;
pub mod classify;
pub mod detect;
pub mod error;
pub mod extract;
pub mod localize;
pub mod logo;
pub mod model;
pub mod raster;
pub mod redact;
pub mod source;

// Re-export commonly used types
pub use analyze::{analyze, QualityReport};
pub use classify::{classify, DocumentKind};
pub use error::{Error, Result};
pub use localize::{TextLocalizer, TextRegion};
pub use logo::{LogoConfig, LogoDetector};
pub use model::{
    ActionKind, AuditLog, LogEntry, RedactionOutcome, RedactionTarget, Region, TargetSet,
};
pub use redact::{redact, RedactOptions};
pub use source::SourceDocument;

#[cfg(feature = "ocr-tesseract")]
pub use localize::TesseractLocalizer;

use std::path::Path;

/// Redact a PDF file.
///
/// # Example
///
/// ```no_run
/// use scrubpdf::{redact_file, RedactOptions};
///
/// let outcome = redact_file("in.pdf", ["confidential"], &RedactOptions::new()).unwrap();
/// outcome.write_output("out.pdf").unwrap();
/// ```
pub fn redact_file<P, I, S>(path: P, phrases: I, options: &RedactOptions) -> Result<RedactionOutcome>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let targets = TargetSet::new(phrases)?;
    let source = SourceDocument::open(path)?;
    redact(&source, &targets, options)
}

/// Redact a PDF from bytes.
pub fn redact_bytes<I, S>(data: &[u8], phrases: I, options: &RedactOptions) -> Result<RedactionOutcome>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let targets = TargetSet::new(phrases)?;
    let source = SourceDocument::from_bytes(data)?;
    redact(&source, &targets, options)
}

/// Classify a PDF file as text-native or scanned.
pub fn classify_file<P: AsRef<Path>>(path: P) -> Result<DocumentKind> {
    let source = SourceDocument::open(path)?;
    classify(&source)
}

/// Builder for configuring and running a redaction.
///
/// # Example
///
/// ```no_run
/// use scrubpdf::Redactor;
///
/// let outcome = Redactor::new()
///     .target("Jane Doe")
///     .target("MRN 12345")
///     .remove_logos()
///     .placeholders()
///     .redact_file("report.pdf")?;
/// # Ok::<(), scrubpdf::Error>(())
/// ```
pub struct Redactor {
    phrases: Vec<String>,
    options: RedactOptions,
}

impl Redactor {
    pub fn new() -> Self {
        Self {
            phrases: Vec::new(),
            options: RedactOptions::default(),
        }
    }

    /// Add one target phrase.
    pub fn target(mut self, phrase: impl Into<String>) -> Self {
        self.phrases.push(phrase.into());
        self
    }

    /// Add several target phrases.
    pub fn targets<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phrases.extend(phrases.into_iter().map(Into::into));
        self
    }

    /// Remove detected logo imagery.
    pub fn remove_logos(mut self) -> Self {
        self.options.remove_logos = true;
        self
    }

    /// Draw placeholder tints where logos are removed.
    pub fn placeholders(mut self) -> Self {
        self.options.add_placeholders = true;
        self
    }

    /// Set logo detector thresholds.
    pub fn logo_config(mut self, config: LogoConfig) -> Self {
        self.options.logo_config = config;
        self
    }

    /// Set a text localizer for scanned documents.
    pub fn localizer(mut self, localizer: std::sync::Arc<dyn TextLocalizer>) -> Self {
        self.options.localizer = Some(localizer);
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.options.parallel = false;
        self
    }

    /// Force a pipeline instead of classifying.
    pub fn kind(mut self, kind: DocumentKind) -> Self {
        self.options.kind_override = Some(kind);
        self
    }

    /// Run against a file.
    pub fn redact_file<P: AsRef<Path>>(self, path: P) -> Result<RedactionOutcome> {
        redact_file(path, self.phrases, &self.options)
    }

    /// Run against bytes.
    pub fn redact_bytes(self, data: &[u8]) -> Result<RedactionOutcome> {
        redact_bytes(data, self.phrases, &self.options)
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}
