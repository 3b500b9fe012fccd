//! The redaction engine's entry point.
//!
//! [`redact`] classifies the document once, then hands it to exactly one of
//! the two pipelines. Nothing below this module is re-classified or
//! re-dispatched mid-call.

pub(crate) mod matcher;
pub(crate) mod scanned;
pub(crate) mod text_native;

use std::sync::Arc;

use crate::classify::{classify_with_images, DocumentKind};
use crate::error::Result;
use crate::extract::DocumentImages;
use crate::localize::TextLocalizer;
use crate::logo::LogoConfig;
use crate::model::{RedactionOutcome, TargetSet};
use crate::source::SourceDocument;

/// Options for one redaction call.
#[derive(Clone)]
pub struct RedactOptions {
    /// Remove images the logo detector flags.
    pub remove_logos: bool,
    /// Draw a tint where a logo was removed. Only ever follows an actual
    /// removal; accepted-but-inert without `remove_logos`.
    pub add_placeholders: bool,
    /// Logo detector thresholds.
    pub logo_config: LogoConfig,
    /// Parallelize the scanned pipeline's read-only stages.
    pub parallel: bool,
    /// Text localizer for scanned documents. Without one, every scanned
    /// page degrades to a per-page localization failure in the audit log.
    pub localizer: Option<Arc<dyn TextLocalizer>>,
    /// Skip classification and force a pipeline.
    pub kind_override: Option<DocumentKind>,
}

impl RedactOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable logo removal.
    pub fn with_logos(mut self, remove: bool) -> Self {
        self.remove_logos = remove;
        self
    }

    /// Enable or disable placeholder tints.
    pub fn with_placeholders(mut self, add: bool) -> Self {
        self.add_placeholders = add;
        self
    }

    /// Set logo detector thresholds.
    pub fn with_logo_config(mut self, config: LogoConfig) -> Self {
        self.logo_config = config;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the text localizer for scanned documents.
    pub fn with_localizer(mut self, localizer: Arc<dyn TextLocalizer>) -> Self {
        self.localizer = Some(localizer);
        self
    }

    /// Force a document kind instead of classifying.
    pub fn with_kind(mut self, kind: DocumentKind) -> Self {
        self.kind_override = Some(kind);
        self
    }
}

impl Default for RedactOptions {
    fn default() -> Self {
        Self {
            remove_logos: false,
            add_placeholders: false,
            logo_config: LogoConfig::default(),
            parallel: true,
            localizer: None,
            kind_override: None,
        }
    }
}

impl std::fmt::Debug for RedactOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedactOptions")
            .field("remove_logos", &self.remove_logos)
            .field("add_placeholders", &self.add_placeholders)
            .field("logo_config", &self.logo_config)
            .field("parallel", &self.parallel)
            .field("localizer", &self.localizer.as_ref().map(|l| l.name()))
            .field("kind_override", &self.kind_override)
            .finish()
    }
}

/// Redact a document: classify, dispatch, return sanitized bytes plus the
/// audit log. The sole entry point surrounding code calls.
pub fn redact(
    source: &SourceDocument,
    targets: &TargetSet,
    options: &RedactOptions,
) -> Result<RedactionOutcome> {
    if options.add_placeholders && !options.remove_logos {
        log::warn!("add_placeholders without remove_logos is a no-op; placeholders only follow a removal");
    }

    let images = DocumentImages::collect(source.doc())?;
    let kind = match options.kind_override {
        Some(kind) => kind,
        None => classify_with_images(source, &images)?,
    };
    log::info!(
        "document classified as {kind}: {} pages, {} distinct image assets",
        source.page_count(),
        images.assets().len()
    );

    match kind {
        DocumentKind::TextNative => {
            text_native::redact_text_native(source, targets, options, &images)
        }
        DocumentKind::Scanned => scanned::redact_scanned(source, targets, options),
    }
}
