//! The result of one redaction call.

use std::fs;
use std::path::Path;

use super::audit::AuditLog;
use crate::error::Result;

/// Sanitized output bytes plus the audit trail that produced them.
///
/// The engine never persists anything itself; `output` is a complete
/// serialized PDF the caller stores or streams as it sees fit.
#[derive(Debug, Clone)]
pub struct RedactionOutcome {
    /// The serialized, sanitized PDF.
    pub output: Vec<u8>,
    /// Ordered record of every action taken.
    pub audit: AuditLog,
}

impl RedactionOutcome {
    pub fn new(output: Vec<u8>, audit: AuditLog) -> Self {
        Self { output, audit }
    }

    /// Size of the output artifact in bytes.
    pub fn output_len(&self) -> usize {
        self.output.len()
    }

    /// Write the output atomically: a sibling temp file is written in full,
    /// then renamed over the destination, so a crash mid-write never leaves
    /// a half-redacted file at `path`.
    pub fn write_output<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let tmp = dir.join(format!(
            ".{}.part",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "scrubpdf-output".to_string())
        ));
        fs::write(&tmp, &self.output)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}
