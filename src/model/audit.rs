//! The audit log: an ordered record of every redaction action.
//!
//! Entries are appended in the order actions occur (page order, then action
//! order within a page) and are never reordered or deduplicated. Details
//! carry masked target labels, never the redacted text itself, so the log
//! is safe to render or export verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The kind of action an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// A target phrase was removed from a text-native page.
    TextRedacted,
    /// A logo image (or logo-like band) was removed.
    LogoRemoved,
    /// A placeholder tint was drawn where a logo was removed.
    PlaceholderInserted,
    /// A scanned page was rasterized and masked (or failed localization).
    PageRasterizedAndRedacted,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::TextRedacted => write!(f, "text_redacted"),
            ActionKind::LogoRemoved => write!(f, "logo_removed"),
            ActionKind::PlaceholderInserted => write!(f, "placeholder_inserted"),
            ActionKind::PageRasterizedAndRedacted => write!(f, "page_rasterized_and_redacted"),
        }
    }
}

/// One immutable redaction record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Page number (1-indexed)
    pub page: u32,
    /// What happened
    pub action: ActionKind,
    /// Human-readable detail; masked labels only
    pub detail: String,
}

impl LogEntry {
    pub fn new(page: u32, action: ActionKind, detail: impl Into<String>) -> Self {
        Self {
            page,
            action,
            detail: detail.into(),
        }
    }
}

/// The ordered sequence of actions taken during one redaction call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    /// When the call started
    pub started_at: DateTime<Utc>,
    /// Entries in occurrence order
    pub entries: Vec<LogEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn record(&mut self, page: u32, action: ActionKind, detail: impl Into<String>) {
        self.push(LogEntry::new(page, action, detail));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries of one kind.
    pub fn count(&self, action: ActionKind) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }

    /// Entries for one page, in occurrence order.
    pub fn for_page(&self, page: u32) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.page == page)
    }

    /// Export the log as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialize(e.to_string()))
    }

    /// Structural equality: same ordered (page, action) sequence.
    ///
    /// This is the determinism contract: details may carry timing-free text
    /// only, but two runs over the same input must agree on this shape.
    pub fn same_shape(&self, other: &AuditLog) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(a, b)| a.page == b.page && a.action == b.action)
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_preserved() {
        let mut log = AuditLog::new();
        log.record(1, ActionKind::TextRedacted, "j*** d**");
        log.record(1, ActionKind::LogoRemoved, "image 1a2b");
        log.record(2, ActionKind::LogoRemoved, "image 1a2b");

        let kinds: Vec<ActionKind> = log.entries.iter().map(|e| e.action).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::TextRedacted,
                ActionKind::LogoRemoved,
                ActionKind::LogoRemoved
            ]
        );
    }

    #[test]
    fn test_count_and_for_page() {
        let mut log = AuditLog::new();
        log.record(1, ActionKind::LogoRemoved, "a");
        log.record(1, ActionKind::PlaceholderInserted, "a");
        log.record(3, ActionKind::LogoRemoved, "a");

        assert_eq!(log.count(ActionKind::LogoRemoved), 2);
        assert_eq!(log.for_page(1).count(), 2);
        assert_eq!(log.for_page(2).count(), 0);
    }

    #[test]
    fn test_same_shape() {
        let mut a = AuditLog::new();
        let mut b = AuditLog::new();
        a.record(1, ActionKind::TextRedacted, "x");
        b.record(1, ActionKind::TextRedacted, "different detail");
        assert!(a.same_shape(&b));

        b.record(2, ActionKind::TextRedacted, "x");
        assert!(!a.same_shape(&b));
    }

    #[test]
    fn test_json_export() {
        let mut log = AuditLog::new();
        log.record(1, ActionKind::TextRedacted, "j*** d**");
        let json = log.to_json().unwrap();
        assert!(json.contains("text_redacted"));
        assert!(json.contains("j*** d**"));
    }
}
