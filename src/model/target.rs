//! Redaction targets.
//!
//! A target is a caller-supplied phrase to destroy. Matching is
//! case-insensitive over whole tokens, so targets are folded once here and
//! every extracted token goes through the same [`fold_token`] on its way in.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};

/// Normalize a single token: NFKC fold, then lowercase.
pub fn fold_token(token: &str) -> String {
    token.nfkc().collect::<String>().to_lowercase()
}

/// Split a phrase into folded tokens (contiguous alphanumeric runs).
pub fn tokenize_phrase(phrase: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in phrase.chars() {
        if c.is_alphanumeric() {
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(fold_token(&current));
            current.clear();
        }
    }
    if !current.is_empty() {
        tokens.push(fold_token(&current));
    }
    tokens
}

/// A single phrase to remove from the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionTarget {
    /// Folded tokens the matcher scans for, in order.
    tokens: Vec<String>,
    /// Masked label for the audit log; never the raw phrase.
    label: String,
}

impl RedactionTarget {
    fn from_phrase(phrase: &str) -> Option<Self> {
        let tokens = tokenize_phrase(phrase);
        if tokens.is_empty() {
            return None;
        }
        let label = mask_label(&tokens);
        Some(Self { tokens, label })
    }

    /// The folded token sequence.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Masked form safe to embed in the audit log (e.g. "J*** D**").
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Build the masked audit label: keep each token's first character.
fn mask_label(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| {
            let mut chars = t.chars();
            let head = chars.next().unwrap_or('?');
            let tail = chars.count();
            let mut s = String::with_capacity(tail + 1);
            s.push(head);
            for _ in 0..tail {
                s.push('*');
            }
            s
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The deduplicated set of phrases for one redaction call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSet {
    targets: Vec<RedactionTarget>,
}

impl TargetSet {
    /// Build a target set from raw phrases.
    ///
    /// Blank phrases are dropped and duplicates (after folding) collapse to
    /// one target. An effectively empty set is `Error::EmptyTargets`, the
    /// fail-fast contract for the engine's entry point.
    pub fn new<I, S>(phrases: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut targets: Vec<RedactionTarget> = Vec::new();
        for phrase in phrases {
            if let Some(target) = RedactionTarget::from_phrase(phrase.as_ref()) {
                if !targets.iter().any(|t| t.tokens == target.tokens) {
                    targets.push(target);
                }
            }
        }
        if targets.is_empty() {
            return Err(Error::EmptyTargets);
        }
        // Longest token sequence first, so "John Smith Jr" wins over "John Smith"
        // when both match at the same position.
        targets.sort_by(|a, b| {
            b.tokens
                .len()
                .cmp(&a.tokens.len())
                .then_with(|| a.tokens.cmp(&b.tokens))
        });
        Ok(Self { targets })
    }

    pub fn targets(&self) -> &[RedactionTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
