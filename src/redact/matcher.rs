//! Whole-token phrase matching, shared by both pipelines.
//!
//! Both pipelines reduce a page to a reading-order stream of folded tokens;
//! a target matches only as a contiguous run of whole tokens, which is what
//! keeps "Ann" out of "Anna" and "John Smith" out of "Johnson Smithson".

use crate::model::{RedactionTarget, TargetSet};

/// One or more overlapping target matches collapsed into a single token
/// interval, so a region is never processed twice.
#[derive(Debug, Clone)]
pub struct MergedMatch {
    /// Token range (half-open) in the page's token stream
    pub start: usize,
    pub end: usize,
    /// Masked labels of every target that matched here
    pub labels: Vec<String>,
}

impl MergedMatch {
    /// Audit detail: masked labels only.
    pub fn detail(&self) -> String {
        if self.labels.len() == 1 {
            format!("target {}", self.labels[0])
        } else {
            format!("targets {}", self.labels.join(", "))
        }
    }
}

/// Find all target matches over a folded token stream and merge overlaps.
pub fn find_merged_matches(folded: &[&str], targets: &TargetSet) -> Vec<MergedMatch> {
    let mut matches: Vec<(usize, usize, String)> = Vec::new();
    for target in targets.targets() {
        match_one_target(folded, target, &mut matches);
    }
    matches.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
    merge(matches)
}

fn match_one_target(
    folded: &[&str],
    target: &RedactionTarget,
    out: &mut Vec<(usize, usize, String)>,
) {
    let needle = target.tokens();
    if needle.is_empty() || needle.len() > folded.len() {
        return;
    }

    for start in 0..=(folded.len() - needle.len()) {
        if folded[start..start + needle.len()]
            .iter()
            .zip(needle)
            .all(|(a, b)| *a == b)
        {
            out.push((start, start + needle.len(), target.label().to_string()));
        }
    }
}

fn merge(matches: Vec<(usize, usize, String)>) -> Vec<MergedMatch> {
    let mut merged: Vec<MergedMatch> = Vec::new();
    for (start, end, label) in matches {
        match merged.last_mut() {
            Some(last) if start < last.end => {
                last.end = last.end.max(end);
                if !last.labels.contains(&label) {
                    last.labels.push(label);
                }
            }
            _ => merged.push(MergedMatch {
                start,
                end,
                labels: vec![label],
            }),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(tokens: &[&str], targets: &[&str]) -> Vec<MergedMatch> {
        let set = TargetSet::new(targets.iter().copied()).unwrap();
        find_merged_matches(tokens, &set)
    }

    #[test]
    fn test_single_token_match() {
        let found = run(&["top", "confidential", "memo"], &["confidential"]);
        assert_eq!(found.len(), 1);
        assert_eq!((found[0].start, found[0].end), (1, 2));
    }

    #[test]
    fn test_multi_token_match() {
        let found = run(&["patient", "jane", "doe", "mrn"], &["Jane Doe"]);
        assert_eq!(found.len(), 1);
        assert_eq!((found[0].start, found[0].end), (1, 3));
    }

    #[test]
    fn test_substring_never_matches() {
        assert!(run(&["anna"], &["Ann"]).is_empty());
        assert!(run(&["johnson", "smithson"], &["John Smith"]).is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let found = run(&["confidential"], &["CONFIDENTIAL"]);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_overlapping_targets_merge() {
        // "jane doe" and "doe smith" overlap at token 2
        let found = run(&["jane", "doe", "smith"], &["Jane Doe", "Doe Smith"]);
        assert_eq!(found.len(), 1);
        assert_eq!((found[0].start, found[0].end), (0, 3));
        assert_eq!(found[0].labels.len(), 2);
    }

    #[test]
    fn test_disjoint_matches_stay_separate() {
        let found = run(&["jane", "x", "jane"], &["Jane"]);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_detail_masks() {
        let found = run(&["jane", "doe"], &["Jane Doe"]);
        assert_eq!(found[0].detail(), "target j*** d**");
    }
}
