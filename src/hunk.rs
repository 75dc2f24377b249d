//! Hunk header parsing and line classification
//!
//! Reads `@@ -a,b +c,d @@` headers out of zero-context unified diff text and
//! sorts the affected lines of the working file into gutter categories.

use lazy_static::lazy_static;
use log::trace;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

lazy_static! {
    static ref HUNK_HEADER: Regex = Regex::new(r"(?m)^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@")
        .expect("hunk header regex");
}

/// Gutter category for a changed line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Modified,
    Added,
    Removed,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 3] = [ChangeKind::Modified, ChangeKind::Added, ChangeKind::Removed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Modified => "modified",
            Self::Added => "added",
            Self::Removed => "removed",
        }
    }
}

/// One `@@ -old_start,old_count +new_start,new_count @@` record, 1-based as in the diff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
}

impl HunkHeader {
    fn from_captures(caps: &Captures) -> Option<Self> {
        let number = |idx: usize, default: Option<u32>| match caps.get(idx) {
            Some(m) => m.as_str().parse().ok(),
            None => default,
        };

        Some(Self {
            old_start: number(1, None)?,
            old_count: number(2, Some(1))?,
            new_start: number(3, None)?,
            new_count: number(4, Some(1))?,
        })
    }

    /// Category and zero-based working-file span touched by this hunk
    pub fn classify(&self) -> Option<(ChangeKind, LineSpan)> {
        let start = self.new_start as usize;
        let count = self.new_count as usize;
        // Line 0 does not exist in the new file; drop it instead of wrapping
        let span = match start.checked_sub(1) {
            Some(first) => LineSpan {
                start: first,
                len: count,
            },
            None => LineSpan {
                start: 0,
                len: count.saturating_sub(1),
            },
        };

        if self.old_count > 0 && self.new_count > 0 {
            Some((ChangeKind::Modified, span))
        } else if self.new_count > 0 {
            Some((ChangeKind::Added, span))
        } else if self.old_count > 0 {
            // Deletions anchor on the line just above the gap
            let anchor = LineSpan {
                start: start.saturating_sub(1),
                len: 1,
            };
            Some((ChangeKind::Removed, anchor))
        } else {
            None
        }
    }
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        )
    }
}

/// Run of consecutive zero-based lines. Kept unexpanded, since a header may claim
/// far more lines than the document has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub len: usize,
}

impl LineSpan {
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.len)
    }
}

/// Working-file line spans, grouped by category in order of appearance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineClassification {
    spans: BTreeMap<ChangeKind, Vec<LineSpan>>,
}

impl Default for LineClassification {
    fn default() -> Self {
        Self {
            spans: ChangeKind::ALL.iter().map(|k| (*k, Vec::new())).collect(),
        }
    }
}

impl LineClassification {
    pub fn spans(&self, kind: ChangeKind) -> &[LineSpan] {
        self.spans.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Zero-based indices for `kind` below `limit`, in order of appearance
    pub fn indices(&self, kind: ChangeKind, limit: usize) -> impl Iterator<Item = usize> + '_ {
        self.spans(kind)
            .iter()
            .flat_map(move |span| span.start..span.end().min(limit))
    }

    pub fn push(&mut self, kind: ChangeKind, span: LineSpan) {
        if span.len > 0 {
            self.spans.entry(kind).or_default().push(span);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.spans.values().all(Vec::is_empty)
    }

    /// Lines claimed by the diff, before any bounds check
    pub fn total(&self) -> usize {
        self.spans
            .values()
            .flatten()
            .fold(0usize, |acc, span| acc.saturating_add(span.len))
    }
}

/// Extract every hunk header in order of appearance
pub fn parse_hunk_headers(diff: &str) -> Vec<HunkHeader> {
    HUNK_HEADER
        .captures_iter(diff)
        .filter_map(|caps| HunkHeader::from_captures(&caps))
        .collect()
}

/// Classify the lines of a zero-context diff. Never fails; junk input gives empty sets.
pub fn classify(diff: &str) -> LineClassification {
    let mut result = LineClassification::default();
    for header in parse_hunk_headers(diff) {
        match header.classify() {
            Some((kind, span)) => {
                trace!("{header} -> {} {:?}", kind.as_str(), span);
                result.push(kind, span);
            }
            None => trace!("{header} -> nothing"),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(c: &LineClassification, kind: ChangeKind) -> Vec<usize> {
        c.indices(kind, usize::MAX).collect()
    }

    const SAMPLE: &str = "diff --git a/src/lib.rs b/src/lib.rs
index 3b18e51..a1c2d3e 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -3 +3 @@ fn main() {
-    old();
+    new();
@@ -5,0 +10,3 @@
+a
+b
+c
@@ -20,2 +22,0 @@ impl Foo {
-x
-y
";

    #[test]
    fn test_pure_insertion_is_added() {
        let c = classify("@@ -5,0 +10,3 @@\n");
        assert_eq!(lines(&c, ChangeKind::Added), [9, 10, 11]);
        assert!(c.spans(ChangeKind::Modified).is_empty());
        assert!(c.spans(ChangeKind::Removed).is_empty());
    }

    #[test]
    fn test_pure_deletion_anchors_above() {
        let c = classify("@@ -8,3 +8,0 @@\n");
        assert_eq!(lines(&c, ChangeKind::Removed), [7]);
        assert!(c.spans(ChangeKind::Modified).is_empty());
        assert!(c.spans(ChangeKind::Added).is_empty());
    }

    #[test]
    fn test_deletion_at_top_clamps_to_zero() {
        let c = classify("@@ -1,2 +0,0 @@\n");
        assert_eq!(lines(&c, ChangeKind::Removed), [0]);
    }

    #[test]
    fn test_implicit_counts_default_to_one() {
        let c = classify("@@ -3 +3 @@\n");
        assert_eq!(lines(&c, ChangeKind::Modified), [2]);
        assert_eq!(c.total(), 1);
    }

    #[test]
    fn test_zero_counts_produce_nothing() {
        let c = classify("@@ -1,0 +1,0 @@\n");
        assert!(c.is_empty());
    }

    #[test]
    fn test_full_diff_in_order() {
        let c = classify(SAMPLE);
        assert_eq!(lines(&c, ChangeKind::Modified), [2]);
        assert_eq!(lines(&c, ChangeKind::Added), [9, 10, 11]);
        assert_eq!(lines(&c, ChangeKind::Removed), [21]);

        let headers = parse_hunk_headers(SAMPLE);
        assert_eq!(headers.len(), 3);
        assert_eq!(
            headers[2],
            HunkHeader {
                old_start: 20,
                old_count: 2,
                new_start: 22,
                new_count: 0,
            }
        );
    }

    #[test]
    fn test_parse_is_deterministic() {
        assert_eq!(classify(SAMPLE), classify(SAMPLE));
    }

    #[test]
    fn test_malformed_input_is_empty() {
        assert!(classify("").is_empty());
        assert!(classify("not a diff at all\n@@ broken @@\n").is_empty());
        // Header must start the line
        assert!(classify("+ @@ -1 +1 @@\n").is_empty());
        // Out of range numbers do not match
        assert!(classify("@@ -1 +99999999999 @@\n").is_empty());
    }

    #[test]
    fn test_overlapping_hunks_are_kept() {
        let c = classify("@@ -2 +2 @@\n@@ -2,0 +2,1 @@\n");
        assert_eq!(lines(&c, ChangeKind::Modified), [1]);
        assert_eq!(lines(&c, ChangeKind::Added), [1]);
    }

    #[test]
    fn test_huge_count_stays_a_span() {
        let c = classify("@@ -1 +1,4294967295 @@\n");
        assert_eq!(
            c.spans(ChangeKind::Modified),
            &[LineSpan {
                start: 0,
                len: 4_294_967_295,
            }]
        );
        assert_eq!(c.total(), 4_294_967_295);
        assert_eq!(c.indices(ChangeKind::Modified, 3).collect::<Vec<_>>(), [0, 1, 2]);
    }

    #[test]
    fn test_zero_new_start_drops_line_zero() {
        let c = classify("@@ -1,2 +0,3 @@\n");
        assert_eq!(lines(&c, ChangeKind::Modified), [0, 1]);
    }

    #[test]
    fn test_header_display() {
        let headers = parse_hunk_headers("@@ -3 +4,2 @@\n");
        assert_eq!(headers[0].to_string(), "@@ -3,1 +4,2 @@");
    }

    #[test]
    fn test_crlf_diff_text() {
        let c = classify("@@ -1,2 +1,3 @@\r\n-a\r\n+b\r\n");
        assert_eq!(lines(&c, ChangeKind::Modified), [0, 1, 2]);
    }
}
