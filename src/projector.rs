//! Projection of classified line indices onto a live document
//!
//! Indices come from a diff that may be older than the buffer, so anything
//! past the end of the document is dropped rather than reported.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::hunk::{ChangeKind, LineClassification};

/// Read access to an open document
pub trait Document {
    /// Path on disk, also used as the document identity
    fn path(&self) -> &Path;
    fn line_count(&self) -> usize;
    fn line_text(&self, index: usize) -> Option<&str>;
}

/// Where gutter decorations end up
pub trait DecorationSurface {
    fn clear_ranges(&mut self, kind: ChangeKind);
    fn apply_ranges(&mut self, kind: ChangeKind, ranges: &[AnnotationRange]);
}

/// Full-line span in the current document, columns counted in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnnotationRange {
    pub line: usize,
    pub start_column: usize,
    pub end_column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    ranges: BTreeMap<ChangeKind, Vec<AnnotationRange>>,
}

impl Projection {
    pub fn get(&self, kind: ChangeKind) -> &[AnnotationRange] {
        self.ranges.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.values().all(Vec::is_empty)
    }

    /// Replace whatever the surface showed before with this projection
    pub fn apply_to(&self, surface: &mut dyn DecorationSurface) {
        for kind in ChangeKind::ALL {
            surface.clear_ranges(kind);
        }
        for kind in ChangeKind::ALL {
            surface.apply_ranges(kind, self.get(kind));
        }
    }
}

fn full_line(document: &dyn Document, line: usize) -> Option<AnnotationRange> {
    if line >= document.line_count() {
        return None;
    }
    let text = document.line_text(line)?;
    Some(AnnotationRange {
        line,
        start_column: 0,
        end_column: text.chars().count(),
    })
}

/// Map each classified index to a full-line range, skipping stale ones
pub fn project(classification: &LineClassification, document: &dyn Document) -> Projection {
    let ranges = ChangeKind::ALL
        .iter()
        .map(|kind| {
            let ranges = classification
                .indices(*kind, document.line_count())
                .filter_map(|line| full_line(document, line))
                .collect();
            (*kind, ranges)
        })
        .collect();

    Projection { ranges }
}
