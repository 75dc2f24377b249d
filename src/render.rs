//! Plain output for one-shot annotation
//!
//! Prints the projected gutter ranges for a file as text or JSON.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::hunk::ChangeKind;
use crate::projector::{AnnotationRange, Projection};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Human readable listing, 1-based lines
pub fn render_text(target: &str, file: &Path, projection: &Projection) -> String {
    let mut output = format!("{} (against {})\n", file.display(), target);

    if projection.is_empty() {
        output.push_str("  no changes\n");
        return output;
    }

    for kind in ChangeKind::ALL {
        let ranges = projection.get(kind);
        if ranges.is_empty() {
            continue;
        }
        output.push_str(&format!("  {} ({}):\n", kind.as_str(), ranges.len()));
        for range in ranges {
            output.push_str(&format!(
                "    L{} [{}..{}]\n",
                range.line + 1,
                range.start_column,
                range.end_column
            ));
        }
    }

    output
}

/// JSON for editor integrations, 0-based lines
pub fn render_json(target: &str, file: &Path, projection: &Projection) -> Result<String> {
    #[derive(Serialize)]
    struct AnnotationReport<'a> {
        target: &'a str,
        file: String,
        modified: &'a [AnnotationRange],
        added: &'a [AnnotationRange],
        removed: &'a [AnnotationRange],
    }

    let report = AnnotationReport {
        target,
        file: file.to_string_lossy().into_owned(),
        modified: projection.get(ChangeKind::Modified),
        added: projection.get(ChangeKind::Added),
        removed: projection.get(ChangeKind::Removed),
    };

    serde_json::to_string_pretty(&report).map_err(Into::into)
}

/// Main render function that handles format selection
pub fn render(
    format: OutputFormat,
    target: &str,
    file: &Path,
    projection: &Projection,
) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(target, file, projection)),
        OutputFormat::Json => render_json(target, file, projection),
    }
}
