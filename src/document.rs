//! File-backed documents

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::projector::Document;

/// A file loaded from disk, split the way an editor counts lines
#[derive(Debug, Clone)]
pub struct TextDocument {
    path: PathBuf,
    lines: Vec<String>,
}

impl TextDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", path.display()))?;
        let mut doc = Self {
            path,
            lines: Vec::new(),
        };
        doc.reload()?;
        Ok(doc)
    }

    /// Re-read the file contents after a save
    pub fn reload(&mut self) -> Result<()> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        self.lines = split_lines(&String::from_utf8_lossy(&bytes));
        Ok(())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// A trailing newline opens one more empty line, as in an editor buffer
fn split_lines(content: &str) -> Vec<String> {
    content
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
        .collect()
}

impl Document for TextDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line_text(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_split_lines_like_editor() {
        assert_eq!(split_lines(""), vec![""]);
        assert_eq!(split_lines("a\nb"), vec!["a", "b"]);
        assert_eq!(split_lines("a\r\nb\n"), vec!["a", "b", ""]);
    }

    #[test]
    fn test_open_and_reload() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "one\ntwo\n").unwrap();

        let mut doc = TextDocument::open(&file).unwrap();
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.line_text(1), Some("two"));

        std::fs::write(&file, "one\n").unwrap();
        doc.reload().unwrap();
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.line_text(1), Some(""));
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempdir().unwrap();
        assert!(TextDocument::open(&dir.path().join("missing.txt")).is_err());
    }
}
