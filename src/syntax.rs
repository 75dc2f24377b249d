//! Syntax highlighting module using syntect's bundled syntaxes and themes
//!
//! Highlights whole documents and returns per-line highlight ranges.

use log::warn;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Style, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;

const DEFAULT_THEME: &str = "base16-ocean.dark";

/// A simple style used for text highlighting (foreground + modifiers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub fg: (u8, u8, u8),
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

/// A highlighted byte range within a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxHighlight {
    pub start: usize,
    pub end: usize,
    pub style: TextStyle,
}

/// Syntax highlighter using syntect parsers and themes
pub struct SyntaxHighlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl SyntaxHighlighter {
    pub fn new(theme_name: Option<&str>) -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let mut themes = ThemeSet::load_defaults().themes;

        let requested = theme_name.unwrap_or(DEFAULT_THEME);
        let theme = match themes.remove(requested) {
            Some(theme) => theme,
            None => {
                warn!("Unknown syntax theme {requested}, using {DEFAULT_THEME}");
                themes.remove(DEFAULT_THEME).unwrap_or_default()
            }
        };

        Self { syntax_set, theme }
    }

    /// Highlight document lines (without line endings) for the given file name
    pub fn highlight_lines(&self, lines: &[String], file_path: &str) -> Vec<Vec<SyntaxHighlight>> {
        let syntax = self
            .syntax_set
            .find_syntax_for_file(file_path)
            .ok()
            .flatten()
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let mut per_line = Vec::with_capacity(lines.len());

        for line in lines {
            let text = format!("{line}\n");
            let ranges = match highlighter.highlight_line(&text, &self.syntax_set) {
                Ok(r) => r,
                Err(_) => {
                    per_line.push(Vec::new());
                    continue;
                }
            };

            let mut line_highlights = Vec::new();
            let mut offset = 0usize;
            for (style, segment) in ranges {
                let len = segment.trim_end_matches('\n').len();
                if len == 0 {
                    continue;
                }
                line_highlights.push(SyntaxHighlight {
                    start: offset,
                    end: offset + len,
                    style: Self::to_text_style(style),
                });
                offset += len;
            }
            per_line.push(line_highlights);
        }

        per_line
    }

    fn to_text_style(style: Style) -> TextStyle {
        let fg = (style.foreground.r, style.foreground.g, style.foreground.b);
        TextStyle {
            fg,
            bold: style.font_style.contains(FontStyle::BOLD),
            italic: style.font_style.contains(FontStyle::ITALIC),
            underline: style.font_style.contains(FontStyle::UNDERLINE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_cover_line_text() {
        let highlighter = SyntaxHighlighter::new(None);
        let lines = vec!["fn main() {".to_string(), String::new(), "}".to_string()];
        let highlights = highlighter.highlight_lines(&lines, "main.rs");

        assert_eq!(highlights.len(), 3);
        assert_eq!(highlights[0].last().unwrap().end, lines[0].len());
        assert!(highlights[1].is_empty());
        assert_eq!(highlights[2][0].start, 0);
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let highlighter = SyntaxHighlighter::new(Some("no-such-theme"));
        let lines = vec!["plain".to_string()];
        assert_eq!(highlighter.highlight_lines(&lines, "notes.unknownext").len(), 1);
    }
}
