//! Configuration module for pingutter
//!
//! Loads user configuration from ~/.pingutter/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::hunk::ChangeKind;
use crate::pin::DEFAULT_TARGET;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// git executable to run
    pub git_binary: String,
    /// Comparison target while nothing is pinned
    pub default_target: String,
    /// Gutter glyph for modified and added lines
    pub change_marker: String,
    /// Gutter glyph for the line above a deletion
    pub removed_marker: String,
    pub syntax_highlighting: bool,
    /// Syntax theme name (syntect default themes)
    pub syntax_theme: Option<String>,
    /// Re-annotate when open files change on disk
    pub watch: bool,
    pub colors: GutterColors,
}

/// Hex colors per gutter category
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GutterColors {
    pub modified: String,
    pub added: String,
    pub removed: String,
}

impl Default for GutterColors {
    fn default() -> Self {
        Self {
            modified: "#FFC83D".to_string(),
            added: "#4CAF50".to_string(),
            removed: "#F44336".to_string(),
        }
    }
}

impl GutterColors {
    pub fn for_kind(&self, kind: ChangeKind) -> &str {
        match kind {
            ChangeKind::Modified => &self.modified,
            ChangeKind::Added => &self.added,
            ChangeKind::Removed => &self.removed,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git_binary: "git".to_string(),
            default_target: DEFAULT_TARGET.to_string(),
            change_marker: "▌".to_string(),
            removed_marker: "▼".to_string(),
            syntax_highlighting: true,
            syntax_theme: None,
            watch: true,
            colors: GutterColors::default(),
        }
    }
}

impl Config {
    /// Load configuration from default path (~/.pingutter/config.toml)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Invalid config file: {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pingutter")
            .join("config.toml")
    }

    /// Merge CLI overrides into config
    pub fn with_overrides(mut self, no_watch: bool, no_syntax: bool) -> Self {
        if no_watch {
            self.watch = false;
        }
        if no_syntax {
            self.syntax_highlighting = false;
        }
        self
    }

    /// Create a default config file
    pub fn create_default() -> Result<PathBuf> {
        let config_path = Self::default_path();
        Self::write_default(&config_path)?;
        Ok(config_path)
    }

    fn write_default(config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents =
            toml::to_string_pretty(&Config::default()).context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }
}
