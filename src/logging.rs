//! File logging
//!
//! The TUI owns the terminal, so records go to `pingutter.log` under the XDG
//! state directory. `--debug` lowers the level to Debug and `RUST_LOG`, when
//! set, wins over both.

use anyhow::{Context, Result};
use log::LevelFilter;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const LOG_FILE: &str = "pingutter.log";

/// Install the global logger and return the file it appends to
pub fn init_logging(debug: bool) -> Result<PathBuf> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let dir = log_dir(std::env::var_os("XDG_STATE_HOME"), dirs::home_dir());
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let path = dir.join(LOG_FILE);
    let file = open_log(&path)?;

    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()
        .context("Logger already initialized")?;

    log::info!(
        "pingutter {} logging to {} ({level})",
        env!("CARGO_PKG_VERSION"),
        path.display()
    );
    Ok(path)
}

fn open_log(path: &Path) -> Result<fs::File> {
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

/// `$XDG_STATE_HOME/pingutter`, else `~/.local/state/pingutter`, else `/tmp/pingutter`
fn log_dir(xdg_state_home: Option<OsString>, home: Option<PathBuf>) -> PathBuf {
    // XDG says relative values are invalid and must be ignored
    let state = xdg_state_home
        .map(PathBuf::from)
        .filter(|dir| dir.is_absolute())
        .or_else(|| home.map(|home| home.join(".local").join("state")));

    match state {
        Some(dir) => dir.join("pingutter"),
        None => std::env::temp_dir().join("pingutter"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_dir_prefers_xdg_state_home() {
        let dir = log_dir(
            Some(OsString::from("/var/state")),
            Some(PathBuf::from("/home/u")),
        );
        assert_eq!(dir, PathBuf::from("/var/state/pingutter"));
    }

    #[test]
    fn test_log_dir_ignores_relative_xdg() {
        let dir = log_dir(Some(OsString::from("state")), Some(PathBuf::from("/home/u")));
        assert_eq!(dir, PathBuf::from("/home/u/.local/state/pingutter"));
    }

    #[test]
    fn test_log_dir_without_home() {
        assert_eq!(log_dir(None, None), std::env::temp_dir().join("pingutter"));
    }

    #[test]
    fn test_open_log_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(LOG_FILE);

        writeln!(open_log(&path).unwrap(), "first").unwrap();
        writeln!(open_log(&path).unwrap(), "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
