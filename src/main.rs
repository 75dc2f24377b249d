//! pingutter - gutter change markers against HEAD or a pinned git reference
//!
//! Shows which lines of the working files differ from the current head, or
//! from a commit, branch or remote ref the user pins. The diff is read from
//! `git diff -U0` and only ever used for display.

mod config;
mod document;
mod hunk;
mod logging;
mod pin;
mod pipeline;
mod projector;
mod render;
mod syntax;
mod tui;
mod vcs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::document::TextDocument;
use crate::pipeline::Annotator;
use crate::render::{render, OutputFormat};
use crate::vcs::{find_repo_root, GitCli, Vcs};

#[derive(Parser)]
#[command(name = "pingutter")]
#[command(about = "Gutter change markers against HEAD or a pinned git reference")]
#[command(version)]
struct Cli {
    /// Workspace root (default: repository containing the current directory)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open files with live gutter markers
    View {
        /// Files to open; Tab switches between them
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Reference to pin at startup
        #[arg(short, long)]
        pin: Option<String>,

        /// Do not re-annotate when files change on disk
        #[arg(long)]
        no_watch: bool,

        /// Disable syntax highlighting
        #[arg(long)]
        no_syntax: bool,
    },

    /// Print the gutter ranges for one file
    Annotate {
        file: PathBuf,

        /// Compare against this reference instead of HEAD
        #[arg(short, long)]
        pin: Option<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check whether a reference resolves in the repository
    Verify { reference: String },

    /// Write the default configuration file
    InitConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = logging::init_logging(cli.debug).context("Failed to initialize logging")?;

    let config = Config::load()?;
    let root = workspace_root(cli.workspace.as_deref())?;
    info!("Workspace root: {}", root.display());
    let git = GitCli::new(config.git_binary.clone(), root.clone());

    match cli.command {
        Commands::View {
            files,
            pin,
            no_watch,
            no_syntax,
        } => {
            let config = config.with_overrides(no_watch, no_syntax);
            cmd_view(git, config, &root, &files, pin.as_deref())
                .with_context(|| format!("See {} for details", log_path.display()))?;
        }
        Commands::Annotate { file, pin, format } => {
            cmd_annotate(git, &config, &file, pin.as_deref(), &format)?;
        }
        Commands::Verify { reference } => {
            cmd_verify(&git, &reference)?;
        }
        Commands::InitConfig => {
            let path = Config::create_default()?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}

/// Explicit root, else the enclosing repository, else the current directory
fn workspace_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return dir
            .canonicalize()
            .with_context(|| format!("Workspace not found: {}", dir.display()));
    }

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    match find_repo_root(&cwd) {
        Ok(root) => Ok(root),
        Err(err) => {
            warn!("{err:#}; diffs will be empty");
            Ok(cwd)
        }
    }
}

fn cmd_view(
    git: GitCli,
    config: Config,
    root: &Path,
    files: &[PathBuf],
    pin: Option<&str>,
) -> Result<()> {
    let docs = files
        .iter()
        .map(|f| TextDocument::open(f))
        .collect::<Result<Vec<_>>>()?;

    let annotator = Annotator::new(git, config.default_target.clone());
    let app = tui::App::new(annotator, docs, root, config, pin);
    tui::run(app)
}

fn cmd_annotate(
    git: GitCli,
    config: &Config,
    file: &Path,
    pin: Option<&str>,
    format: &str,
) -> Result<()> {
    let format =
        OutputFormat::from_str(format).context("Invalid format. Use: text or json")?;
    let doc = TextDocument::open(file)?;

    let mut annotator = Annotator::new(git, config.default_target.clone());
    if let Some(reference) = pin {
        if let Err(err) = annotator.pin(reference) {
            eprintln!("{err}; comparing against {}", annotator.target());
        }
    }

    let projection = annotator.annotate(&doc);
    print!("{}", render(format, annotator.target(), file, &projection)?);
    Ok(())
}

fn cmd_verify(git: &GitCli, reference: &str) -> Result<()> {
    match git.verify_reference(reference) {
        Ok(()) => {
            println!("{reference}: ok");
            Ok(())
        }
        Err(err) => {
            info!("{err}");
            anyhow::bail!("Invalid git reference: {reference}")
        }
    }
}
