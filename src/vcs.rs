//! Diff source using the git command
//!
//! Shells out to `git diff -U0` so custom diff drivers and filters behave the
//! same as on the command line. Nothing here writes to the repository.

use anyhow::{Context, Result};
use git2::Repository;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed: {stderr}")]
    Failed { command: String, stderr: String },
}

/// Version control operations the annotator depends on
pub trait Vcs {
    /// Zero-context unified diff of `path` between `target` and the working tree
    fn diff(&self, target: &str, path: &Path) -> Result<String, VcsError>;

    /// Succeeds when `reference` resolves to an object in the repository
    fn verify_reference(&self, reference: &str) -> Result<(), VcsError>;
}

/// `git` executable scoped to one workspace root
#[derive(Debug, Clone)]
pub struct GitCli {
    git_binary: String,
    workdir: PathBuf,
}

impl GitCli {
    pub fn new(git_binary: impl Into<String>, workdir: PathBuf) -> Self {
        Self {
            git_binary: git_binary.into(),
            workdir,
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, VcsError> {
        let mut cmd = Command::new(&self.git_binary);
        cmd.arg("-C").arg(&self.workdir).args(args);

        let output = cmd.output().map_err(|source| VcsError::Spawn {
            program: self.git_binary.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(VcsError::Failed {
                command: format!("git {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Vcs for GitCli {
    fn diff(&self, target: &str, path: &Path) -> Result<String, VcsError> {
        let path = path.to_string_lossy();
        self.run(&[
            "diff",
            "--no-color",
            "--no-ext-diff",
            "-U0",
            target,
            "--",
            &path,
        ])
    }

    fn verify_reference(&self, reference: &str) -> Result<(), VcsError> {
        self.run(&["rev-parse", "--verify", "--quiet", reference])
            .map(|_| ())
    }
}

/// Diff text for one annotation cycle; any failure reads as "no changes"
pub fn fetch_diff(vcs: &dyn Vcs, target: &str, path: &Path) -> String {
    match vcs.diff(target, path) {
        Ok(text) => {
            debug!(
                "git diff {} -- {}: {} bytes",
                target,
                path.display(),
                text.len()
            );
            text
        }
        Err(err) => {
            warn!("Diff unavailable for {}: {}", path.display(), err);
            String::new()
        }
    }
}

/// Find the git repository root from a path
pub fn find_repo_root(start: &Path) -> Result<PathBuf> {
    let repo = Repository::discover(start).context("Not in a git repository")?;

    repo.workdir()
        .map(PathBuf::from)
        .context("Repository has no working directory")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use tempfile::tempdir;

    /// In-memory `Vcs` keyed by target
    #[derive(Default)]
    pub struct FakeVcs {
        pub diffs: HashMap<String, String>,
        pub known_refs: HashSet<String>,
        pub diff_calls: RefCell<Vec<String>>,
    }

    impl FakeVcs {
        pub fn with_diff(mut self, target: &str, diff: &str) -> Self {
            self.diffs.insert(target.to_string(), diff.to_string());
            self.known_refs.insert(target.to_string());
            self
        }

        pub fn with_ref(mut self, reference: &str) -> Self {
            self.known_refs.insert(reference.to_string());
            self
        }
    }

    impl Vcs for FakeVcs {
        fn diff(&self, target: &str, _path: &Path) -> Result<String, VcsError> {
            self.diff_calls.borrow_mut().push(target.to_string());
            self.diffs.get(target).cloned().ok_or_else(|| VcsError::Failed {
                command: format!("git diff {target}"),
                stderr: "bad revision".to_string(),
            })
        }

        fn verify_reference(&self, reference: &str) -> Result<(), VcsError> {
            if self.known_refs.contains(reference) {
                Ok(())
            } else {
                Err(VcsError::Failed {
                    command: format!("git rev-parse --verify {reference}"),
                    stderr: String::new(),
                })
            }
        }
    }

    fn git(dir: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
            .args(args)
            .current_dir(dir)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_fetch_diff_failure_is_empty() {
        let vcs = FakeVcs::default();
        assert_eq!(fetch_diff(&vcs, "HEAD", Path::new("a.rs")), "");
    }

    #[test]
    fn test_git_outside_repository_fails_safe() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x\n").unwrap();
        let vcs = GitCli::new("git", dir.path().to_path_buf());

        assert_eq!(fetch_diff(&vcs, "HEAD", &dir.path().join("a.txt")), "");
        assert!(vcs.verify_reference("HEAD").is_err());
    }

    #[test]
    fn test_missing_git_binary_fails_safe() {
        let dir = tempdir().unwrap();
        let vcs = GitCli::new("definitely-not-git-binary", dir.path().to_path_buf());
        assert!(matches!(
            vcs.diff("HEAD", Path::new("a.txt")),
            Err(VcsError::Spawn { .. })
        ));
    }

    #[test]
    fn test_git_diff_against_head_and_pinned_commit() {
        let dir = tempdir().unwrap();
        let root = &dir.path().canonicalize().unwrap();
        if !git(root, &["init", "-q"]) {
            return; // git not installed
        }

        let file = root.join("a.txt");
        std::fs::write(&file, "one\ntwo\nthree\n").unwrap();
        assert!(git(root, &["add", "a.txt"]));
        assert!(git(root, &["commit", "-q", "-m", "first"]));
        std::fs::write(&file, "one\nTWO\nthree\n").unwrap();
        assert!(git(root, &["commit", "-q", "-am", "second"]));
        std::fs::write(&file, "one\nTWO\nthree\nfour\n").unwrap();

        let vcs = GitCli::new("git", root.to_path_buf());
        assert!(vcs.verify_reference("HEAD~1").is_ok());
        assert!(vcs.verify_reference("no-such-branch").is_err());

        let head = vcs.diff("HEAD", &file).unwrap();
        assert!(head.contains("@@ -3,0 +4 @@"));

        let pinned = vcs.diff("HEAD~1", &file).unwrap();
        assert!(pinned.contains("@@ -2 +2 @@"));

        let root_found = find_repo_root(root).unwrap();
        assert_eq!(root_found.canonicalize().unwrap(), *root);
    }
}
