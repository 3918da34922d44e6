//! Git working-tree management for revision checkout and scratch branches.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::ExecutionMode;
use crate::error::{DiffError, Result};
use crate::process::{CommandLine, ProcessRunner};

/// Manages the state of a single git working tree.
///
/// The orchestrator is the sole mutator of the tree and its branch
/// namespace; concurrent invocations against the same tree are not
/// supported.
pub struct RevisionWorkspace<'a> {
    root: PathBuf,
    runner: &'a dyn ProcessRunner,
    mode: ExecutionMode,
}

impl<'a> RevisionWorkspace<'a> {
    pub fn new(root: impl Into<PathBuf>, runner: &'a dyn ProcessRunner, mode: ExecutionMode) -> Self {
        Self {
            root: root.into(),
            runner,
            mode,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn git(&self, args: &[&str]) -> CommandLine {
        CommandLine::new("git")
            .args(args.iter().copied())
            .current_dir(&self.root)
    }

    /// Fail with [`DiffError::DirtyWorkingTree`] if the tree has uncommitted
    /// changes to tracked files.
    pub fn ensure_clean_tree(&self) -> Result<()> {
        if self.runner.status(&self.git(&["diff", "--quiet"]))? != 0 {
            return Err(DiffError::DirtyWorkingTree);
        }
        Ok(())
    }

    /// Resolve HEAD to a commit SHA.
    pub fn rev_parse_head(&self) -> Result<String> {
        let output = self
            .runner
            .capture_checked(&self.git(&["rev-parse", "HEAD"]))?;
        Ok(output.stdout)
    }

    /// Name of the currently checked-out branch.
    pub fn current_branch(&self) -> Result<String> {
        let output = self
            .runner
            .capture_checked(&self.git(&["rev-parse", "--abbrev-ref", "HEAD"]))?;
        Ok(output.stdout)
    }

    /// Shallow-fetch a revision from the default remote when running in the
    /// automated build image. Local runs assume the revision is already
    /// reachable (e.g. a second checkout used for development).
    pub fn fetch_if_needed(&self, revision: &str) -> Result<()> {
        if self.mode.is_automated() {
            info!(revision, "fetching revision from origin");
            self.runner.run(&self.git(&[
                "fetch",
                "--no-tags",
                "--progress",
                "--no-recurse-submodules",
                "--depth=1",
                "origin",
                revision,
            ]))?;
        }
        Ok(())
    }

    /// Create (or reset) `branch` at `revision` and check it out. Idempotent
    /// across repeated runs thanks to `-B`.
    pub fn checkout_new_branch(&self, revision: &str, branch: &str) -> Result<()> {
        info!(revision, branch, "creating scratch branch");
        self.runner
            .run(&self.git(&["checkout", revision, "-B", branch]))
            .map_err(|_| DiffError::RevisionNotFound {
                revision: revision.to_string(),
            })
    }

    /// Check out an existing branch or revision.
    pub fn checkout(&self, reference: &str) -> Result<()> {
        self.runner.run(&self.git(&["checkout", reference]))
    }

    /// Delete a local branch.
    pub fn delete_branch(&self, branch: &str) -> Result<()> {
        self.runner
            .capture_checked(&self.git(&["branch", "-D", branch]))
            .map(|_| ())
    }

    /// Whether `path` exists in the committed tree of `branch`.
    pub fn file_exists_on_branch(&self, branch: &str, path: &str) -> Result<bool> {
        let spec = format!("{branch}:{path}");
        Ok(self.runner.status(&self.git(&["cat-file", "-e", &spec]))? == 0)
    }

    /// Remove a tracked path from the index and working tree.
    pub fn remove_tracked(&self, path: &str) -> Result<()> {
        self.runner
            .capture_checked(&self.git(&["rm", "-r", path]))
            .map(|_| ())
    }

    /// Stage a path, overriding `.gitignore` (generated build directories
    /// are normally ignored).
    pub fn stage_forced(&self, path: &str) -> Result<()> {
        self.runner
            .capture_checked(&self.git(&["add", "-f", path]))
            .map(|_| ())
    }

    /// Commit staged changes under the bot identity. Allows an empty commit
    /// so that "no change" revisions still produce a commit to diff against.
    pub fn commit_as_bot(&self, message: &str, author_name: &str, author_email: &str) -> Result<()> {
        let cmd = CommandLine::new("git")
            .arg("-c")
            .arg(format!("user.name={author_name}"))
            .arg("-c")
            .arg(format!("user.email={author_email}"))
            .args(["commit", "--no-verify", "-m"])
            .arg(message)
            .arg("--allow-empty")
            .current_dir(&self.root);
        self.runner.capture_checked(&cmd).map(|_| ())
    }
}
