//! Artifact building: invoke the external build system, relocate its output
//! into the normalized layout, strip nondeterministic metadata, and commit
//! the result as a synthetic revision.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{BuildTarget, DiffConfig};
use crate::error::{DiffError, Result};
use crate::process::{CommandLine, ProcessRunner};
use crate::workspace::RevisionWorkspace;

/// Files that encode environment-specific or timestamp-bearing data and must
/// not participate in the diff.
const EXCLUDED_FILES: &[&str] = &["smithy-build-info.json", "model.json"];

/// Builds artifact trees and commits them onto the current branch.
pub struct ArtifactBuilder<'a> {
    root: PathBuf,
    config: &'a DiffConfig,
    runner: &'a dyn ProcessRunner,
}

impl<'a> ArtifactBuilder<'a> {
    pub fn new(root: impl Into<PathBuf>, config: &'a DiffConfig, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            root: root.into(),
            config,
            runner,
        }
    }

    /// Build all configured targets for `revision` and commit the relocated,
    /// filtered artifact tree on the current branch.
    ///
    /// Any build step failure is fatal to the whole run; no partial
    /// artifacts are retained.
    pub fn build_and_commit(
        &self,
        workspace: &RevisionWorkspace<'_>,
        revision: &str,
        targets: &[BuildTarget],
    ) -> Result<()> {
        info!(revision, "building generated code");

        // Stale output from a previous run must not leak into this one
        remove_dir_if_exists(&self.root.join("aws/sdk/build"))?;

        let clean: Vec<String> = targets
            .iter()
            .map(|t| format!("{}:clean", t.gradle_task()))
            .collect();
        let assemble: Vec<String> = targets
            .iter()
            .map(|t| format!("{}:assemble", t.gradle_task()))
            .collect();
        self.run_gradle(&clean)?;
        self.run_gradle(&assemble)?;

        self.relocate(targets)?;
        self.strip_metadata(targets)?;

        workspace.stage_forced(&self.config.output_root.display().to_string())?;
        workspace.commit_as_bot(
            &format!("Generated code for {revision}"),
            &self.config.bot_name,
            &self.config.bot_email,
        )?;
        Ok(())
    }

    /// Invoke the build system for the given tasks, with task caching
    /// disabled so every run regenerates from scratch.
    pub fn run_gradle(&self, tasks: &[String]) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        let task_list = tasks.join(" ");
        let cmd = CommandLine::new(&self.config.gradle_program)
            .arg("--rerun-tasks")
            .args(tasks.iter().cloned())
            .current_dir(&self.root);
        info!(tasks = %task_list, "running build");
        self.runner.capture_checked(&cmd).map_err(|err| match err {
            DiffError::CommandFailed { stderr, .. } => DiffError::BuildFailed {
                task: task_list.clone(),
                output: stderr,
            },
            other => other,
        })?;
        Ok(())
    }

    /// Move each target's build output under the output root, triggering the
    /// per-language stub sub-builds for included server language targets.
    fn relocate(&self, targets: &[BuildTarget]) -> Result<()> {
        let out = self.root.join(&self.config.output_root);
        remove_dir_if_exists(&out)?;
        fs::create_dir_all(&out)?;

        if targets.contains(&BuildTarget::AwsSdk) {
            fs::rename(self.root.join("aws/sdk/build/aws-sdk"), out.join("aws-sdk"))?;
        }

        for target in [BuildTarget::CodegenClientTest, BuildTarget::CodegenServerTest] {
            if !targets.contains(&target) {
                continue;
            }
            let dir = target.output_dir();
            fs::rename(
                self.root.join(dir).join("build/smithyprojections").join(dir),
                out.join(dir),
            )?;

            if target == BuildTarget::CodegenServerTest {
                for language_target in targets.iter().filter(|t| t.language().is_some()) {
                    let language = language_target.language().unwrap();
                    self.run_gradle(&[format!("{}:stubs", language_target.gradle_task())])?;
                    fs::rename(
                        self.root
                            .join(dir)
                            .join(language)
                            .join("build/smithyprojections")
                            .join(format!("{dir}-{language}")),
                        out.join(language_target.output_dir()),
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Remove build metadata that varies in ways unrelated to the generated
    /// code under comparison.
    fn strip_metadata(&self, targets: &[BuildTarget]) -> Result<()> {
        let out = self.root.join(&self.config.output_root);
        for target in targets {
            if *target == BuildTarget::AwsSdk {
                remove_file_if_exists(&out.join("aws-sdk/versions.toml"))?;
            } else {
                strip_build_metadata(&out.join(target.output_dir()))?;
            }
        }
        Ok(())
    }
}

/// Delete the raw `source` directory plus every `smithy-build-info.json`,
/// `sources/manifest`, and `model.json` file under `dir`. Idempotent; a
/// missing directory is a no-op.
pub fn strip_build_metadata(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let source = dir.join("source");
    remove_dir_if_exists(&source)?;

    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        let in_sources = name == "manifest"
            && entry
                .path()
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n == "sources")
                .unwrap_or(false);
        if EXCLUDED_FILES.contains(&name.as_ref()) || in_sources {
            debug!(path = %entry.path().display(), "removing build metadata");
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
