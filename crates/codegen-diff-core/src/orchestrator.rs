//! Top-level orchestration: build both revisions, diff every category, and
//! write the aggregate report.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::builder::ArtifactBuilder;
use crate::config::{DiffCategory, DiffConfig, ExecutionMode};
use crate::error::Result;
use crate::process::ProcessRunner;
use crate::reporter::{diff_link, DiffReporter};
use crate::workspace::RevisionWorkspace;

/// The final report: the bot message text and where it was written.
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub message: String,
    pub path: PathBuf,
}

/// Runs the full pipeline:
/// validate → checkout/build head → checkout/build base → diff → report.
pub struct DiffOrchestrator<'a> {
    root: PathBuf,
    config: DiffConfig,
    runner: &'a dyn ProcessRunner,
}

impl<'a> DiffOrchestrator<'a> {
    pub fn new(root: impl Into<PathBuf>, config: DiffConfig, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            root: root.into(),
            config,
            runner,
        }
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Execute the pipeline against `base_revision`, returning the written
    /// report. The head revision is whatever HEAD currently points at.
    ///
    /// Both scratch branches must coexist for the diff step, so the head
    /// build is fully committed before the base checkout begins. In local
    /// mode the starting branch is restored and the scratch branches deleted
    /// afterwards; automated runs keep them for artifact upload.
    pub fn run(&self, base_revision: &str) -> Result<DiffReport> {
        let workspace = RevisionWorkspace::new(&self.root, self.runner, self.config.mode);
        workspace.ensure_clean_tree()?;

        let head_revision = workspace.rev_parse_head()?;
        let starting_branch = workspace.current_branch()?;
        info!(head = %head_revision, base = %base_revision, "generating code for both revisions");

        self.checkout_and_generate(&workspace, &head_revision, &self.config.head_branch)?;
        self.checkout_and_generate(&workspace, base_revision, &self.config.base_branch)?;

        let message = self.make_diffs(base_revision, &head_revision)?;
        let path = self.root.join(&self.config.output_root).join("bot-message");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &message)?;
        info!(path = %path.display(), "wrote diff report");

        if self.config.mode == ExecutionMode::Local {
            self.cleanup(&workspace, &starting_branch);
        }

        Ok(DiffReport { message, path })
    }

    /// Fetch (if automated), check out a scratch branch at `revision`, and
    /// build-and-commit the configured targets onto it.
    pub fn checkout_and_generate(
        &self,
        workspace: &RevisionWorkspace<'_>,
        revision: &str,
        branch: &str,
    ) -> Result<()> {
        workspace.fetch_if_needed(revision)?;
        workspace.checkout_new_branch(revision, branch)?;
        ArtifactBuilder::new(&self.root, &self.config, self.runner).build_and_commit(
            workspace,
            revision,
            &self.config.targets,
        )
    }

    /// Best-effort restoration of the pre-run branch state. Failures are
    /// logged, not fatal: the report has already been written.
    pub(crate) fn cleanup(&self, workspace: &RevisionWorkspace<'_>, starting_branch: &str) {
        if let Err(err) = workspace.checkout(starting_branch) {
            warn!(branch = starting_branch, %err, "failed to restore starting branch");
            return;
        }
        for branch in [&self.config.head_branch, &self.config.base_branch] {
            if let Err(err) = workspace.delete_branch(branch) {
                warn!(branch = %branch, %err, "failed to delete scratch branch");
            }
        }
    }

    /// Diff every tracked category under both whitespace modes and assemble
    /// the bullet-list message. Newlines are escaped (`\n` literally) so the
    /// message survives transport to the report's consumer.
    pub(crate) fn make_diffs(&self, base_revision: &str, head_revision: &str) -> Result<String> {
        let reporter = DiffReporter::new(&self.root, &self.config, self.runner);
        let mut message = String::from("A new generated diff is ready to view.\\n");

        for category in DiffCategory::all() {
            let path = format!("{}/{}", self.config.output_root.display(), category.dir);
            let with_whitespace = reporter.make_diff(
                category.title,
                &path,
                base_revision,
                head_revision,
                category.suffix,
                true,
            )?;
            let ignore_whitespace_suffix = format!("{}-ignore-whitespace", category.suffix);
            let ignoring_whitespace = reporter.make_diff(
                category.title,
                &path,
                base_revision,
                head_revision,
                &ignore_whitespace_suffix,
                false,
            )?;

            let empty_text = format!("No codegen difference in the {}", category.title);
            let link = diff_link(
                &self.config.cdn_url,
                category.title,
                &empty_text,
                with_whitespace.as_deref(),
                "ignoring whitespace",
                ignoring_whitespace.as_deref(),
            );
            message.push_str(&format!("- {link}\\n"));
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeRunner;

    #[test]
    fn make_diffs_reports_all_categories_when_nothing_differs() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let orchestrator = DiffOrchestrator::new(dir.path(), DiffConfig::default(), &runner);

        let message = orchestrator.make_diffs("base1", "head1").unwrap();

        assert!(message.starts_with("A new generated diff is ready to view.\\n"));
        for title in [
            "AWS SDK",
            "Client Test",
            "Server Test",
            "Server Test Python",
            "Server Test Typescript",
        ] {
            assert!(
                message.contains(&format!("- No codegen difference in the {title}\\n")),
                "missing empty-state line for {title}: {message}"
            );
        }
        // Escaped newlines only, no literal ones
        assert!(!message.contains('\n'));
    }

    #[test]
    fn make_diffs_links_changed_categories() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        // Both whitespace modes of the SDK category differ
        for flag in ["", "-b "] {
            runner.fail_with(
                format!(
                    "git diff --quiet {flag}__tmp-localonly-base __tmp-localonly-head -- tmp-codegen-diff/aws-sdk"
                ),
                1,
                "",
            );
        }
        let orchestrator = DiffOrchestrator::new(dir.path(), DiffConfig::default(), &runner);

        let message = orchestrator.make_diffs("base1", "head1").unwrap();
        assert!(message.contains("[AWS SDK]("));
        assert!(message.contains("base1/head1/aws-sdk/index.html"));
        assert!(message.contains("([ignoring whitespace]("));
        assert!(message.contains("base1/head1/aws-sdk-ignore-whitespace/index.html"));
        assert!(message.contains("- No codegen difference in the Client Test\\n"));
    }
}
