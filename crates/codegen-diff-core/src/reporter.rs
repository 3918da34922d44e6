//! Diff computation and rendered report links.

use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::config::DiffConfig;
use crate::error::Result;
use crate::process::{CommandLine, ProcessRunner};

/// Context lines to include in the raw diff.
const DIFF_CONTEXT: &str = "-U30";

/// Computes diffs between the two scratch branches' committed artifact
/// trees and renders them as HTML pages through the external renderer.
pub struct DiffReporter<'a> {
    root: PathBuf,
    config: &'a DiffConfig,
    runner: &'a dyn ProcessRunner,
}

impl<'a> DiffReporter<'a> {
    pub fn new(root: impl Into<PathBuf>, config: &'a DiffConfig, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            root: root.into(),
            config,
            runner,
        }
    }

    /// Diff `path` between the base and head scratch branches. Returns the
    /// relative path of the rendered index page, or `None` when the trees do
    /// not differ. `whitespace: false` ignores whitespace-only changes.
    pub fn make_diff(
        &self,
        title: &str,
        path: &str,
        base_sha: &str,
        head_sha: &str,
        suffix: &str,
        whitespace: bool,
    ) -> Result<Option<String>> {
        let mut quiet = CommandLine::new("git").args(["diff", "--quiet"]);
        if !whitespace {
            quiet = quiet.arg("-b");
        }
        let quiet = quiet
            .arg(self.config.base_branch.as_str())
            .arg(self.config.head_branch.as_str())
            .arg("--")
            .arg(path)
            .current_dir(&self.root);

        if self.runner.status(&quiet)? == 0 {
            info!(base = %base_sha, head = %head_sha, suffix, "no diff output");
            return Ok(None);
        }

        let partial = format!("{base_sha}/{head_sha}/{suffix}");
        let full = self.root.join(&self.config.output_root).join(&partial);
        fs::create_dir_all(&full)?;

        let mut diff = CommandLine::new("git").args(["diff", DIFF_CONTEXT]);
        if !whitespace {
            diff = diff.arg("-b");
        }
        let diff = diff
            .arg(self.config.base_branch.as_str())
            .arg(self.config.head_branch.as_str())
            .arg("--")
            .arg(path)
            .current_dir(&self.root);
        let raw = self.runner.capture_checked(&diff)?;

        let diff_file = full.join("codegen-diff.txt");
        fs::write(&diff_file, raw.stdout)?;

        let whitespace_note = if whitespace { "" } else { " (ignoring whitespace)" };
        let subtitle = format!("rev. {head_sha}{whitespace_note}");
        let render = CommandLine::new(&self.config.renderer_program)
            .arg("--output-dir")
            .arg(full.display().to_string())
            .arg("--title")
            .arg(title)
            .arg("--subtitle")
            .arg(&subtitle)
            .arg(diff_file.display().to_string())
            .current_dir(&self.root);
        info!(command = %render, "rendering HTML diff");
        self.runner.run(&render)?;

        Ok(Some(format!("{partial}/index.html")))
    }
}

/// Render a markdown link pair for a diff result: the primary CDN link with
/// the alternate-whitespace-mode link nested after it, or the empty-state
/// text when there is no difference.
pub fn diff_link(
    cdn_url: &str,
    diff_text: &str,
    empty_diff_text: &str,
    diff_location: Option<&str>,
    alternate_text: &str,
    alternate_location: Option<&str>,
) -> String {
    match (diff_location, alternate_location) {
        (None, _) => empty_diff_text.to_string(),
        (Some(location), Some(alternate)) => format!(
            "[{diff_text}]({cdn_url}/codegen-diff/{location}) \
             ([{alternate_text}]({cdn_url}/codegen-diff/{alternate}))"
        ),
        // Only whitespace changed: no alternate page was generated
        (Some(location), None) => {
            format!("[{diff_text}]({cdn_url}/codegen-diff/{location})")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeRunner;

    const CDN: &str = "https://cdn.example.com";

    #[test]
    fn diff_link_empty_state_is_verbatim() {
        let link = diff_link(
            CDN,
            "AWS SDK",
            "No codegen difference in the AWS SDK",
            None,
            "ignoring whitespace",
            None,
        );
        assert_eq!(link, "No codegen difference in the AWS SDK");
    }

    #[test]
    fn diff_link_composes_both_urls() {
        let link = diff_link(
            CDN,
            "AWS SDK",
            "empty",
            Some("base/head/aws-sdk/index.html"),
            "ignoring whitespace",
            Some("base/head/aws-sdk-ignore-whitespace/index.html"),
        );
        assert_eq!(
            link,
            "[AWS SDK](https://cdn.example.com/codegen-diff/base/head/aws-sdk/index.html) \
             ([ignoring whitespace](https://cdn.example.com/codegen-diff/base/head/aws-sdk-ignore-whitespace/index.html))"
        );
    }

    #[test]
    fn diff_link_omits_missing_alternate() {
        let link = diff_link(CDN, "AWS SDK", "empty", Some("a/b/c/index.html"), "alt", None);
        assert_eq!(link, "[AWS SDK](https://cdn.example.com/codegen-diff/a/b/c/index.html)");
    }

    #[test]
    fn no_difference_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let config = DiffConfig::default();
        let runner = FakeRunner::new();
        let reporter = DiffReporter::new(dir.path(), &config, &runner);

        let result = reporter
            .make_diff("AWS SDK", "tmp-codegen-diff/aws-sdk", "base1", "head1", "aws-sdk", true)
            .unwrap();
        assert!(result.is_none());
        assert!(runner.ran(
            "git diff --quiet __tmp-localonly-base __tmp-localonly-head -- tmp-codegen-diff/aws-sdk"
        ));
    }

    #[test]
    fn whitespace_insensitive_diff_passes_b_flag() {
        let dir = tempfile::tempdir().unwrap();
        let config = DiffConfig::default();
        let runner = FakeRunner::new();
        let reporter = DiffReporter::new(dir.path(), &config, &runner);

        reporter
            .make_diff("AWS SDK", "tmp-codegen-diff/aws-sdk", "b", "h", "aws-sdk-ignore-whitespace", false)
            .unwrap();
        assert!(runner.ran("git diff --quiet -b"));
    }

    #[test]
    fn difference_renders_page_and_returns_index_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = DiffConfig::default();
        let runner = FakeRunner::new();
        runner.fail_with(
            "git diff --quiet __tmp-localonly-base __tmp-localonly-head -- tmp-codegen-diff/aws-sdk",
            1,
            "",
        );
        let reporter = DiffReporter::new(dir.path(), &config, &runner);

        let result = reporter
            .make_diff("AWS SDK", "tmp-codegen-diff/aws-sdk", "base1", "head1", "aws-sdk", true)
            .unwrap();
        assert_eq!(result.as_deref(), Some("base1/head1/aws-sdk/index.html"));

        // Raw diff materialized for the renderer
        assert!(dir
            .path()
            .join("tmp-codegen-diff/base1/head1/aws-sdk/codegen-diff.txt")
            .exists());
        assert!(runner.ran("difftags --output-dir"));
        assert!(runner.ran("--subtitle \"rev. head1\""));
    }
}
