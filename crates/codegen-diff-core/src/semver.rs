//! Semver compatibility checks against the SDK generated from a base
//! revision.
//!
//! Unlike the rest of the pipeline, per-crate check failures are
//! accumulated and reported together: independent crates are independent
//! check units, and one incompatible crate should not hide the others.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::builder::ArtifactBuilder;
use crate::config::{BuildTarget, DiffConfig};
use crate::error::{DiffError, Result};
use crate::process::{CommandLine, ProcessRunner};
use crate::workspace::RevisionWorkspace;

/// Branch holding the SDK generated from HEAD.
pub const CURRENT_BRANCH: &str = "current";

/// Branch holding the SDK generated from the base revision.
pub const BASE_BRANCH: &str = "base";

/// Options for one semver check run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SemverOptions {
    /// Skip the generation phase, assuming `current` and `base` already
    /// exist from a prior run.
    pub skip_generation: bool,

    /// Crate directory names to exclude from the checks.
    pub deny_list: Vec<String>,
}

/// One crate that failed its semver check.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SemverCheckFailure {
    pub crate_dir: String,
    pub output: String,
}

/// Aggregate outcome of checking every eligible crate.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SemverVerdict {
    /// Crates that were checked, in order.
    pub checked: Vec<String>,

    /// Crates skipped (deny-listed or absent from the base revision).
    pub skipped: Vec<String>,

    /// Failures, empty when all checks passed.
    pub failures: Vec<SemverCheckFailure>,
}

impl SemverVerdict {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Generate the SDK for HEAD and `base_revision` (unless skipped), then run
/// `cargo semver-checks` for every crate directory present on both branches
/// and absent from the deny list.
pub fn run_semver_checks(
    root: &Path,
    config: &DiffConfig,
    runner: &dyn ProcessRunner,
    base_revision: &str,
    options: &SemverOptions,
) -> Result<SemverVerdict> {
    let workspace = RevisionWorkspace::new(root, runner, config.mode);
    workspace.ensure_clean_tree()?;
    let head_revision = workspace.rev_parse_head()?;

    if !options.skip_generation {
        generate_sdk_for_branch(root, config, runner, &workspace, &head_revision, CURRENT_BRANCH)?;
        generate_sdk_for_branch(root, config, runner, &workspace, base_revision, BASE_BRANCH)?;
    }
    workspace.checkout(CURRENT_BRANCH)?;

    let sdk_dir = root.join("aws-sdk").join("sdk");
    let mut crate_dirs: Vec<String> = fs::read_dir(&sdk_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    crate_dirs.sort();

    let mut verdict = SemverVerdict::default();
    for name in crate_dirs {
        if options.deny_list.contains(&name) {
            info!(crate_dir = %name, "skipping deny-listed crate");
            verdict.skipped.push(name);
            continue;
        }
        let base_manifest = format!("aws-sdk/sdk/{name}/Cargo.toml");
        if !workspace.file_exists_on_branch(BASE_BRANCH, &base_manifest)? {
            info!(crate_dir = %name, "skipping crate absent from base");
            verdict.skipped.push(name);
            continue;
        }

        let pkgid = runner.capture_checked(
            &CommandLine::new("cargo")
                .arg("pkgid")
                .current_dir(sdk_dir.join(&name)),
        )?;
        let package = parse_package_id(&pkgid.stdout)?;

        info!(crate_dir = %name, package = %package, "checking");
        let check = CommandLine::new("cargo")
            .args(["semver-checks", "check-release", "--baseline-rev", BASE_BRANCH])
            // publish = false crates need the package and manifest path
            // spelled out explicitly
            .arg("--manifest-path")
            .arg(format!("{name}/Cargo.toml"))
            .arg("-v")
            .arg("-p")
            .arg(&package)
            .args(["--all-features", "--release-type", "minor"])
            .current_dir(&sdk_dir);
        let output = runner.capture(&check)?;

        if output.success() {
            info!(crate_dir = %name, "ok");
        } else {
            warn!(crate_dir = %name, "failed");
            verdict.failures.push(SemverCheckFailure {
                crate_dir: name.clone(),
                output: format!("{}{}", output.stdout, output.stderr),
            });
        }
        verdict.checked.push(name);
    }
    Ok(verdict)
}

/// Build only the SDK target for `revision` on `branch`, relocating the
/// generated SDK to the repository root so the semver checker's ignore-aware
/// crate walk can see it, and committing the result.
fn generate_sdk_for_branch(
    root: &Path,
    config: &DiffConfig,
    runner: &dyn ProcessRunner,
    workspace: &RevisionWorkspace<'_>,
    revision: &str,
    branch: &str,
) -> Result<()> {
    workspace.fetch_if_needed(revision)?;
    workspace.checkout_new_branch(revision, branch)?;

    let builder = ArtifactBuilder::new(root, config, runner);
    builder.run_gradle(&[format!("{}:clean", BuildTarget::AwsSdk.gradle_task())])?;
    builder.run_gradle(&[format!("{}:assemble", BuildTarget::AwsSdk.gradle_task())])?;

    // The runtime crates duplicate crates under the generated SDK; remove
    // them so the checker sees a single copy of each.
    workspace.remove_tracked("aws/rust-runtime")?;
    workspace.remove_tracked("rust-runtime")?;

    fs::rename(root.join("aws/sdk/build/aws-sdk"), root.join("aws-sdk"))?;
    workspace.stage_forced("aws-sdk")?;
    workspace.commit_as_bot(
        &format!("Generated code for {revision}"),
        &config.bot_name,
        &config.bot_email,
    )?;
    Ok(())
}

/// Extract the package name from `cargo pkgid` output. Handles both the
/// `path#name@version` and `path/name#version` forms.
pub fn parse_package_id(id: &str) -> Result<String> {
    if let Some((path, rest)) = id.split_once('#') {
        if let Some((name, _version)) = rest.split_once('@') {
            return Ok(name.to_string());
        }
        if let Some(name) = path.rsplit('/').next() {
            if !name.is_empty() {
                return Ok(name.to_string());
            }
        }
    }
    Err(DiffError::MalformedPackageId(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeRunner;

    #[test]
    fn parse_package_id_handles_version_only_form() {
        assert_eq!(
            parse_package_id(
                "file:///code/smithy-rs/tmp-codegen-diff/aws-sdk/sdk/aws-smithy-runtime-api#0.56.1"
            )
            .unwrap(),
            "aws-smithy-runtime-api"
        );
    }

    #[test]
    fn parse_package_id_handles_name_at_version_form() {
        assert_eq!(
            parse_package_id("file:///code/smithy-rs/tmp-codegen-diff/aws-sdk/sdk/s3#aws-sdk-s3@0.0.0-local")
                .unwrap(),
            "aws-sdk-s3"
        );
    }

    #[test]
    fn parse_package_id_rejects_unknown_format() {
        let err = parse_package_id("not-a-pkgid").unwrap_err();
        assert!(matches!(err, DiffError::MalformedPackageId(_)));
    }

    #[test]
    fn skip_generation_only_runs_the_checker() {
        let dir = tempfile::tempdir().unwrap();
        let sdk_dir = dir.path().join("aws-sdk/sdk");
        fs::create_dir_all(sdk_dir.join("crate-a")).unwrap();
        fs::create_dir_all(sdk_dir.join("crate-b")).unwrap();

        let runner = FakeRunner::new();
        runner.succeed_with("git rev-parse HEAD", &"c".repeat(40));
        // Sorted order: crate-a first
        runner.succeed_with("cargo pkgid", "file:///x/aws-sdk/sdk/crate-a#0.1.0");
        runner.succeed_with("cargo pkgid", "file:///x/aws-sdk/sdk/crate-b#crate-b@0.1.0");
        runner.fail_with(
            "cargo semver-checks check-release --baseline-rev base --manifest-path crate-b/Cargo.toml \
             -v -p crate-b --all-features --release-type minor",
            1,
            "struct removed from public API",
        );

        let config = DiffConfig::default();
        let options = SemverOptions {
            skip_generation: true,
            deny_list: vec![],
        };
        let verdict =
            run_semver_checks(dir.path(), &config, &runner, "base-sha", &options).unwrap();

        assert!(!runner.ran("gradlew"), "build system must not be invoked");
        assert_eq!(verdict.checked, vec!["crate-a", "crate-b"]);
        assert_eq!(verdict.failures.len(), 1);
        assert_eq!(verdict.failures[0].crate_dir, "crate-b");
        assert!(verdict.failures[0].output.contains("struct removed"));
        assert!(!verdict.passed());
    }

    #[test]
    fn deny_listed_and_absent_crates_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let sdk_dir = dir.path().join("aws-sdk/sdk");
        fs::create_dir_all(sdk_dir.join("denied")).unwrap();
        fs::create_dir_all(sdk_dir.join("new-crate")).unwrap();

        let runner = FakeRunner::new();
        runner.succeed_with("git rev-parse HEAD", &"d".repeat(40));
        // new-crate has no Cargo.toml on the base branch
        runner.fail_with("git cat-file -e base:aws-sdk/sdk/new-crate/Cargo.toml", 1, "");

        let config = DiffConfig::default();
        let options = SemverOptions {
            skip_generation: true,
            deny_list: vec!["denied".to_string()],
        };
        let verdict =
            run_semver_checks(dir.path(), &config, &runner, "base-sha", &options).unwrap();

        assert!(verdict.passed());
        assert!(verdict.checked.is_empty());
        assert_eq!(verdict.skipped, vec!["denied", "new-crate"]);
        assert!(!runner.ran("semver-checks"));
    }
}
