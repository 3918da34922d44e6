//! Pipeline configuration: branch names, output layout, build targets.
//!
//! Everything the orchestrator needs is carried explicitly in [`DiffConfig`]
//! so test runs can use distinct paths and branch names; the only
//! environment read happens in [`ExecutionMode::detect`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable that marks an automated (CI container) run.
pub const DOCKER_BUILD_ENV: &str = "SMITHY_RS_DOCKER_BUILD_IMAGE";

/// Whether the pipeline runs locally or inside the automated build image.
///
/// Automated runs fetch revisions shallowly before checkout and leave the
/// scratch branches in place for artifact upload; local runs assume the
/// revisions are already reachable and clean up after themselves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Local,
    Automated,
}

impl ExecutionMode {
    /// Detect the mode from the environment.
    pub fn detect() -> Self {
        if std::env::var(DOCKER_BUILD_ENV).as_deref() == Ok("1") {
            ExecutionMode::Automated
        } else {
            ExecutionMode::Local
        }
    }

    pub fn is_automated(&self) -> bool {
        matches!(self, ExecutionMode::Automated)
    }
}

/// A named unit of the external build system, producing one artifact subtree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum BuildTarget {
    CodegenClientTest,
    CodegenServerTest,
    CodegenServerTestPython,
    CodegenServerTestTypescript,
    AwsSdk,
}

impl BuildTarget {
    /// The canonical default target set.
    pub fn all() -> Vec<BuildTarget> {
        vec![
            BuildTarget::CodegenClientTest,
            BuildTarget::CodegenServerTest,
            BuildTarget::AwsSdk,
            BuildTarget::CodegenServerTestPython,
            BuildTarget::CodegenServerTestTypescript,
        ]
    }

    /// Gradle task prefix for this target (`<prefix>:clean` / `<prefix>:assemble`).
    pub fn gradle_task(&self) -> &'static str {
        match self {
            BuildTarget::CodegenClientTest => "codegen-client-test",
            BuildTarget::CodegenServerTest => "codegen-server-test",
            BuildTarget::CodegenServerTestPython => "codegen-server-test:python",
            BuildTarget::CodegenServerTestTypescript => "codegen-server-test:typescript",
            BuildTarget::AwsSdk => "aws:sdk",
        }
    }

    /// Subdirectory of the output root this target's artifacts land in.
    pub fn output_dir(&self) -> &'static str {
        match self {
            BuildTarget::CodegenClientTest => "codegen-client-test",
            BuildTarget::CodegenServerTest => "codegen-server-test",
            BuildTarget::CodegenServerTestPython => "codegen-server-test-python",
            BuildTarget::CodegenServerTestTypescript => "codegen-server-test-typescript",
            BuildTarget::AwsSdk => "aws-sdk",
        }
    }

    /// The generated output language for server-test language targets.
    pub fn language(&self) -> Option<&'static str> {
        match self {
            BuildTarget::CodegenServerTestPython => Some("python"),
            BuildTarget::CodegenServerTestTypescript => Some("typescript"),
            _ => None,
        }
    }
}

/// One tracked diff category: a title for the rendered page, the artifact
/// subdirectory to diff, and the suffix used in the diff page path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffCategory {
    pub title: &'static str,
    pub dir: &'static str,
    pub suffix: &'static str,
}

impl DiffCategory {
    /// The fixed list of categories the report covers. Categories whose
    /// artifacts were not built simply diff as empty.
    pub fn all() -> [DiffCategory; 5] {
        [
            DiffCategory {
                title: "AWS SDK",
                dir: "aws-sdk",
                suffix: "aws-sdk",
            },
            DiffCategory {
                title: "Client Test",
                dir: "codegen-client-test",
                suffix: "client-test",
            },
            DiffCategory {
                title: "Server Test",
                dir: "codegen-server-test",
                suffix: "server-test",
            },
            DiffCategory {
                title: "Server Test Python",
                dir: "codegen-server-test-python",
                suffix: "server-test-python",
            },
            DiffCategory {
                title: "Server Test Typescript",
                dir: "codegen-server-test-typescript",
                suffix: "server-test-typescript",
            },
        ]
    }
}

/// Configuration for one orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiffConfig {
    /// Scratch branch holding the generated code for the head revision.
    pub head_branch: String,

    /// Scratch branch holding the generated code for the base revision.
    pub base_branch: String,

    /// Output root for relocated artifacts, rendered diffs, and the report.
    pub output_root: PathBuf,

    /// CDN prefix the rendered diff pages are served from.
    pub cdn_url: String,

    /// Author name for the synthetic generated-code commits.
    pub bot_name: String,

    /// Author email for the synthetic generated-code commits.
    pub bot_email: String,

    /// Build system entry point, invoked from the repository root.
    pub gradle_program: String,

    /// External diff-to-HTML renderer binary.
    pub renderer_program: String,

    /// Local or automated execution.
    pub mode: ExecutionMode,

    /// Build targets for this run.
    pub targets: Vec<BuildTarget>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            head_branch: "__tmp-localonly-head".to_string(),
            base_branch: "__tmp-localonly-base".to_string(),
            output_root: PathBuf::from("tmp-codegen-diff"),
            cdn_url: "https://d2luzm2xt3nokh.cloudfront.net".to_string(),
            bot_name: "GitHub Action (generated code preview)".to_string(),
            bot_email: "generated-code-action@github.com".to_string(),
            gradle_program: "./gradlew".to_string(),
            renderer_program: "difftags".to_string(),
            mode: ExecutionMode::Local,
            targets: BuildTarget::all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiffConfig::default();
        assert_eq!(config.head_branch, "__tmp-localonly-head");
        assert_eq!(config.base_branch, "__tmp-localonly-base");
        assert_eq!(config.output_root, PathBuf::from("tmp-codegen-diff"));
        assert_eq!(config.mode, ExecutionMode::Local);
        assert_eq!(config.targets.len(), 5);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = DiffConfig {
            head_branch: "head".to_string(),
            base_branch: "base".to_string(),
            targets: vec![BuildTarget::AwsSdk],
            mode: ExecutionMode::Automated,
            ..DiffConfig::default()
        };
        let json = serde_json::to_string(&config).expect("serialize");
        let deserialized: DiffConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_gradle_task_names() {
        assert_eq!(BuildTarget::AwsSdk.gradle_task(), "aws:sdk");
        assert_eq!(
            BuildTarget::CodegenServerTestPython.gradle_task(),
            "codegen-server-test:python"
        );
        assert_eq!(
            BuildTarget::CodegenClientTest.gradle_task(),
            "codegen-client-test"
        );
    }

    #[test]
    fn test_output_dirs_match_categories() {
        // Every category over a buildable target must agree on the directory
        let categories = DiffCategory::all();
        for target in BuildTarget::all() {
            assert!(
                categories.iter().any(|c| c.dir == target.output_dir()),
                "no diff category for {:?}",
                target
            );
        }
    }

    #[test]
    fn test_language_targets() {
        assert_eq!(BuildTarget::CodegenServerTestPython.language(), Some("python"));
        assert_eq!(
            BuildTarget::CodegenServerTestTypescript.language(),
            Some("typescript")
        );
        assert_eq!(BuildTarget::AwsSdk.language(), None);
        assert_eq!(BuildTarget::CodegenServerTest.language(), None);
    }

    #[test]
    fn test_execution_mode() {
        assert!(ExecutionMode::Automated.is_automated());
        assert!(!ExecutionMode::Local.is_automated());
    }
}
