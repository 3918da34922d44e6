//! Determinism check: building the same revision twice must produce
//! byte-identical artifact trees.

use std::path::Path;

use tracing::info;

use crate::config::{DiffConfig, ExecutionMode};
use crate::error::{DiffError, Result};
use crate::orchestrator::DiffOrchestrator;
use crate::process::{CommandLine, ProcessRunner};
use crate::workspace::RevisionWorkspace;

/// Build HEAD onto both scratch branches and fail with
/// [`DiffError::NondeterministicCodegen`] if the committed artifact trees
/// differ at all.
pub fn check_deterministic(root: &Path, config: &DiffConfig, runner: &dyn ProcessRunner) -> Result<()> {
    let workspace = RevisionWorkspace::new(root, runner, config.mode);
    workspace.ensure_clean_tree()?;

    let head_revision = workspace.rev_parse_head()?;
    let starting_branch = workspace.current_branch()?;
    info!(revision = %head_revision, "building revision twice to verify determinism");

    let orchestrator = DiffOrchestrator::new(root, config.clone(), runner);
    orchestrator.checkout_and_generate(&workspace, &head_revision, &config.head_branch)?;
    orchestrator.checkout_and_generate(&workspace, &head_revision, &config.base_branch)?;

    let status = runner.status(
        &CommandLine::new("git")
            .args(["diff", "--quiet"])
            .arg(config.head_branch.as_str())
            .arg(config.base_branch.as_str())
            .arg("--")
            .arg(config.output_root.display().to_string())
            .current_dir(root),
    )?;

    if config.mode == ExecutionMode::Local {
        orchestrator.cleanup(&workspace, &starting_branch);
    }

    if status != 0 {
        return Err(DiffError::NondeterministicCodegen {
            revision: head_revision,
        });
    }
    info!("generated code is deterministic");
    Ok(())
}
