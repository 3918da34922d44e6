//! Codegen diff CLI
//!
//! Builds generated code for repository revisions and reports differences.
//!
//! ## Commands
//!
//! - `revisions`: diff the generated code of HEAD against a base revision
//! - `check-deterministic`: build HEAD twice and fail if the output differs
//! - `semver-checks`: run cargo-semver-checks against a base revision's SDK

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, Level};

use codegen_diff_core::{
    check_deterministic, init_tracing, run_semver_checks, DiffConfig, DiffOrchestrator,
    ExecutionMode, SemverOptions, SystemRunner,
};

/// Environment variable that skips the generation phase of `semver-checks`,
/// assuming the branches already exist from a prior run.
const SKIP_GENERATION_ENV: &str = "SKIP_GENERATION";

#[derive(Parser)]
#[command(name = "codegen-diff")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Builds generated code for two revisions and reports the differences", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and machine-readable results
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate code for HEAD and a base revision, then diff the two
    Revisions {
        /// Repository root to operate on
        repository_root: PathBuf,

        /// Base revision to diff HEAD against
        base_commit_sha: String,
    },

    /// Build HEAD twice and fail if the generated code differs between builds
    CheckDeterministic {
        /// Repository root to operate on
        repository_root: PathBuf,
    },

    /// Run cargo-semver-checks on the generated SDK against a base revision
    SemverChecks {
        /// Repository root to operate on
        repository_root: PathBuf,

        /// Base revision to check against
        base_commit_sha: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let runner = SystemRunner;
    let config = DiffConfig {
        mode: ExecutionMode::detect(),
        ..DiffConfig::default()
    };

    match cli.command {
        Commands::Revisions {
            repository_root,
            base_commit_sha,
        } => {
            let orchestrator = DiffOrchestrator::new(repository_root, config, &runner);
            let report = orchestrator
                .run(&base_commit_sha)
                .context("codegen diff failed")?;
            if cli.json {
                println!("{}", serde_json::to_string(&report)?);
            } else {
                println!("{}", report.path.display());
            }
            Ok(())
        }
        Commands::CheckDeterministic { repository_root } => {
            check_deterministic(&repository_root, &config, &runner)
                .context("determinism check failed")
        }
        Commands::SemverChecks {
            repository_root,
            base_commit_sha,
        } => {
            let options = SemverOptions {
                skip_generation: std::env::var(SKIP_GENERATION_ENV)
                    .is_ok_and(|value| !value.is_empty()),
                deny_list: Vec::new(),
            };
            let verdict = run_semver_checks(
                &repository_root,
                &config,
                &runner,
                &base_commit_sha,
                &options,
            )?;
            if cli.json {
                println!("{}", serde_json::to_string(&verdict)?);
            }
            if !verdict.passed() {
                for failure in &verdict.failures {
                    error!(crate_dir = %failure.crate_dir, "{}", failure.output);
                }
                anyhow::bail!(
                    "{} of {} crate(s) failed semver checks",
                    verdict.failures.len(),
                    verdict.checked.len()
                );
            }
            Ok(())
        }
    }
}
