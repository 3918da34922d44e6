//! Codegen Diff Core Library
//!
//! Orchestrates building generated code for two repository revisions and
//! producing a navigable diff report between them.
//!
//! The pipeline is strictly sequential: validate the working tree, check out
//! and build the head revision onto a scratch branch, do the same for the
//! base revision, diff the two committed artifact trees per category, and
//! write the aggregate report.

pub mod builder;
pub mod config;
pub mod determinism;
pub mod error;
pub mod fakes;
pub mod orchestrator;
pub mod process;
pub mod reporter;
pub mod semver;
pub mod telemetry;
pub mod workspace;

pub use builder::ArtifactBuilder;
pub use config::{BuildTarget, DiffCategory, DiffConfig, ExecutionMode};
pub use determinism::check_deterministic;
pub use error::{DiffError, Result};
pub use orchestrator::{DiffOrchestrator, DiffReport};
pub use process::{CommandLine, CommandOutput, ProcessRunner, SystemRunner};
pub use reporter::{diff_link, DiffReporter};
pub use semver::{run_semver_checks, SemverCheckFailure, SemverOptions, SemverVerdict};
pub use telemetry::init_tracing;
pub use workspace::RevisionWorkspace;
