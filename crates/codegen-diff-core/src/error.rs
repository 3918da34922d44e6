//! Error taxonomy for the codegen diff pipeline.

/// Errors produced by the codegen diff pipeline.
///
/// Every variant except the semver verdict (which accumulates per-crate
/// failures separately, see [`crate::semver::SemverVerdict`]) aborts the run
/// immediately; there are no retries anywhere in the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("working tree is not clean, aborting")]
    DirtyWorkingTree,

    #[error("revision not found: {revision}")]
    RevisionNotFound { revision: String },

    #[error("command `{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("build failed for `{task}`: {output}")]
    BuildFailed { task: String, output: String },

    #[error("generated code for revision {revision} is not deterministic")]
    NondeterministicCodegen { revision: String },

    #[error("unrecognized cargo pkgid format: {0}")]
    MalformedPackageId(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for codegen diff operations.
pub type Result<T> = std::result::Result<T, DiffError>;
