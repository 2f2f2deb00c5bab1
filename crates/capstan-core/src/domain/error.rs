//! Domain-level error taxonomy for Capstan.

use capstan_git::{CommitHash, GitError};
use capstan_remote::RemoteError;

/// Capstan domain errors.
///
/// Anything touching the git/tag state machine is fatal and carries the
/// exact tag/SHA values involved; these decisions gate an irreversible
/// action. Per-host failures during fleet reconciliation never appear
/// here; they are downgraded to sentinel values in the snapshot.
#[derive(Debug, thiserror::Error)]
pub enum CapstanError {
    #[error("detached HEAD: cannot cut a tag without a named branch")]
    DetachedHead,

    #[error("ref not found: {refish}")]
    RefNotFound { refish: String },

    #[error(
        "deploying {deploy_sha} would not contain {current_sha}, the commit currently \
         running; operation aborted for your safety"
    )]
    UnsafeDeploy {
        deploy_sha: CommitHash,
        current_sha: CommitHash,
    },

    #[error("cannot roll back: only {found} recorded deployment(s) to {environment}")]
    InsufficientHistory { environment: String, found: usize },

    #[error("tag under deploy changed mid-flight: expected {expected}, got {actual}")]
    TagCacheMismatch { expected: String, actual: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("git error: {0}")]
    Git(GitError),

    #[error("remote execution error: {0}")]
    Remote(#[from] RemoteError),

    #[error("notification error: {reason}")]
    Notify { reason: String },
}

impl From<GitError> for CapstanError {
    fn from(err: GitError) -> Self {
        // Lift the variants the deploy state machine branches on; the rest
        // stay wrapped.
        match err {
            GitError::DetachedHead => CapstanError::DetachedHead,
            GitError::RefNotFound { refish } => CapstanError::RefNotFound { refish },
            other => CapstanError::Git(other),
        }
    }
}

/// Result type for Capstan domain operations.
pub type Result<T> = std::result::Result<T, CapstanError>;
