//! Error types for capstan-git

use thiserror::Error;

/// Errors that can occur while talking to the version control client
#[derive(Error, Debug)]
pub enum GitError {
    /// The ref could not be resolved locally or remotely
    #[error("ref not found: {refish}")]
    RefNotFound { refish: String },

    /// The working copy is not on a named branch
    #[error("detached HEAD: the working copy is not on a named branch")]
    DetachedHead,

    /// A git invocation exited non-zero
    #[error("git {command} failed with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// A value that should be a commit hash was not 40 lowercase hex chars
    #[error("invalid commit hash: {value}")]
    InvalidHash { value: String },

    /// Spawning or reading from the git process failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
