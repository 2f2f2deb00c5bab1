//! Error types for capstan-remote

use thiserror::Error;

/// Errors that can occur while executing a command on a remote host
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The transport could not reach the host at all
    #[error("host unreachable: {host}")]
    Unreachable { host: String },

    /// The transport connected but the session itself failed
    #[error("remote command failed on {host}: {command} (exit {exit_status})")]
    CommandFailed {
        host: String,
        command: String,
        exit_status: i32,
    },

    /// The command did not complete within the configured timeout
    #[error("command timed out on {host} after {seconds}s")]
    Timeout { host: String, seconds: u64 },

    /// Spawning or reading from the transport process failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
