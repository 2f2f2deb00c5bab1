//! Executor trait definition for capstan-remote.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Captured output of one remote command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: i32,
}

impl CommandOutput {
    /// Zero exit status.
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }

    /// Stdout with surrounding whitespace removed.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Remote command transport.
///
/// A non-zero exit status of the command itself is data, not an error:
/// `run` returns `Ok(CommandOutput)` and callers inspect `exit_status`.
/// Errors are reserved for transport failures (unreachable host, timeout).
///
/// One connection per host at a time; per-host calls are independent and
/// safe to fan out concurrently.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a shell command on the named host.
    async fn run(&self, host: &str, command: &str) -> Result<CommandOutput>;
}

// Consumers own their transport generically; sharing one across callers
// goes through an Arc.
#[async_trait]
impl<T: RemoteExecutor + ?Sized> RemoteExecutor for std::sync::Arc<T> {
    async fn run(&self, host: &str, command: &str) -> Result<CommandOutput> {
        (**self).run(host, command).await
    }
}
