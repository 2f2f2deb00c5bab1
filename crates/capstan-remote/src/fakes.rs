//! In-memory fake for the executor trait (testing only)
//!
//! `ScriptedExecutor` resolves `(host, command)` pairs against a script
//! table and records every call. Unscripted hosts behave as unreachable,
//! which keeps partial-failure paths honest in tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::executor::{CommandOutput, RemoteExecutor};
use crate::Result;

/// Scripted in-memory transport.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    outputs: Mutex<HashMap<(String, String), CommandOutput>>,
    unreachable: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful command with the given stdout.
    pub fn script_output(&self, host: &str, command: &str, stdout: &str) {
        self.script_result(
            host,
            command,
            CommandOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_status: 0,
            },
        );
    }

    /// Script a failing command.
    pub fn script_failure(&self, host: &str, command: &str, exit_status: i32, stderr: &str) {
        self.script_result(
            host,
            command,
            CommandOutput {
                stdout: String::new(),
                stderr: stderr.to_string(),
                exit_status,
            },
        );
    }

    /// Script an exact command output.
    pub fn script_result(&self, host: &str, command: &str, output: CommandOutput) {
        self.outputs
            .lock()
            .unwrap()
            .insert((host.to_string(), command.to_string()), output);
    }

    /// Make every command on the host fail at the transport level.
    pub fn script_unreachable(&self, host: &str) {
        self.unreachable.lock().unwrap().insert(host.to_string());
    }

    /// `(host, command)` pairs in invocation order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn run(&self, host: &str, command: &str) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((host.to_string(), command.to_string()));

        if self.unreachable.lock().unwrap().contains(host) {
            return Err(RemoteError::Unreachable {
                host: host.to_string(),
            });
        }

        self.outputs
            .lock()
            .unwrap()
            .get(&(host.to_string(), command.to_string()))
            .cloned()
            .ok_or_else(|| RemoteError::Unreachable {
                host: host.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_output_round_trip() {
        let executor = ScriptedExecutor::new();
        executor.script_output("web1", "cat REVISION", "abc123\n");

        let output = executor.run("web1", "cat REVISION").await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout_trimmed(), "abc123");
    }

    #[tokio::test]
    async fn unscripted_host_is_unreachable() {
        let executor = ScriptedExecutor::new();
        let err = executor.run("ghost", "ls").await.unwrap_err();
        assert!(matches!(err, RemoteError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn calls_are_recorded_in_order() {
        let executor = ScriptedExecutor::new();
        executor.script_output("web1", "ls", "");
        executor.script_output("web2", "ls", "");

        executor.run("web1", "ls").await.unwrap();
        executor.run("web2", "ls").await.unwrap();

        assert_eq!(
            executor.calls(),
            vec![
                ("web1".to_string(), "ls".to_string()),
                ("web2".to_string(), "ls".to_string()),
            ]
        );
    }
}
