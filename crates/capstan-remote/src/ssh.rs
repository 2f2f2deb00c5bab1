//! `ssh`-spawning backend for [`RemoteExecutor`].

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::executor::{CommandOutput, RemoteExecutor};
use crate::Result;

/// ssh uses exit status 255 for its own (transport) failures; anything
/// else is the remote command's status.
const SSH_TRANSPORT_FAILURE: i32 = 255;

/// Transport configuration for [`SshExecutor`].
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Login user; `None` defers to ssh config.
    pub user: Option<String>,
    pub port: u16,
    /// Jump host every session is tunneled through, when set.
    pub gateway: Option<String>,
    pub connect_timeout: Duration,
    /// Wall-clock budget per command, so one unreachable host cannot
    /// stall a whole fleet report.
    pub command_timeout: Duration,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: None,
            port: 22,
            gateway: None,
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(60),
        }
    }
}

/// `RemoteExecutor` backend that spawns the `ssh` binary.
///
/// When a gateway is configured, sessions are tunneled with `-J` over a
/// shared control-master connection: opened on first use, reused by every
/// session in the batch, closed when the executor is dropped.
pub struct SshExecutor {
    config: SshConfig,
    control_path: Option<PathBuf>,
}

impl SshExecutor {
    pub fn new(config: SshConfig) -> Self {
        let control_path = config.gateway.as_ref().map(|_| {
            std::env::temp_dir().join(format!("capstan-ssh-{}.sock", std::process::id()))
        });
        Self {
            config,
            control_path,
        }
    }

    /// Argument vector for one session, exposed for construction tests.
    pub fn build_args(&self, host: &str, command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!(
                "ConnectTimeout={}",
                self.config.connect_timeout.as_secs().max(1)
            ),
            "-p".to_string(),
            self.config.port.to_string(),
        ];
        if let Some(gateway) = &self.config.gateway {
            args.push("-J".to_string());
            args.push(gateway.clone());
            if let Some(control_path) = &self.control_path {
                args.push("-o".to_string());
                args.push("ControlMaster=auto".to_string());
                args.push("-o".to_string());
                args.push(format!("ControlPath={}", control_path.display()));
                args.push("-o".to_string());
                args.push("ControlPersist=60".to_string());
            }
        }
        let destination = match &self.config.user {
            Some(user) => format!("{user}@{host}"),
            None => host.to_string(),
        };
        args.push(destination);
        args.push(command.to_string());
        args
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn run(&self, host: &str, command: &str) -> Result<CommandOutput> {
        let args = self.build_args(host, command);
        debug!(host, command, "running remote command");

        let child = Command::new("ssh").args(&args).output();
        let output = tokio::time::timeout(self.config.command_timeout, child)
            .await
            .map_err(|_| RemoteError::Timeout {
                host: host.to_string(),
                seconds: self.config.command_timeout.as_secs(),
            })??;

        let exit_status = output.status.code().unwrap_or(-1);
        if exit_status == SSH_TRANSPORT_FAILURE {
            warn!(host, "ssh transport failure");
            return Err(RemoteError::Unreachable {
                host: host.to_string(),
            });
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_status,
        })
    }
}

impl Drop for SshExecutor {
    fn drop(&mut self) {
        // Tear the shared gateway connection down with the batch.
        if let (Some(control_path), Some(gateway)) =
            (&self.control_path, &self.config.gateway)
        {
            if control_path.exists() {
                let _ = std::process::Command::new("ssh")
                    .args([
                        "-o",
                        &format!("ControlPath={}", control_path.display()),
                        "-O",
                        "exit",
                        gateway,
                    ])
                    .output();
            }
        }
    }
}
