//! Capstan-Remote: Remote Execution Capability for Capstan
//!
//! Runs shell commands on named hosts and captures their output, the seam
//! the fleet reconciler uses to read per-host deployment state.
//!
//! ## Key Components
//!
//! - `RemoteExecutor`: async trait every transport implements
//! - `SshExecutor`: backend spawning the `ssh` binary, optionally tunneled
//!   through a gateway host with a shared control connection
//! - `fakes::ScriptedExecutor`: scripted in-memory transport for tests
//!
//! No retries happen at this layer; a failed host is reported as failed
//! and re-runs are operator-driven.

mod error;
pub mod executor;
pub mod fakes;
mod ssh;

pub use error::RemoteError;
pub use executor::{CommandOutput, RemoteExecutor};
pub use ssh::{SshConfig, SshExecutor};

/// Result type for capstan-remote operations
pub type Result<T> = std::result::Result<T, RemoteError>;
