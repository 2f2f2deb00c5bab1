//! Capstan Core Library
//!
//! Deployment-tag lifecycle management with safety gating: derive a
//! canonical tag for the code under deployment, verify the tag is a
//! descendant of whatever is currently running, and reconcile the
//! fleet's view of what revision is actually live where.
//!
//! Version control, remote execution, and chat delivery are consumed
//! through capability traits (`capstan_git::VcsClient`,
//! `capstan_remote::RemoteExecutor`, [`notify::Notifier`]); the core is
//! invoked programmatically by an external deploy orchestrator.

pub mod config;
pub mod deploy;
pub mod domain;
pub mod fleet;
pub mod notify;
pub mod resolver;
pub mod sanity;
pub mod slack;
pub mod tags;
pub mod telemetry;

pub use config::{DeployPolicy, FleetConfig};

pub use domain::{
    marker_tag_name, parse_marker_tag, working_tag_name, CapstanError, DeploymentTag,
    HostSnapshot, ReleaseFolder, Result, RevisionGroup, SanityDecision, SkipReason,
    UNDETERMINED_REVISION, UNKNOWN_REVISION,
};

pub use capstan_git::{CommitHash, GitCli, GitError, LogEntry, VcsClient};
pub use capstan_remote::{CommandOutput, RemoteError, RemoteExecutor, SshConfig, SshExecutor};

pub use deploy::{DeployAttempt, DeployId, DeployWorkflow};
pub use fleet::{
    cleanup_command, detect_lingering_releases, detect_multiple_current_revisions,
    group_by_revision_set, parse_ls_l, rolling_batch_size, CleanupReport, FleetReconciler,
};
pub use notify::{build_changelog, Announcement, ChangelogEntry, Notifier, NullNotifier, Wrapup};
pub use resolver::{preferred_remote, RevisionResolver};
pub use sanity::{skip_reason, DeployConfirmer, SanityChecker};
pub use slack::{SlackConfig, SlackNotifier};
pub use tags::TagLifecycleManager;
pub use telemetry::init_tracing;
