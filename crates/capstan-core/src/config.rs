//! Typed configuration for the deploy components.
//!
//! Every component takes its configuration explicitly through its
//! constructor; there is no ambient or process-wide lookup.

use serde::{Deserialize, Serialize};

/// Policy knobs for one deploy target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployPolicy {
    /// Stage/environment name, e.g. `"staging"` or `"production"`.
    pub environment: String,

    /// Production stages never bypass the sanity check via the reverse
    /// override flag, only via interactive confirmation.
    pub production: bool,

    /// Skip the sanity check entirely (operator/config flag).
    pub skip_sanity_check: bool,

    /// Reverse deploys allowed without confirmation, honoured for
    /// non-production stages only.
    pub allow_reverse_deploy: bool,

    /// Explicit remote name; when unset the preferred-remote policy
    /// applies (single configured remote, else `"origin"`).
    pub remote_override: Option<String>,
}

impl DeployPolicy {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            production: false,
            skip_sanity_check: false,
            allow_reverse_deploy: false,
            remote_override: None,
        }
    }

    pub fn production(environment: impl Into<String>) -> Self {
        Self {
            production: true,
            ..Self::new(environment)
        }
    }
}

/// Configuration for fleet reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Deployment root on every host, e.g. `/var/www/app`; releases live
    /// under `{deploy_root}/releases` and the live code behind
    /// `{deploy_root}/current`.
    pub deploy_root: String,

    /// Upper bound on concurrent per-host sessions.
    pub max_concurrency: usize,

    /// When true, lingering-release cleanup reports but never deletes.
    pub preserve_lingering: bool,
}

impl FleetConfig {
    pub fn new(deploy_root: impl Into<String>) -> Self {
        Self {
            deploy_root: deploy_root.into(),
            max_concurrency: 8,
            preserve_lingering: false,
        }
    }

    /// `{deploy_root}/releases`
    pub fn releases_path(&self) -> String {
        format!("{}/releases", self.deploy_root)
    }

    /// `{deploy_root}/current`
    pub fn current_path(&self) -> String {
        format!("{}/current", self.deploy_root)
    }
}
