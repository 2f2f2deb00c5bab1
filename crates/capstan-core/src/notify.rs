//! Deploy notification hooks.
//!
//! The deploy workflow announces when a deploy starts and when it
//! finishes. Delivery is behind the [`Notifier`] trait; the Slack
//! incoming-webhook backend lives in [`crate::slack`].

use async_trait::async_trait;
use capstan_git::VcsClient;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::deploy::DeployId;
use crate::domain::Result;

/// One changelog line shown in a starting announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    /// First line of the commit message.
    pub summary: String,
    /// Link to the commit in the SCM web UI.
    pub commit_link: String,
}

/// "Someone is deploying" message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub deploy_id: DeployId,
    pub deployer: String,
    pub environment: String,
    /// Tag or branch being deployed.
    pub revision_label: String,
    /// May be empty; a missing changelog never blocks the announcement.
    pub changelog: Vec<ChangelogEntry>,
}

/// "Deploy finished" message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wrapup {
    pub deploy_id: DeployId,
    pub deployer: String,
    pub environment: String,
    pub duration_seconds: u64,
}

/// Chat/notification delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_starting(&self, announcement: &Announcement) -> Result<()>;
    async fn notify_finished(&self, wrapup: &Wrapup) -> Result<()>;
}

/// Notifications disabled.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify_starting(&self, _announcement: &Announcement) -> Result<()> {
        Ok(())
    }

    async fn notify_finished(&self, _wrapup: &Wrapup) -> Result<()> {
        Ok(())
    }
}

/// Changelog between the running and incoming revisions, rendered with
/// commit links. Any failure yields an empty changelog; the
/// announcement still goes out, just without the changelog section.
pub fn build_changelog<V: VcsClient>(
    vcs: &V,
    scm_base_url: &str,
    from: &str,
    to: &str,
) -> Vec<ChangelogEntry> {
    match vcs.commit_log(from, to) {
        Ok(entries) => entries
            .into_iter()
            .map(|entry| ChangelogEntry {
                summary: entry.summary,
                commit_link: format!("{scm_base_url}/commit/{}", entry.short_hash),
            })
            .collect(),
        Err(err) => {
            warn!(error = %err, "unable to determine revision information, skipping changelog");
            Vec::new()
        }
    }
}
