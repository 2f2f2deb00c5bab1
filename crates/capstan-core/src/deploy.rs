//! Deploy workflow glue.
//!
//! Sequences one deploy attempt for an external deploy driver: cut a
//! working tag, gate it against the running revision, announce it, and
//! publish the environment tags once the driver reports success. The
//! actual code shipment (build, sync, symlink flip) happens outside this
//! crate, between [`DeployWorkflow::begin`] and [`DeployWorkflow::finish`].

use std::sync::Mutex;

use capstan_git::VcsClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::DeployPolicy;
use crate::domain::{CapstanError, DeploymentTag, Result, SanityDecision};
use crate::notify::{build_changelog, Announcement, Notifier, Wrapup};
use crate::sanity::{DeployConfirmer, SanityChecker};
use crate::tags::TagLifecycleManager;

/// Unique identifier for one deploy attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeployId(pub String);

impl DeployId {
    /// Generate a new random DeployId
    pub fn new() -> Self {
        DeployId(Uuid::new_v4().to_string())
    }
}

impl Default for DeployId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DeployId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An in-flight deploy, handed back by [`DeployWorkflow::begin`] and
/// consumed by [`DeployWorkflow::finish`].
#[derive(Debug, Clone)]
pub struct DeployAttempt {
    pub deploy_id: DeployId,
    pub tag: DeploymentTag,
    pub decision: SanityDecision,
    pub started_at: DateTime<Utc>,
}

/// One deploy target's workflow over a shared working copy.
pub struct DeployWorkflow<V, C, N> {
    vcs: V,
    policy: DeployPolicy,
    tags: TagLifecycleManager<V>,
    checker: SanityChecker<V, C>,
    notifier: N,
    deployer: String,
    scm_base_url: Option<String>,
    /// Tag cut by `prepare`, guarded against mid-flight overrides.
    prepared: Mutex<Option<String>>,
}

impl<V, C, N> DeployWorkflow<V, C, N>
where
    V: VcsClient + Clone,
    C: DeployConfirmer,
    N: Notifier,
{
    pub fn new(
        vcs: V,
        policy: DeployPolicy,
        confirmer: C,
        notifier: N,
        deployer: impl Into<String>,
        scm_base_url: Option<String>,
    ) -> Self {
        Self {
            tags: TagLifecycleManager::new(vcs.clone(), policy.clone()),
            checker: SanityChecker::new(vcs.clone(), policy.clone(), confirmer),
            vcs,
            policy,
            notifier,
            deployer: deployer.into(),
            scm_base_url,
            prepared: Mutex::new(None),
        }
    }

    /// Cut a working tag for a later deploy and remember it.
    pub fn prepare(&self) -> Result<DeploymentTag> {
        self.prepare_at(Utc::now())
    }

    /// [`Self::prepare`] at a fixed timestamp.
    pub fn prepare_at(&self, now: DateTime<Utc>) -> Result<DeploymentTag> {
        let tag = self.tags.cut_tag_at(now)?;
        *self.prepared.lock().unwrap() = Some(tag.name.clone());
        info!(tag = %tag.name, environment = %self.policy.environment, "prepared deploy tag");
        Ok(tag)
    }

    /// Gate and announce one deploy attempt.
    ///
    /// When `prepare` cut a tag earlier, the tag under deploy must still
    /// be that one; an external recipe overriding it mid-flight is an
    /// error. The announcement goes out after the gate passes; a failing
    /// notifier is logged, never fatal.
    pub async fn begin(
        &self,
        tag: &DeploymentTag,
        currently_running: Option<&str>,
    ) -> Result<DeployAttempt> {
        self.begin_at(tag, currently_running, Utc::now()).await
    }

    /// [`Self::begin`] at a fixed timestamp.
    pub async fn begin_at(
        &self,
        tag: &DeploymentTag,
        currently_running: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DeployAttempt> {
        if let Some(prepared) = self.prepared.lock().unwrap().as_deref() {
            if prepared != tag.name {
                return Err(CapstanError::TagCacheMismatch {
                    expected: prepared.to_string(),
                    actual: tag.name.clone(),
                });
            }
        }

        let decision = self.checker.check(&tag.name, currently_running)?;

        let changelog = match (&self.scm_base_url, currently_running) {
            (Some(base), Some(from)) => build_changelog(&self.vcs, base, from, &tag.name),
            _ => Vec::new(),
        };
        let attempt = DeployAttempt {
            deploy_id: DeployId::new(),
            tag: tag.clone(),
            decision,
            started_at: now,
        };
        let announcement = Announcement {
            deploy_id: attempt.deploy_id.clone(),
            deployer: self.deployer.clone(),
            environment: self.policy.environment.clone(),
            revision_label: tag.name.clone(),
            changelog,
        };
        if let Err(err) = self.notifier.notify_starting(&announcement).await {
            warn!(error = %err, "starting notification failed");
        }
        info!(deploy_id = %attempt.deploy_id, tag = %tag.name, "deploy attempt begun");
        Ok(attempt)
    }

    /// Publish the environment tags for a shipped deploy and announce
    /// the wrap-up.
    pub async fn finish(&self, attempt: &DeployAttempt) -> Result<String> {
        self.finish_at(attempt, Utc::now()).await
    }

    /// [`Self::finish`] at a fixed timestamp. Returns the historical
    /// marker tag name.
    pub async fn finish_at(&self, attempt: &DeployAttempt, now: DateTime<Utc>) -> Result<String> {
        let marker = self.tags.publish_environment_tag_at(now)?;

        let duration_seconds = (now - attempt.started_at).num_seconds().max(0) as u64;
        let wrapup = Wrapup {
            deploy_id: attempt.deploy_id.clone(),
            deployer: self.deployer.clone(),
            environment: self.policy.environment.clone(),
            duration_seconds,
        };
        if let Err(err) = self.notifier.notify_finished(&wrapup).await {
            warn!(error = %err, "finished notification failed");
        }
        info!(deploy_id = %attempt.deploy_id, marker = %marker, "deploy attempt finished");
        Ok(marker)
    }

    /// The rollback target for this environment, from marker history.
    pub fn select_rollback_target(&self) -> Result<DeploymentTag> {
        self.tags.select_rollback_target()
    }
}
