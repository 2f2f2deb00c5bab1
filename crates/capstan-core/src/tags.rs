//! Deployment tag lifecycle.
//!
//! Cutting working tags, repointing the environment pointer tag, laying
//! down historical markers, and choosing rollback targets from the
//! marker history.

use capstan_git::VcsClient;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::DeployPolicy;
use crate::domain::tag::DEPLOYED_TAG_PREFIX;
use crate::domain::{marker_tag_name, parse_marker_tag, CapstanError, DeploymentTag, Result};
use crate::resolver::preferred_remote;

/// Orchestrates tag creation, publication, and rollback selection for
/// one deploy target.
pub struct TagLifecycleManager<V> {
    vcs: V,
    policy: DeployPolicy,
}

impl<V: VcsClient> TagLifecycleManager<V> {
    pub fn new(vcs: V, policy: DeployPolicy) -> Self {
        Self { vcs, policy }
    }

    fn remote(&self) -> Result<String> {
        preferred_remote(&self.vcs, self.policy.remote_override.as_deref())
    }

    /// Cut a fresh working tag from the current branch and push it to the
    /// preferred remote. Exactly one remote tag is created.
    ///
    /// Fails with `DetachedHead` before any network side effect when the
    /// working copy is not on a named branch.
    pub fn cut_tag(&self) -> Result<DeploymentTag> {
        self.cut_tag_at(Utc::now())
    }

    /// [`Self::cut_tag`] at a fixed timestamp (used for deterministic tests).
    pub fn cut_tag_at(&self, now: DateTime<Utc>) -> Result<DeploymentTag> {
        if self.vcs.is_detached()? {
            return Err(CapstanError::DetachedHead);
        }
        let branch = self.vcs.current_branch()?;
        let remote = self.remote()?;

        // Refresh the local view of the remote before computing the tag.
        self.vcs.fetch(&remote)?;

        let tag = DeploymentTag::working(&self.policy.environment, &branch, now);
        self.vcs.create_tag(&tag.name)?;
        self.vcs.push_tag(&tag.name, &remote)?;
        info!(tag = %tag.name, remote = %remote, "cut deployment tag");
        Ok(tag)
    }

    /// Repoint the environment pointer tag at the currently checked-out
    /// commit and lay down a historical marker.
    ///
    /// The pointer tag (named literally after the environment) always
    /// means "currently deployed"; the `DEPLOYED---` marker series is an
    /// append-only audit trail usable for rollback selection. The pointer
    /// is deleted remotely before recreation because remote tag creation
    /// fails on name collision; a missing remote copy counts as deleted.
    pub fn publish_environment_tag(&self) -> Result<String> {
        self.publish_environment_tag_at(Utc::now())
    }

    /// [`Self::publish_environment_tag`] at a fixed timestamp. Returns the
    /// marker tag name.
    pub fn publish_environment_tag_at(&self, now: DateTime<Utc>) -> Result<String> {
        let environment = &self.policy.environment;
        let remote = self.remote()?;

        self.vcs.delete_tag(environment, &remote)?;
        self.vcs.create_tag(environment)?;
        self.vcs.push_tag(environment, &remote)?;

        let marker = marker_tag_name(environment, now);
        self.vcs.create_tag(&marker)?;
        self.vcs.push_tag(&marker, &remote)?;

        info!(environment = %environment, marker = %marker, "published environment tags");
        Ok(marker)
    }

    /// The tag a rollback should deploy: the second-to-last historical
    /// marker for this environment, by recorded deploy time.
    ///
    /// Markers are ordered by their parsed timestamp rather than by tag
    /// name; the unpadded-decimal suffix makes lexicographic order
    /// unreliable across digit-count boundaries.
    pub fn select_rollback_target(&self) -> Result<DeploymentTag> {
        let environment = &self.policy.environment;
        let pattern = format!("{DEPLOYED_TAG_PREFIX}{environment}---*");
        let names = self.vcs.list_tags(&pattern)?;

        let mut markers: Vec<(DateTime<Utc>, String)> = names
            .into_iter()
            .filter_map(|name| parse_marker_tag(&name).map(|(_, at)| (at, name)))
            .collect();
        if markers.len() < 2 {
            return Err(CapstanError::InsufficientHistory {
                environment: environment.clone(),
                found: markers.len(),
            });
        }
        markers.sort_by_key(|(at, _)| *at);

        let (_, name) = &markers[markers.len() - 2];
        let target = DeploymentTag::from_marker(name).ok_or_else(|| {
            CapstanError::InvalidConfig {
                reason: format!("malformed marker tag: {name}"),
            }
        })?;
        info!(environment = %environment, target = %target.name, "selected rollback target");
        Ok(target)
    }
}
