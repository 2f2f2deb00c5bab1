//! Reverse-deploy sanity gate.
//!
//! Decides whether a proposed deploy tag is safe relative to the
//! currently-running revision, so operators cannot silently push older
//! code over newer code. One decision per invocation; never retried.
//!
//! The decision logic is pure given the resolved inputs; the I/O that
//! resolves "is the operator sure?" is a [`DeployConfirmer`] injected by
//! the caller, so the gate is testable without a terminal.
//!
//! The check is only as good as its input: `currently_running` must be
//! captured from the target host(s) before any new code is linked in.

use capstan_git::{CommitHash, VcsClient};
use tracing::{info, warn};

use crate::config::DeployPolicy;
use crate::domain::{CapstanError, Result, SanityDecision, SkipReason};

/// Resolves the operator's intent when a deploy would rewind history.
pub trait DeployConfirmer: Send + Sync {
    /// Whether to proceed with a deploy whose history does not contain
    /// the running revision.
    fn confirm_reverse_deploy(&self, deploy_sha: &CommitHash, current_sha: &CommitHash) -> bool;
}

impl<F> DeployConfirmer for F
where
    F: Fn(&CommitHash, &CommitHash) -> bool + Send + Sync,
{
    fn confirm_reverse_deploy(&self, deploy_sha: &CommitHash, current_sha: &CommitHash) -> bool {
        self(deploy_sha, current_sha)
    }
}

/// Skip pre-conditions, checked in order; first match wins.
///
/// Production stages never bypass via the reverse-override flag, only
/// via the interactive confirmation path.
pub fn skip_reason(
    policy: &DeployPolicy,
    currently_running: Option<&str>,
) -> Option<SkipReason> {
    if policy.skip_sanity_check {
        return Some(SkipReason::ExplicitSkip);
    }
    if currently_running.is_none() {
        return Some(SkipReason::FirstDeploy);
    }
    if policy.allow_reverse_deploy && !policy.production {
        return Some(SkipReason::ReverseOverride);
    }
    None
}

/// The ancestry-check gate for one deploy target.
pub struct SanityChecker<V, C> {
    vcs: V,
    policy: DeployPolicy,
    confirmer: C,
}

impl<V: VcsClient, C: DeployConfirmer> SanityChecker<V, C> {
    pub fn new(vcs: V, policy: DeployPolicy, confirmer: C) -> Self {
        Self {
            vcs,
            policy,
            confirmer,
        }
    }

    /// Gate one deploy attempt.
    ///
    /// Skip paths resolve no SHAs. Otherwise the deploy tag passes iff
    /// `merge_base(deploy, current) == current`, i.e. the deploy tag's
    /// history contains the running revision. Divergent history asks the
    /// confirmer; a declined confirmation fails with `UnsafeDeploy`
    /// carrying both SHAs.
    pub fn check(
        &self,
        deploy_tag: &str,
        currently_running: Option<&str>,
    ) -> Result<SanityDecision> {
        if let Some(reason) = skip_reason(&self.policy, currently_running) {
            info!(%reason, tag = %deploy_tag, "skipping deploy sanity check");
            return Ok(SanityDecision::Skipped { reason });
        }
        let Some(current) = currently_running else {
            return Ok(SanityDecision::Skipped {
                reason: SkipReason::FirstDeploy,
            });
        };

        let deploy_sha = self.vcs.resolve(deploy_tag)?;
        let current_sha = self.vcs.resolve(current)?;
        let common = self.vcs.merge_base(&deploy_sha, &current_sha)?;

        if common == current_sha {
            info!(tag = %deploy_tag, "deploy sanity check passed");
            return Ok(SanityDecision::Passed);
        }

        warn!(
            deploy_sha = %deploy_sha,
            current_sha = %current_sha,
            "deploy history diverges from the running revision"
        );
        if self
            .confirmer
            .confirm_reverse_deploy(&deploy_sha, &current_sha)
        {
            warn!(tag = %deploy_tag, "reverse deploy confirmed by operator");
            Ok(SanityDecision::FailedOverridden)
        } else {
            Err(CapstanError::UnsafeDeploy {
                deploy_sha,
                current_sha,
            })
        }
    }
}
