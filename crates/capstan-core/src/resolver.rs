//! Revision resolution over a [`VcsClient`].
//!
//! Thin query layer the tag lifecycle and sanity check build on: hash
//! resolution, detached-HEAD detection, remote ref presence, and the
//! preferred-remote policy.

use capstan_git::{CommitHash, VcsClient};
use regex::Regex;

use crate::domain::Result;

/// Preferred-remote selection: an explicit override wins; a repository
/// with exactly one configured remote uses it; anything else falls back
/// to the literal `"origin"`. Single-remote forks just work while
/// multi-remote repositories keep an explicit default.
pub fn preferred_remote<V: VcsClient>(vcs: &V, remote_override: Option<&str>) -> Result<String> {
    if let Some(remote) = remote_override {
        return Ok(remote.to_string());
    }
    let mut remotes = vcs.remote_names()?;
    if remotes.len() == 1 {
        return Ok(remotes.remove(0));
    }
    Ok("origin".to_string())
}

/// Query wrapper around a version control client.
pub struct RevisionResolver<V> {
    vcs: V,
}

impl<V: VcsClient> RevisionResolver<V> {
    pub fn new(vcs: V) -> Self {
        Self { vcs }
    }

    /// Commit hash for a ref. Fails with `RefNotFound` when the ref
    /// cannot be resolved; resolution failures are fatal configuration
    /// errors, never retried.
    pub fn resolve_hash(&self, refish: &str) -> Result<CommitHash> {
        Ok(self.vcs.resolve(refish)?)
    }

    pub fn is_detached_head(&self) -> Result<bool> {
        Ok(self.vcs.is_detached()?)
    }

    /// Current branch name; fails with `DetachedHead` when not on a
    /// branch. Callers whose correctness depends on the branch name check
    /// [`Self::is_detached_head`] first.
    pub fn current_branch_name(&self) -> Result<String> {
        Ok(self.vcs.current_branch()?)
    }

    /// Lowest common ancestor of two commits.
    pub fn merge_base(&self, a: &CommitHash, b: &CommitHash) -> Result<CommitHash> {
        Ok(self.vcs.merge_base(a, b)?)
    }

    /// True iff a tag or head ref with this name is present in the
    /// remote's advertised ref list. Full-ref matching against
    /// 40-hex-char SHA-prefixed lines.
    pub fn exists_on_remote(&self, refish: &str, remote: &str) -> Result<bool> {
        let listing = self.vcs.list_remote_refs(remote)?;
        let pattern = format!(
            r"^[0-9a-f]{{40}}\s+refs/(tags|heads)/{}$",
            regex::escape(refish)
        );
        let matcher = Regex::new(&pattern).expect("ref pattern is valid");
        Ok(listing.lines().any(|line| matcher.is_match(line.trim_end())))
    }

    /// See [`preferred_remote`].
    pub fn preferred_remote(&self, remote_override: Option<&str>) -> Result<String> {
        preferred_remote(&self.vcs, remote_override)
    }
}
