//! Client trait definition for capstan-git
//!
//! `VcsClient` is the narrow seam between the deployment logic and the
//! underlying version control system:
//! - ref resolution and ancestry queries (`resolve`, `merge_base`)
//! - tag mutation (`create_tag`, `push_tag`, `delete_tag`)
//! - remote ref inspection (`list_remote_refs`, `remote_names`)
//!
//! Calls against the same working copy are not safe to run concurrently
//! (`fetch` mutates a single local git state); backends serialize all
//! invocations relative to each other. An in-memory fake is provided for
//! testing via the `fakes` module.

use serde::{Deserialize, Serialize};

use crate::hash::CommitHash;
use crate::Result;

/// One commit in a `from..to` log, as rendered for changelogs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Abbreviated commit hash.
    pub short_hash: String,
    /// Author name.
    pub author: String,
    /// First line of the commit message.
    pub summary: String,
}

/// Narrow version control client.
///
/// Guarantees:
/// - `resolve` fails with `GitError::RefNotFound` for unresolvable refs.
/// - `delete_tag` treats a missing tag (local or remote) as success, so
///   delete-then-recreate sequences are idempotent.
/// - all methods are serialized with respect to each other by the backend.
pub trait VcsClient: Send + Sync {
    /// Resolve a branch, tag, or commit-ish to its commit hash.
    fn resolve(&self, refish: &str) -> Result<CommitHash>;

    /// Refresh the local view of the given remote's refs.
    fn fetch(&self, remote: &str) -> Result<()>;

    /// Lowest common ancestor of two commits.
    fn merge_base(&self, a: &CommitHash, b: &CommitHash) -> Result<CommitHash>;

    /// Create a local tag at the currently checked-out commit.
    fn create_tag(&self, name: &str) -> Result<()>;

    /// Push an existing local tag to the given remote.
    fn push_tag(&self, name: &str, remote: &str) -> Result<()>;

    /// Delete a tag locally and on the given remote. Missing tags count
    /// as success.
    fn delete_tag(&self, name: &str, remote: &str) -> Result<()>;

    /// List local tag names matching a glob pattern.
    fn list_tags(&self, pattern: &str) -> Result<Vec<String>>;

    /// Raw advertised-ref listing of the remote, one `<sha>\t<ref>` line
    /// per ref.
    fn list_remote_refs(&self, remote: &str) -> Result<String>;

    /// Name of the currently checked-out branch. Fails with
    /// `GitError::DetachedHead` when not on a branch.
    fn current_branch(&self) -> Result<String>;

    /// Whether the working copy is in a detached HEAD state.
    fn is_detached(&self) -> Result<bool>;

    /// Whether the working copy has no local modifications.
    fn status_is_clean(&self) -> Result<bool>;

    /// Distinct remote names from the repository configuration, sorted.
    fn remote_names(&self) -> Result<Vec<String>>;

    /// Commits in `from..to`, newest first, merges excluded.
    fn commit_log(&self, from: &str, to: &str) -> Result<Vec<LogEntry>>;
}

// Components own their client generically; sharing one working copy
// across components goes through an Arc.
impl<T: VcsClient + ?Sized> VcsClient for std::sync::Arc<T> {
    fn resolve(&self, refish: &str) -> Result<CommitHash> {
        (**self).resolve(refish)
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        (**self).fetch(remote)
    }

    fn merge_base(&self, a: &CommitHash, b: &CommitHash) -> Result<CommitHash> {
        (**self).merge_base(a, b)
    }

    fn create_tag(&self, name: &str) -> Result<()> {
        (**self).create_tag(name)
    }

    fn push_tag(&self, name: &str, remote: &str) -> Result<()> {
        (**self).push_tag(name, remote)
    }

    fn delete_tag(&self, name: &str, remote: &str) -> Result<()> {
        (**self).delete_tag(name, remote)
    }

    fn list_tags(&self, pattern: &str) -> Result<Vec<String>> {
        (**self).list_tags(pattern)
    }

    fn list_remote_refs(&self, remote: &str) -> Result<String> {
        (**self).list_remote_refs(remote)
    }

    fn current_branch(&self) -> Result<String> {
        (**self).current_branch()
    }

    fn is_detached(&self) -> Result<bool> {
        (**self).is_detached()
    }

    fn status_is_clean(&self) -> Result<bool> {
        (**self).status_is_clean()
    }

    fn remote_names(&self) -> Result<Vec<String>> {
        (**self).remote_names()
    }

    fn commit_log(&self, from: &str, to: &str) -> Result<Vec<LogEntry>> {
        (**self).commit_log(from, to)
    }
}
