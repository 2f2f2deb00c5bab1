//! Per-host release state observed during fleet reconciliation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Sentinel recorded when a host's current revision could not be read.
pub const UNKNOWN_REVISION: &str = "unknown";

/// Sentinel recorded when a release folder's revision could not be read.
pub const UNDETERMINED_REVISION: &str = "*unable to determine";

/// One release folder on a host, as listed under `releases/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFolder {
    pub name: String,
    pub owner: String,
    pub group: String,
    pub permissions: String,
    /// Contents of the folder's REVISION file, or
    /// [`UNDETERMINED_REVISION`] when unreadable.
    pub revision: String,
}

/// Everything observed about one host in a single reconciliation pass.
///
/// Captured fresh on every call, never cached. Per-host read failures are
/// recorded as sentinel values so one bad host never prevents reporting
/// on the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSnapshot {
    pub host: String,
    /// Release folders in listing order.
    pub folders: Vec<ReleaseFolder>,
    /// Revision the `current` pointer resolves to, or
    /// [`UNKNOWN_REVISION`].
    pub current_revision: String,
    /// Folder name the `current` symlink points at, when readable.
    pub current_target: Option<String>,
}

impl HostSnapshot {
    /// Canonical grouping key: the set of distinct revision values across
    /// all release folders. Folder names carry no semantic weight. A host
    /// with no readable folders contributes its current-revision sentinel
    /// so it still lands in a group.
    pub fn revision_set(&self) -> BTreeSet<String> {
        if self.folders.is_empty() {
            return BTreeSet::from([self.current_revision.clone()]);
        }
        self.folders.iter().map(|f| f.revision.clone()).collect()
    }
}

/// Hosts observed to share an identical set of deployed revision values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionGroup {
    pub revisions: BTreeSet<String>,
    /// Hosts in discovery order.
    pub hosts: Vec<String>,
}
