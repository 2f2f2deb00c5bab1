//! Fleet revision reconciliation.
//!
//! Answers "what revision is actually running where" across many hosts:
//! collects per-host release snapshots, partitions hosts into equivalence
//! classes by observed revision set, and surfaces fleet-wide drift as a
//! distinct problem from a single host's state.
//!
//! Per-host collection is independent and fans out concurrently under a
//! bounded limit. One bad host never prevents reporting on the rest: its
//! reads degrade to sentinel values.

use std::collections::{BTreeMap, BTreeSet};

use capstan_remote::RemoteExecutor;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::FleetConfig;
use crate::domain::{
    CapstanError, HostSnapshot, ReleaseFolder, Result, RevisionGroup, UNDETERMINED_REVISION,
    UNKNOWN_REVISION,
};

// ---------------------------------------------------------------------------
// Remote command builders
// ---------------------------------------------------------------------------

/// Listing command for the releases directory.
pub fn list_releases_command(config: &FleetConfig) -> String {
    format!("ls -l {}/", config.releases_path())
}

/// Read of the live REVISION file behind the `current` pointer.
pub fn current_revision_command(config: &FleetConfig) -> String {
    format!("cat {}/REVISION", config.current_path())
}

/// Read of the `current` symlink target.
pub fn current_target_command(config: &FleetConfig) -> String {
    format!("readlink {}", config.current_path())
}

/// Read of one release folder's REVISION file.
pub fn folder_revision_command(config: &FleetConfig, folder: &str) -> String {
    format!("cat {}/{}/REVISION", config.releases_path(), folder)
}

/// Guarded removal of the newest release folder: deletes it only while
/// the `current` symlink points elsewhere, re-checking on the host at
/// execution time.
pub fn cleanup_command(config: &FleetConfig) -> String {
    let releases = config.releases_path();
    let latest = format!("\"{releases}/`ls -1 {releases} | tail -n 1`\"");
    format!(
        "if [[ -e {latest} ]] && [[ `readlink {current}` != {latest} ]]; then rm -rf {latest}; fi",
        current = config.current_path()
    )
}

// ---------------------------------------------------------------------------
// ls -l parsing
// ---------------------------------------------------------------------------

/// Parse `ls -l` output into release folders (header line skipped).
/// Revisions start undetermined until the per-folder read fills them in.
pub fn parse_ls_l(text: &str) -> Vec<ReleaseFolder> {
    text.lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 9 {
                return None;
            }
            Some(ReleaseFolder {
                permissions: parts[0].to_string(),
                owner: parts[2].to_string(),
                group: parts[3].to_string(),
                name: parts[8].to_string(),
                revision: UNDETERMINED_REVISION.to_string(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Outcome of a lingering-release cleanup pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Cleanup was suppressed by `preserve_lingering`.
    pub skipped: bool,
    /// Lingering folders found, per host.
    pub lingering: BTreeMap<String, Vec<String>>,
    /// Hosts where the guarded removal ran successfully.
    pub cleaned: Vec<String>,
    /// Hosts where the removal command failed or the host was unreachable.
    pub failed: Vec<String>,
}

/// Collects per-host snapshots and reconciles them fleet-wide.
pub struct FleetReconciler<E> {
    executor: E,
    config: FleetConfig,
}

impl<E: RemoteExecutor> FleetReconciler<E> {
    pub fn new(executor: E, config: FleetConfig) -> Self {
        Self { executor, config }
    }

    /// Run a read on a host, treating transport failures and non-zero
    /// exits alike as "could not read".
    async fn read(&self, host: &str, command: &str) -> Option<String> {
        match self.executor.run(host, command).await {
            Ok(output) if output.success() => Some(output.stdout),
            Ok(output) => {
                warn!(host, command, exit = output.exit_status, "remote read failed");
                None
            }
            Err(err) => {
                warn!(host, command, error = %err, "remote read failed");
                None
            }
        }
    }

    async fn snapshot_host(&self, host: &str) -> HostSnapshot {
        let listing = self.read(host, &list_releases_command(&self.config)).await;
        let mut folders = listing.map(|text| parse_ls_l(&text)).unwrap_or_default();

        for folder in &mut folders {
            let command = folder_revision_command(&self.config, &folder.name);
            if let Some(revision) = self.read(host, &command).await {
                folder.revision = revision.trim().to_string();
            }
        }

        let current_revision = self
            .read(host, &current_revision_command(&self.config))
            .await
            .map(|out| out.trim().to_string())
            .unwrap_or_else(|| UNKNOWN_REVISION.to_string());

        let current_target = self
            .read(host, &current_target_command(&self.config))
            .await
            .map(|out| out.trim().to_string())
            .filter(|target| !target.is_empty());

        HostSnapshot {
            host: host.to_string(),
            folders,
            current_revision,
            current_target,
        }
    }

    /// Capture a fresh snapshot of every host, in discovery order.
    ///
    /// Hosts are collected concurrently up to the configured bound; each
    /// host writes only into its own slot of the result, and a failing
    /// host degrades to sentinel values instead of aborting the batch.
    pub async fn snapshot_fleet(&self, hosts: &[String]) -> Vec<HostSnapshot> {
        let limit = self.config.max_concurrency.max(1);
        stream::iter(hosts.iter().map(|host| self.snapshot_host(host)))
            .buffered(limit)
            .collect()
            .await
    }

    /// Detect and remove releases newer than what `current` points at.
    ///
    /// Such leftovers make the next rollback land on code the operator
    /// does not expect. Removal is suppressed by `preserve_lingering` and
    /// guarded on-host against racing a concurrent relink.
    pub async fn cleanup_lingering_releases(&self, hosts: &[String]) -> CleanupReport {
        let snapshots = self.snapshot_fleet(hosts).await;
        let lingering = detect_lingering_releases(&snapshots);

        if lingering.is_empty() {
            info!("no lingering releases to clean up");
            return CleanupReport {
                skipped: false,
                lingering,
                cleaned: Vec::new(),
                failed: Vec::new(),
            };
        }

        let affected: Vec<&String> = lingering.keys().collect();
        info!(hosts = ?affected, "lingering releases exist");

        if self.config.preserve_lingering {
            info!("skipping deletion of lingering releases");
            return CleanupReport {
                skipped: true,
                lingering,
                cleaned: Vec::new(),
                failed: Vec::new(),
            };
        }

        let command = cleanup_command(&self.config);
        let mut cleaned = Vec::new();
        let mut failed = Vec::new();
        for host in lingering.keys() {
            match self.executor.run(host, &command).await {
                Ok(output) if output.success() => cleaned.push(host.clone()),
                Ok(output) => {
                    warn!(host = %host, stderr = %output.stderr, "lingering cleanup failed");
                    failed.push(host.clone());
                }
                Err(err) => {
                    warn!(host = %host, error = %err, "lingering cleanup failed");
                    failed.push(host.clone());
                }
            }
        }

        CleanupReport {
            skipped: false,
            lingering,
            cleaned,
            failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Fleet-wide reconciliation over collected snapshots
// ---------------------------------------------------------------------------

/// Partition hosts into equivalence classes by observed revision set.
///
/// Hosts whose sets of distinct revision values are equal land in the
/// same class regardless of folder naming. Groups appear in first-seen
/// order; hosts within a group in discovery order. A single pass over a
/// comparable key suffices since the key is computed independently per
/// host.
pub fn group_by_revision_set(snapshots: &[HostSnapshot]) -> Vec<RevisionGroup> {
    let mut groups: Vec<RevisionGroup> = Vec::new();
    for snapshot in snapshots {
        let revisions = snapshot.revision_set();
        match groups.iter_mut().find(|g| g.revisions == revisions) {
            Some(group) => group.hosts.push(snapshot.host.clone()),
            None => groups.push(RevisionGroup {
                revisions,
                hosts: vec![snapshot.host.clone()],
            }),
        }
    }
    info!(groups = groups.len(), "partitioned fleet by revision set");
    groups
}

/// Distinct "current" revision values fleet-wide. More than one distinct
/// value means hosts disagree about what is live.
pub fn detect_multiple_current_revisions(snapshots: &[HostSnapshot]) -> BTreeSet<String> {
    let revisions: BTreeSet<String> = snapshots
        .iter()
        .map(|s| s.current_revision.clone())
        .collect();
    if revisions.len() > 1 {
        warn!(
            count = revisions.len(),
            "more than one current revision is live across the fleet"
        );
        for snapshot in snapshots {
            warn!(host = %snapshot.host, revision = %snapshot.current_revision, "current revision");
        }
    }
    revisions
}

/// Release folders sorting after the one `current` points at, per host.
/// Hosts whose `current` target could not be read are skipped.
pub fn detect_lingering_releases(
    snapshots: &[HostSnapshot],
) -> BTreeMap<String, Vec<String>> {
    let mut lingering = BTreeMap::new();
    for snapshot in snapshots {
        let Some(target) = &snapshot.current_target else {
            continue;
        };
        let current_folder = target.rsplit('/').next().unwrap_or(target.as_str());
        let mut names: Vec<&str> = snapshot.folders.iter().map(|f| f.name.as_str()).collect();
        names.sort_unstable();
        let newer: Vec<String> = names
            .into_iter()
            .filter(|name| *name > current_folder)
            .map(String::from)
            .collect();
        if !newer.is_empty() {
            lingering.insert(snapshot.host.clone(), newer);
        }
    }
    lingering
}

/// Block size for a percentage-based rolling deploy: the floor of
/// `host_count × fraction`, never less than one host.
pub fn rolling_batch_size(host_count: usize, fraction: f64) -> Result<usize> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(CapstanError::InvalidConfig {
            reason: format!("rolling block fraction must be within (0, 1], got {fraction}"),
        });
    }
    let block = (host_count as f64 * fraction).floor() as usize;
    Ok(block.max(1))
}
