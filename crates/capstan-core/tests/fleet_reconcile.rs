//! Fleet reconciliation tests over a scripted transport.

use std::collections::BTreeSet;
use std::sync::Arc;

use capstan_core::fleet::{
    cleanup_command, current_revision_command, current_target_command, folder_revision_command,
    list_releases_command,
};
use capstan_core::{
    detect_lingering_releases, detect_multiple_current_revisions, group_by_revision_set,
    FleetConfig, FleetReconciler, UNDETERMINED_REVISION, UNKNOWN_REVISION,
};
use capstan_remote::fakes::ScriptedExecutor;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config() -> FleetConfig {
    FleetConfig::new("/var/www/app")
}

fn hosts(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Script a healthy host: a releases listing, per-folder revisions, and
/// the current pointer.
fn script_host(
    executor: &ScriptedExecutor,
    config: &FleetConfig,
    host: &str,
    folders: &[(&str, &str)],
    current_revision: &str,
) {
    let mut listing = String::from("total 12\n");
    for (name, _) in folders {
        listing.push_str(&format!(
            "drwxr-xr-x 9 deploy deploy 4096 Jan  1 10:00 {name}\n"
        ));
    }
    executor.script_output(host, &list_releases_command(config), &listing);
    for (name, revision) in folders {
        executor.script_output(host, &folder_revision_command(config, name), revision);
    }
    executor.script_output(host, &current_revision_command(config), current_revision);
    if let Some((last, _)) = folders.last() {
        executor.script_output(
            host,
            &current_target_command(config),
            &format!("{}/{last}", config.releases_path()),
        );
    }
}

// ---------------------------------------------------------------------------
// Snapshot collection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn snapshots_come_back_in_discovery_order() {
    let executor = Arc::new(ScriptedExecutor::new());
    let config = config();
    script_host(&executor, &config, "web2", &[("r1-folder", "r1")], "r1");
    script_host(&executor, &config, "web1", &[("r1-folder", "r1")], "r1");
    let reconciler = FleetReconciler::new(Arc::clone(&executor), config);

    let snapshots = reconciler.snapshot_fleet(&hosts(&["web2", "web1"])).await;
    let order: Vec<&str> = snapshots.iter().map(|s| s.host.as_str()).collect();
    assert_eq!(order, vec!["web2", "web1"]);
}

#[tokio::test]
async fn per_host_failures_degrade_to_sentinels() {
    let executor = Arc::new(ScriptedExecutor::new());
    let config = config();
    // Listing succeeds but both the folder revision and the current
    // pointer reads fail.
    executor.script_output(
        "web1",
        &list_releases_command(&config),
        "total 4\ndrwxr-xr-x 9 deploy deploy 4096 Jan  1 10:00 20240101100000\n",
    );
    let reconciler = FleetReconciler::new(Arc::clone(&executor), config);

    let snapshots = reconciler.snapshot_fleet(&hosts(&["web1"])).await;
    assert_eq!(snapshots[0].folders[0].revision, UNDETERMINED_REVISION);
    assert_eq!(snapshots[0].current_revision, UNKNOWN_REVISION);
    assert!(snapshots[0].current_target.is_none());
}

#[tokio::test]
async fn unreachable_host_never_prevents_reporting_on_the_rest() {
    let executor = Arc::new(ScriptedExecutor::new());
    let config = config();
    script_host(&executor, &config, "web1", &[("a", "r1")], "r1");
    executor.script_unreachable("web2");
    script_host(&executor, &config, "web3", &[("a", "r1")], "r1");
    let reconciler = FleetReconciler::new(Arc::clone(&executor), config);

    let snapshots = reconciler
        .snapshot_fleet(&hosts(&["web1", "web2", "web3"]))
        .await;
    assert_eq!(snapshots.len(), 3);
    assert_eq!(snapshots[1].current_revision, UNKNOWN_REVISION);
    assert!(snapshots[1].folders.is_empty());
    assert_eq!(snapshots[2].current_revision, "r1");
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hosts_with_equal_revision_sets_group_together() {
    let executor = Arc::new(ScriptedExecutor::new());
    let config = config();
    // Same revisions in differently-named folders, opposite order.
    script_host(
        &executor,
        &config,
        "web1",
        &[("folder-a", "r1"), ("folder-b", "r2")],
        "r2",
    );
    script_host(
        &executor,
        &config,
        "web2",
        &[("other-x", "r2"), ("other-y", "r1")],
        "r2",
    );
    script_host(&executor, &config, "web3", &[("folder-a", "r1")], "r1");
    let reconciler = FleetReconciler::new(Arc::clone(&executor), config);

    let snapshots = reconciler
        .snapshot_fleet(&hosts(&["web1", "web2", "web3"]))
        .await;
    let groups = group_by_revision_set(&snapshots);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].hosts, vec!["web1", "web2"]);
    assert_eq!(
        groups[0].revisions,
        BTreeSet::from(["r1".to_string(), "r2".to_string()])
    );
    assert_eq!(groups[1].hosts, vec!["web3"]);
}

#[tokio::test]
async fn failed_host_forms_its_own_group() {
    let executor = Arc::new(ScriptedExecutor::new());
    let config = config();
    script_host(&executor, &config, "web1", &[("a", "r1")], "r1");
    executor.script_unreachable("web2");
    let reconciler = FleetReconciler::new(Arc::clone(&executor), config);

    let snapshots = reconciler.snapshot_fleet(&hosts(&["web1", "web2"])).await;
    let groups = group_by_revision_set(&snapshots);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].hosts, vec!["web2"]);
    assert_eq!(
        groups[1].revisions,
        BTreeSet::from([UNKNOWN_REVISION.to_string()])
    );
}

// ---------------------------------------------------------------------------
// Current revision drift
// ---------------------------------------------------------------------------

#[tokio::test]
async fn drifted_fleet_reports_both_current_revisions() {
    let executor = Arc::new(ScriptedExecutor::new());
    let config = config();
    script_host(&executor, &config, "host1", &[("a", "abc123")], "abc123");
    script_host(&executor, &config, "host2", &[("a", "abc123")], "abc123");
    script_host(&executor, &config, "host3", &[("a", "def456")], "def456");
    let reconciler = FleetReconciler::new(Arc::clone(&executor), config);

    let snapshots = reconciler
        .snapshot_fleet(&hosts(&["host1", "host2", "host3"]))
        .await;
    let revisions = detect_multiple_current_revisions(&snapshots);

    assert_eq!(
        revisions,
        BTreeSet::from(["abc123".to_string(), "def456".to_string()])
    );
}

// ---------------------------------------------------------------------------
// Lingering releases
// ---------------------------------------------------------------------------

/// Host whose `current` symlink points at the middle of three releases.
fn script_lingering_host(executor: &ScriptedExecutor, config: &FleetConfig, host: &str) {
    let listing = "total 12\n\
        drwxr-xr-x 9 deploy deploy 4096 Jan  1 10:00 20240101100000\n\
        drwxr-xr-x 9 deploy deploy 4096 Jan  2 10:00 20240102100000\n\
        drwxr-xr-x 9 deploy deploy 4096 Jan  3 10:00 20240103100000\n";
    executor.script_output(host, &list_releases_command(config), listing);
    for folder in ["20240101100000", "20240102100000", "20240103100000"] {
        executor.script_output(host, &folder_revision_command(config, folder), "r1");
    }
    executor.script_output(host, &current_revision_command(config), "r1");
    executor.script_output(
        host,
        &current_target_command(config),
        &format!("{}/20240102100000", config.releases_path()),
    );
}

#[tokio::test]
async fn lingering_detection_flags_folders_newer_than_current() {
    let executor = Arc::new(ScriptedExecutor::new());
    let config = config();
    script_lingering_host(&executor, &config, "web1");
    let reconciler = FleetReconciler::new(Arc::clone(&executor), config);

    let snapshots = reconciler.snapshot_fleet(&hosts(&["web1"])).await;
    let lingering = detect_lingering_releases(&snapshots);
    assert_eq!(
        lingering.get("web1"),
        Some(&vec!["20240103100000".to_string()])
    );
}

#[tokio::test]
async fn preserve_lingering_reports_but_never_deletes() {
    let executor = Arc::new(ScriptedExecutor::new());
    let mut config = config();
    config.preserve_lingering = true;
    script_lingering_host(&executor, &config, "web1");
    let remove = cleanup_command(&config);
    let reconciler = FleetReconciler::new(Arc::clone(&executor), config);

    let report = reconciler.cleanup_lingering_releases(&hosts(&["web1"])).await;
    assert!(report.skipped);
    assert!(report.lingering.contains_key("web1"));
    assert!(report.cleaned.is_empty());
    assert!(!executor.calls().iter().any(|(_, cmd)| *cmd == remove));
}

#[tokio::test]
async fn cleanup_runs_the_guarded_removal_on_affected_hosts() {
    let executor = Arc::new(ScriptedExecutor::new());
    let config = config();
    script_lingering_host(&executor, &config, "web1");
    script_host(&executor, &config, "web2", &[("a", "r1")], "r1");
    let remove = cleanup_command(&config);
    executor.script_output("web1", &remove, "");
    let reconciler = FleetReconciler::new(Arc::clone(&executor), config);

    let report = reconciler
        .cleanup_lingering_releases(&hosts(&["web1", "web2"]))
        .await;
    assert!(!report.skipped);
    assert_eq!(report.cleaned, vec!["web1".to_string()]);
    assert!(report.failed.is_empty());
    // The clean host is never touched by the removal.
    assert!(!executor
        .calls()
        .iter()
        .any(|(host, cmd)| host == "web2" && *cmd == remove));
}
