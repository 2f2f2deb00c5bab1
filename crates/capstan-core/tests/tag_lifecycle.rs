//! Behavioral tests for the tag lifecycle manager.

use std::sync::Arc;

use capstan_core::{
    parse_marker_tag, CapstanError, DeployPolicy, RevisionResolver, TagLifecycleManager,
};
use capstan_git::fakes::MemoryVcs;
use chrono::{TimeZone, Utc};

const HEAD_SHA: &str = "9ce7af1264f9eec24ad2dbdbb553bd762f4e0a42";

fn at(seconds: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap()
}

fn repo_on(branch: &str) -> Arc<MemoryVcs> {
    let vcs = MemoryVcs::new();
    vcs.set_branch(branch);
    vcs.insert_ref("HEAD", HEAD_SHA);
    Arc::new(vcs)
}

// ---------------------------------------------------------------------------
// cut_tag
// ---------------------------------------------------------------------------

#[test]
fn cut_tag_name_is_branch_dash_unix_seconds() {
    let vcs = repo_on("release");
    let manager = TagLifecycleManager::new(Arc::clone(&vcs), DeployPolicy::new("staging"));

    let tag = manager.cut_tag_at(at(1700000000)).unwrap();

    let (branch, seconds) = tag.name.rsplit_once('-').unwrap();
    assert_eq!(branch, "release");
    assert!(seconds.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(seconds.parse::<i64>().unwrap(), 1700000000);
}

#[test]
fn cut_tag_pushes_exactly_once_to_the_preferred_remote() {
    let vcs = repo_on("main");
    vcs.set_remotes(&["fork"]);
    let manager = TagLifecycleManager::new(Arc::clone(&vcs), DeployPolicy::new("staging"));

    manager.cut_tag_at(at(1700000000)).unwrap();

    assert_eq!(
        vcs.pushed_tags(),
        vec![("main-1700000000".to_string(), "fork".to_string())]
    );
    assert_eq!(vcs.fetched_remotes(), vec!["fork".to_string()]);
}

#[test]
fn cut_tag_with_many_remotes_uses_origin() {
    let vcs = repo_on("main");
    vcs.set_remotes(&["fork", "upstream", "origin"]);
    let manager = TagLifecycleManager::new(Arc::clone(&vcs), DeployPolicy::new("staging"));

    manager.cut_tag_at(at(1700000000)).unwrap();
    assert_eq!(vcs.pushed_tags()[0].1, "origin");
}

#[test]
fn cut_tag_on_detached_head_performs_no_push() {
    let vcs = Arc::new(MemoryVcs::new());
    vcs.set_detached();
    let manager = TagLifecycleManager::new(Arc::clone(&vcs), DeployPolicy::new("staging"));

    let err = manager.cut_tag_at(at(1700000000)).unwrap_err();
    assert!(matches!(err, CapstanError::DetachedHead));
    assert!(vcs.pushed_tags().is_empty());
    assert!(vcs.created_tags().is_empty());
}

// ---------------------------------------------------------------------------
// publish_environment_tag
// ---------------------------------------------------------------------------

#[test]
fn publish_writes_pointer_then_marker() {
    let vcs = repo_on("main");
    let manager = TagLifecycleManager::new(Arc::clone(&vcs), DeployPolicy::new("staging"));

    let marker = manager.publish_environment_tag_at(at(1700000000)).unwrap();

    // Pointer deleted before recreation, both tags pushed in order.
    assert_eq!(
        vcs.deleted_tags(),
        vec![("staging".to_string(), "origin".to_string())]
    );
    assert_eq!(
        vcs.pushed_tags(),
        vec![
            ("staging".to_string(), "origin".to_string()),
            (marker.clone(), "origin".to_string()),
        ]
    );
    // The marker is parseable back into the environment and timestamp.
    let (environment, cut_at) = parse_marker_tag(&marker).unwrap();
    assert_eq!(environment, "staging");
    assert_eq!(cut_at, at(1700000000));
}

#[test]
fn republish_supersedes_pointer_but_appends_marker() {
    let vcs = repo_on("main");
    let manager = TagLifecycleManager::new(Arc::clone(&vcs), DeployPolicy::new("staging"));

    manager.publish_environment_tag_at(at(1700000000)).unwrap();
    manager.publish_environment_tag_at(at(1700000500)).unwrap();

    let markers: Vec<String> = vcs
        .created_tags()
        .into_iter()
        .filter(|name| parse_marker_tag(name).is_some())
        .collect();
    assert_eq!(
        markers,
        vec![
            "DEPLOYED---staging---1700000000".to_string(),
            "DEPLOYED---staging---1700000500".to_string(),
        ]
    );
}

// ---------------------------------------------------------------------------
// select_rollback_target
// ---------------------------------------------------------------------------

#[test]
fn rollback_needs_at_least_two_markers() {
    for count in 0..2 {
        let vcs = repo_on("main");
        for i in 0..count {
            vcs.insert_tag(&format!("DEPLOYED---staging---170000000{i}"));
        }
        let manager = TagLifecycleManager::new(Arc::clone(&vcs), DeployPolicy::new("staging"));
        let err = manager.select_rollback_target().unwrap_err();
        match err {
            CapstanError::InsufficientHistory { found, .. } => assert_eq!(found, count),
            other => panic!("expected InsufficientHistory, got {other:?}"),
        }
    }
}

#[test]
fn rollback_with_two_markers_returns_the_older() {
    let vcs = repo_on("main");
    vcs.insert_tag("DEPLOYED---staging---1700000000");
    vcs.insert_tag("DEPLOYED---staging---1700000500");
    let manager = TagLifecycleManager::new(Arc::clone(&vcs), DeployPolicy::new("staging"));

    let target = manager.select_rollback_target().unwrap();
    assert_eq!(target.name, "DEPLOYED---staging---1700000000");
}

#[test]
fn rollback_with_three_markers_returns_second_to_last_by_creation_order() {
    // A 9-digit timestamp sorts lexicographically after the 10-digit
    // ones; creation order must win.
    let vcs = repo_on("main");
    vcs.insert_tag("DEPLOYED---staging---999999000");
    vcs.insert_tag("DEPLOYED---staging---1600000000");
    vcs.insert_tag("DEPLOYED---staging---1700000000");
    let manager = TagLifecycleManager::new(Arc::clone(&vcs), DeployPolicy::new("staging"));

    let target = manager.select_rollback_target().unwrap();
    assert_eq!(target.name, "DEPLOYED---staging---1600000000");
}

// ---------------------------------------------------------------------------
// Preferred remote policy
// ---------------------------------------------------------------------------

#[test]
fn preferred_remote_single_namespace_returns_it() {
    let vcs = MemoryVcs::new();
    vcs.set_remotes(&["deploy-mirror"]);
    let resolver = RevisionResolver::new(vcs);
    assert_eq!(resolver.preferred_remote(None).unwrap(), "deploy-mirror");
}

#[test]
fn preferred_remote_multiple_namespaces_return_origin_regardless_of_order() {
    for remotes in [
        &["alpha", "beta"][..],
        &["beta", "alpha"][..],
        &["zeta", "origin", "alpha"][..],
    ] {
        let vcs = MemoryVcs::new();
        vcs.set_remotes(remotes);
        let resolver = RevisionResolver::new(vcs);
        assert_eq!(resolver.preferred_remote(None).unwrap(), "origin");
    }
}
