//! In-memory fake for the client trait (testing only)
//!
//! Provides `MemoryVcs`, a scripted repository that satisfies the
//! `VcsClient` contract without spawning git. Tests script refs, merge
//! bases, and remote state up front, then assert on the recorded tag
//! mutations afterwards.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::client::{LogEntry, VcsClient};
use crate::error::GitError;
use crate::hash::CommitHash;
use crate::Result;

#[derive(Debug, Default)]
struct State {
    refs: HashMap<String, CommitHash>,
    merge_bases: HashMap<(String, String), CommitHash>,
    remote_refs: HashMap<String, Vec<(CommitHash, String)>>,
    tags: Vec<String>,
    pushed: Vec<(String, String)>,
    deleted: Vec<(String, String)>,
    fetched: Vec<String>,
    resolved: Vec<String>,
    branch: Option<String>,
    clean: bool,
    remotes: Vec<String>,
    log: Vec<LogEntry>,
    log_fails: bool,
}

/// Scripted in-memory repository.
///
/// Starts on branch `main` with a clean working copy, no refs, and a
/// single `origin` remote.
#[derive(Debug)]
pub struct MemoryVcs {
    state: Mutex<State>,
}

impl Default for MemoryVcs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVcs {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                branch: Some("main".to_string()),
                clean: true,
                remotes: vec!["origin".to_string()],
                ..State::default()
            }),
        }
    }

    // -- scripting ---------------------------------------------------------

    /// Script a resolvable ref.
    pub fn insert_ref(&self, refish: &str, hash: &str) {
        let hash = CommitHash::parse(hash).expect("scripted hash");
        self.state
            .lock()
            .unwrap()
            .refs
            .insert(refish.to_string(), hash);
    }

    /// Script the merge base of two commits (order-insensitive).
    pub fn set_merge_base(&self, a: &str, b: &str, base: &str) {
        let base = CommitHash::parse(base).expect("scripted hash");
        let mut state = self.state.lock().unwrap();
        state
            .merge_bases
            .insert((a.to_string(), b.to_string()), base);
    }

    /// Script an advertised ref on a remote.
    pub fn add_remote_ref(&self, remote: &str, full_ref: &str, hash: &str) {
        let hash = CommitHash::parse(hash).expect("scripted hash");
        self.state
            .lock()
            .unwrap()
            .remote_refs
            .entry(remote.to_string())
            .or_default()
            .push((hash, full_ref.to_string()));
    }

    /// Script a pre-existing local tag.
    pub fn insert_tag(&self, name: &str) {
        self.state.lock().unwrap().tags.push(name.to_string());
    }

    pub fn set_branch(&self, name: &str) {
        self.state.lock().unwrap().branch = Some(name.to_string());
    }

    pub fn set_detached(&self) {
        self.state.lock().unwrap().branch = None;
    }

    pub fn set_clean(&self, clean: bool) {
        self.state.lock().unwrap().clean = clean;
    }

    pub fn set_remotes(&self, remotes: &[&str]) {
        self.state.lock().unwrap().remotes = remotes.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_log(&self, entries: Vec<LogEntry>) {
        self.state.lock().unwrap().log = entries;
    }

    /// Make `commit_log` fail, for changelog degradation tests.
    pub fn fail_commit_log(&self) {
        self.state.lock().unwrap().log_fails = true;
    }

    // -- recorded mutations ------------------------------------------------

    /// Local tags in creation order.
    pub fn created_tags(&self) -> Vec<String> {
        self.state.lock().unwrap().tags.clone()
    }

    /// `(tag, remote)` pairs in push order.
    pub fn pushed_tags(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().pushed.clone()
    }

    /// `(tag, remote)` pairs in deletion order.
    pub fn deleted_tags(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().deleted.clone()
    }

    /// Remotes fetched, in order.
    pub fn fetched_remotes(&self) -> Vec<String> {
        self.state.lock().unwrap().fetched.clone()
    }

    /// Refs passed to `resolve`, in order.
    pub fn resolved_refs(&self) -> Vec<String> {
        self.state.lock().unwrap().resolved.clone()
    }
}

impl VcsClient for MemoryVcs {
    fn resolve(&self, refish: &str) -> Result<CommitHash> {
        let mut state = self.state.lock().unwrap();
        state.resolved.push(refish.to_string());
        if let Some(hash) = state.refs.get(refish) {
            return Ok(hash.clone());
        }
        // A full hash resolves to itself, as it would through rev-parse.
        CommitHash::parse(refish).map_err(|_| GitError::RefNotFound {
            refish: refish.to_string(),
        })
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .fetched
            .push(remote.to_string());
        Ok(())
    }

    fn merge_base(&self, a: &CommitHash, b: &CommitHash) -> Result<CommitHash> {
        if a == b {
            return Ok(a.clone());
        }
        let state = self.state.lock().unwrap();
        let key = (a.as_str().to_string(), b.as_str().to_string());
        let reversed = (key.1.clone(), key.0.clone());
        state
            .merge_bases
            .get(&key)
            .or_else(|| state.merge_bases.get(&reversed))
            .cloned()
            .ok_or_else(|| GitError::CommandFailed {
                command: format!("merge-base {} {}", a, b),
                status: 1,
                stderr: "no merge base scripted".to_string(),
            })
    }

    fn create_tag(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.tags.iter().any(|t| t == name) {
            return Err(GitError::CommandFailed {
                command: format!("tag {name}"),
                status: 128,
                stderr: format!("fatal: tag '{name}' already exists"),
            });
        }
        state.tags.push(name.to_string());
        if let Some(head) = state.refs.get("HEAD").cloned() {
            state.refs.insert(name.to_string(), head);
        }
        Ok(())
    }

    fn push_tag(&self, name: &str, remote: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let full_ref = format!("refs/tags/{name}");
        let refs = state.remote_refs.entry(remote.to_string()).or_default();
        // Remote tag creation fails on name collision, mirroring git.
        if refs.iter().any(|(_, r)| *r == full_ref) {
            return Err(GitError::CommandFailed {
                command: format!("push {remote} {full_ref}"),
                status: 1,
                stderr: format!("! [rejected] {name} -> {name} (already exists)"),
            });
        }
        let hash = state
            .refs
            .get(name)
            .or_else(|| state.refs.get("HEAD"))
            .cloned()
            .unwrap_or_else(|| {
                CommitHash::parse(&"0".repeat(40)).expect("placeholder hash")
            });
        let refs = state.remote_refs.entry(remote.to_string()).or_default();
        refs.push((hash, full_ref));
        state.pushed.push((name.to_string(), remote.to_string()));
        Ok(())
    }

    fn delete_tag(&self, name: &str, remote: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.tags.retain(|t| t != name);
        let full_ref = format!("refs/tags/{name}");
        if let Some(refs) = state.remote_refs.get_mut(remote) {
            refs.retain(|(_, r)| *r != full_ref);
        }
        state.deleted.push((name.to_string(), remote.to_string()));
        Ok(())
    }

    fn list_tags(&self, pattern: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        let matches: Vec<String> = match pattern.strip_suffix('*') {
            Some(prefix) => state
                .tags
                .iter()
                .filter(|t| t.starts_with(prefix))
                .cloned()
                .collect(),
            None => state.tags.iter().filter(|t| *t == pattern).cloned().collect(),
        };
        Ok(matches)
    }

    fn list_remote_refs(&self, remote: &str) -> Result<String> {
        let state = self.state.lock().unwrap();
        let mut listing = String::new();
        if let Some(refs) = state.remote_refs.get(remote) {
            for (hash, full_ref) in refs {
                listing.push_str(&format!("{hash}\t{full_ref}\n"));
            }
        }
        Ok(listing)
    }

    fn current_branch(&self) -> Result<String> {
        self.state
            .lock()
            .unwrap()
            .branch
            .clone()
            .ok_or(GitError::DetachedHead)
    }

    fn is_detached(&self) -> Result<bool> {
        Ok(self.state.lock().unwrap().branch.is_none())
    }

    fn status_is_clean(&self) -> Result<bool> {
        Ok(self.state.lock().unwrap().clean)
    }

    fn remote_names(&self) -> Result<Vec<String>> {
        let mut remotes = self.state.lock().unwrap().remotes.clone();
        remotes.sort();
        Ok(remotes)
    }

    fn commit_log(&self, from: &str, to: &str) -> Result<Vec<LogEntry>> {
        let state = self.state.lock().unwrap();
        if state.log_fails {
            return Err(GitError::CommandFailed {
                command: format!("log {from}..{to}"),
                status: 128,
                stderr: "bad revision range".to_string(),
            });
        }
        Ok(state.log.clone())
    }
}
