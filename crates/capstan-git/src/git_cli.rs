//! Process-spawning `git` backend for [`VcsClient`].

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Mutex;

use tracing::debug;

use crate::client::{LogEntry, VcsClient};
use crate::error::GitError;
use crate::hash::CommitHash;
use crate::Result;

/// Pretty-format delimiter for changelog parsing. `$$` never appears in an
/// abbreviated hash and is unlikely in author names.
const LOG_FIELD_DELIMITER: &str = "$$";

/// `VcsClient` backend that runs the `git` binary against a working copy.
///
/// A single local git state is mutated by `fetch`, so every invocation is
/// serialized behind an internal lock; concurrent callers queue.
pub struct GitCli {
    workdir: PathBuf,
    lock: Mutex<()>,
}

impl GitCli {
    /// Create a client for the repository at `workdir`.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run `git` with the given args, returning the raw output. Holds the
    /// serialization lock for the duration of the child process.
    fn run_raw(&self, args: &[&str]) -> Result<Output> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| {
            // The lock only guards process spawning; a panic while held
            // leaves no partial state to repair.
            poisoned.into_inner()
        });
        debug!(command = %args.join(" "), "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()?;
        Ok(output)
    }

    /// Run `git` and require a zero exit status, returning stdout.
    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.run_raw(args)?;
        if !output.status.success() {
            return Err(command_failed(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn command_failed(args: &[&str], output: &Output) -> GitError {
    GitError::CommandFailed {
        command: args.join(" "),
        status: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

impl VcsClient for GitCli {
    fn resolve(&self, refish: &str) -> Result<CommitHash> {
        let spec = format!("{refish}^{{commit}}");
        let output = self.run_raw(&["rev-parse", "--verify", spec.as_str()])?;
        if !output.status.success() {
            return Err(GitError::RefNotFound {
                refish: refish.to_string(),
            });
        }
        CommitHash::parse(&String::from_utf8_lossy(&output.stdout))
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        self.run(&["fetch", remote])?;
        Ok(())
    }

    fn merge_base(&self, a: &CommitHash, b: &CommitHash) -> Result<CommitHash> {
        let stdout = self.run(&["merge-base", a.as_str(), b.as_str()])?;
        CommitHash::parse(&stdout)
    }

    fn create_tag(&self, name: &str) -> Result<()> {
        self.run(&["tag", name])?;
        Ok(())
    }

    fn push_tag(&self, name: &str, remote: &str) -> Result<()> {
        let full_ref = format!("refs/tags/{name}");
        self.run(&["push", remote, full_ref.as_str()])?;
        Ok(())
    }

    fn delete_tag(&self, name: &str, remote: &str) -> Result<()> {
        // Local deletion of a tag that was never created is fine.
        let _ = self.run_raw(&["tag", "-d", name])?;

        let deletion_ref = format!(":refs/tags/{name}");
        let args = ["push", remote, deletion_ref.as_str()];
        let output = self.run_raw(&args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // Remote copy already absent counts as success for
            // delete-then-recreate sequences.
            if stderr.contains("does not exist") || stderr.contains("remote ref") {
                return Ok(());
            }
            return Err(command_failed(&args, &output));
        }
        Ok(())
    }

    fn list_tags(&self, pattern: &str) -> Result<Vec<String>> {
        let stdout = self.run(&["tag", "-l", pattern])?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    fn list_remote_refs(&self, remote: &str) -> Result<String> {
        self.run(&["ls-remote", remote])
    }

    fn current_branch(&self) -> Result<String> {
        let stdout = self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = stdout.trim().to_string();
        if name == "HEAD" {
            return Err(GitError::DetachedHead);
        }
        Ok(name)
    }

    fn is_detached(&self) -> Result<bool> {
        let stdout = self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(stdout.trim() == "HEAD")
    }

    fn status_is_clean(&self) -> Result<bool> {
        let stdout = self.run(&["status", "--porcelain"])?;
        Ok(stdout.trim().is_empty())
    }

    fn remote_names(&self) -> Result<Vec<String>> {
        // `config --get-regexp` exits 1 when nothing matches; an
        // unconfigured repository simply has no remotes.
        let output = self.run_raw(&["config", "--get-regexp", r"^remote\."])?;
        if !output.status.success() {
            return Ok(Vec::new());
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut names: Vec<String> = stdout
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .filter_map(|key| key.strip_prefix("remote."))
            .filter_map(|rest| rest.split('.').next())
            .map(String::from)
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn commit_log(&self, from: &str, to: &str) -> Result<Vec<LogEntry>> {
        let pretty = format!("--pretty=format:%h{LOG_FIELD_DELIMITER}%an{LOG_FIELD_DELIMITER}%s");
        let range = format!("{from}..{to}");
        let stdout = self.run(&["log", "--no-merges", pretty.as_str(), range.as_str()])?;
        Ok(stdout
            .lines()
            .filter_map(|line| {
                let mut parts = line.splitn(3, LOG_FIELD_DELIMITER);
                Some(LogEntry {
                    short_hash: parts.next()?.to_string(),
                    author: parts.next()?.to_string(),
                    summary: parts.next()?.to_string(),
                })
            })
            .collect())
    }
}
