//! Validated commit hash identifier.

use serde::{Deserialize, Serialize};

use crate::error::GitError;

/// Commit hash (40-char lowercase hex string, the legacy hashing scheme).
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `TryFrom<String>` or [`CommitHash::parse`].
/// The value is treated as an opaque comparable identifier and never
/// interpreted further.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitHash(String);

impl CommitHash {
    /// Validate and wrap a raw hash string. Trailing whitespace is trimmed
    /// (git output ends with a newline).
    pub fn parse(value: &str) -> Result<Self, GitError> {
        let trimmed = value.trim();
        if trimmed.len() != 40 || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(GitError::InvalidHash {
                value: value.to_string(),
            });
        }
        Ok(CommitHash(trimmed.to_ascii_lowercase()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 8 hex chars), for human-facing messages.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl TryFrom<String> for CommitHash {
    type Error = GitError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        CommitHash::parse(&s)
    }
}

impl std::fmt::Display for CommitHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
