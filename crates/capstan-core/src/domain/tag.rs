//! Deployment tag naming and parsing.
//!
//! Tag name formats are bit-exact for interop with pre-existing tag
//! history:
//! - working tag: `"{branch}-{unixSeconds}"`
//! - environment pointer tag: the literal environment name
//! - historical marker: `"DEPLOYED---{environment}---{unixSeconds}"`

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of every historical marker tag.
pub const DEPLOYED_TAG_PREFIX: &str = "DEPLOYED---";

const MARKER_SEPARATOR: &str = "---";

/// Render a working tag name: `"{branch}-{unixSeconds}"`.
pub fn working_tag_name(branch: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", branch, at.timestamp())
}

/// Render a historical marker tag name:
/// `"DEPLOYED---{environment}---{unixSeconds}"`.
pub fn marker_tag_name(environment: &str, at: DateTime<Utc>) -> String {
    format!("{DEPLOYED_TAG_PREFIX}{environment}{MARKER_SEPARATOR}{}", at.timestamp())
}

/// Recover `(environment, timestamp)` from a historical marker tag name.
/// Returns `None` for names that do not follow the marker format.
pub fn parse_marker_tag(name: &str) -> Option<(String, DateTime<Utc>)> {
    let rest = name.strip_prefix(DEPLOYED_TAG_PREFIX)?;
    let (environment, seconds) = rest.rsplit_once(MARKER_SEPARATOR)?;
    if environment.is_empty() {
        return None;
    }
    let seconds: i64 = seconds.parse().ok()?;
    let at = Utc.timestamp_opt(seconds, 0).single()?;
    Some((environment.to_string(), at))
}

/// A tag cut for deployment.
///
/// Immutable once created; the lifecycle is create, publish, optionally
/// superseded (delete-then-recreate for the environment pointer), and
/// retained indefinitely for historical markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTag {
    /// The git tag name to deploy.
    pub name: String,

    /// Environment this tag was cut for.
    pub environment: String,

    /// When the tag was cut.
    pub cut_at: DateTime<Utc>,

    /// Branch the tag was cut from. Absent for tags recovered from
    /// historical markers, which do not record the branch.
    pub source_branch: Option<String>,
}

impl DeploymentTag {
    /// A fresh working tag cut from `branch` at `cut_at`.
    pub fn working(environment: &str, branch: &str, cut_at: DateTime<Utc>) -> Self {
        Self {
            name: working_tag_name(branch, cut_at),
            environment: environment.to_string(),
            cut_at,
            source_branch: Some(branch.to_string()),
        }
    }

    /// Recover a deployable tag from a historical marker name.
    pub fn from_marker(name: &str) -> Option<Self> {
        let (environment, cut_at) = parse_marker_tag(name)?;
        Some(Self {
            name: name.to_string(),
            environment,
            cut_at,
            source_branch: None,
        })
    }
}

impl std::fmt::Display for DeploymentTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).single().unwrap()
    }

    #[test]
    fn working_tag_name_is_branch_dash_seconds() {
        assert_eq!(working_tag_name("main", at(1700000000)), "main-1700000000");
    }

    #[test]
    fn marker_tag_name_is_bit_exact() {
        assert_eq!(
            marker_tag_name("staging", at(1700000000)),
            "DEPLOYED---staging---1700000000"
        );
    }

    #[test]
    fn marker_round_trip() {
        let name = marker_tag_name("production", at(1700000123));
        let (environment, cut_at) = parse_marker_tag(&name).unwrap();
        assert_eq!(environment, "production");
        assert_eq!(cut_at, at(1700000123));
    }

    #[test]
    fn parse_marker_rejects_foreign_names() {
        assert!(parse_marker_tag("main-1700000000").is_none());
        assert!(parse_marker_tag("DEPLOYED---staging").is_none());
        assert!(parse_marker_tag("DEPLOYED---staging---notatime").is_none());
        assert!(parse_marker_tag("DEPLOYED------1700000000").is_none());
    }

    #[test]
    fn working_constructor_keeps_source_branch() {
        let tag = DeploymentTag::working("staging", "release", at(1700000000));
        assert_eq!(tag.name, "release-1700000000");
        assert_eq!(tag.source_branch.as_deref(), Some("release"));
        assert_eq!(tag.environment, "staging");
    }

    #[test]
    fn from_marker_recovers_environment_and_time() {
        let tag = DeploymentTag::from_marker("DEPLOYED---staging---1700000000").unwrap();
        assert_eq!(tag.environment, "staging");
        assert_eq!(tag.cut_at, at(1700000000));
        assert!(tag.source_branch.is_none());
    }
}
