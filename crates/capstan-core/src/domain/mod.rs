//! Domain models for Capstan.
//!
//! Canonical definitions for the core entities:
//! - `DeploymentTag`: a cut-for-deploy tag and its rendered names
//! - `SanityDecision`: outcome of the reverse-deploy gate
//! - `HostSnapshot`: one host's observed release state
//! - `RevisionGroup`: hosts partitioned by observed revision set

pub mod decision;
pub mod error;
pub mod snapshot;
pub mod tag;

// Re-export main types and errors
pub use decision::{SanityDecision, SkipReason};
pub use error::{CapstanError, Result};
pub use snapshot::{
    HostSnapshot, ReleaseFolder, RevisionGroup, UNDETERMINED_REVISION, UNKNOWN_REVISION,
};
pub use tag::{marker_tag_name, parse_marker_tag, working_tag_name, DeploymentTag};
