//! Sanity check decision outcomes.

use serde::{Deserialize, Serialize};

/// Why the sanity check was skipped without comparing any history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// An operator or configuration flag requested the skip.
    ExplicitSkip,
    /// Nothing is recorded as currently running; nothing to compare.
    FirstDeploy,
    /// Reverse deploys were explicitly allowed for a non-production stage.
    ReverseOverride,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            SkipReason::ExplicitSkip => "explicit skip",
            SkipReason::FirstDeploy => "first deploy, nothing to compare against",
            SkipReason::ReverseOverride => "override enabled for non-production stage",
        };
        write!(f, "{reason}")
    }
}

/// Outcome of one sanity check. Produced once per deploy attempt and
/// never retried automatically; a blocked check surfaces as
/// `CapstanError::UnsafeDeploy` instead of a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum SanityDecision {
    /// A skip pre-condition matched; no history was compared.
    Skipped { reason: SkipReason },
    /// The deploy tag's history contains the running revision.
    Passed,
    /// History diverged but an operator confirmed interactively.
    FailedOverridden,
}
