//! Tracing subscriber setup for Capstan consumers.
//!
//! Deploy tooling runs both interactively and under automation, so the
//! subscriber supports plain and newline-delimited JSON output. Calling
//! [`init_tracing`] again after a subscriber is installed is a no-op;
//! the global subscriber can only be set once per process.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence for filtering; `level` is the fallback
/// verbosity when it is not set. With `json` enabled, log lines are
/// emitted as newline-delimited JSON for aggregation pipelines.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}
