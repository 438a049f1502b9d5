//! Logging initialisation via tracing-subscriber.

use anyhow::{anyhow, Context};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber, writing to stderr so it never mixes with
/// the REPL's stdout.
///
/// `RUST_LOG` takes precedence; `level` is the fallback.
pub fn init(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to set subscriber: {e}"))
}
