//! Diagnostic logging for the shell itself.
//!
//! Logs go to stderr and are disabled unless a filter is given, so they never
//! mix with the output of the commands being run.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the default log filter, e.g. `TINYSH_LOG=debug`.
pub const LOG_ENV: &str = "TINYSH_LOG";

const DEFAULT_FILTER: &str = "off";

/// Install the global subscriber.
///
/// `directive` overrides [`LOG_ENV`]; both use `EnvFilter` syntax.
pub fn init(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter `{directive}`"))?,
        None => EnvFilter::try_from_env(LOG_ENV).or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .context("failed to install log subscriber")
}
